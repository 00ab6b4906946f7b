use crate::audio::codec::{CodecId, PcmFormat};
use crate::error::EngineError;

/// Status display formatter for the CLI
pub struct StatusDisplay;

impl StatusDisplay {
    /// One-line live view: state, elapsed/total, volume and level meters
    pub fn format_progress_line(
        paused: bool,
        elapsed_ms: u32,
        total_ms: u32,
        volume: u8,
        levels: (f32, f32),
    ) -> String {
        let state = if paused { "⏸" } else { "▶" };
        format!(
            "{} {} / {}  vol {:>3}  L {} R {}",
            state,
            Self::format_millis(elapsed_ms),
            Self::format_millis(total_ms),
            volume,
            Self::level_bar(levels.0, 12),
            Self::level_bar(levels.1, 12)
        )
    }

    /// Print the live view in place
    pub fn display_progress(line: &str) {
        use std::io::Write;
        print!("\r{}", line);
        let _ = std::io::stdout().flush();
    }

    /// Print the pair needed to resume this file later
    pub fn display_resume_point(offset: u64, samples: u32) {
        println!();
        println!("Stopped. Resume with: --offset {} --samples {}", offset, samples);
    }

    /// Describe a probed file
    pub fn display_probe(
        path: &str,
        codec: CodecId,
        format: Option<&PcmFormat>,
        data_size: u32,
        problem: Option<&str>,
    ) {
        println!("┌─ {} ", path);
        println!("│ Codec: {}", codec.name());
        if let Some(format) = format {
            println!("│ Channels: {} ({})", format.channels, Self::channel_description(format.channels));
            println!("│ Sample rate: {} Hz", format.sample_rate);
            println!("│ Bit depth: {}-bit", format.bits_per_sample);
            println!("│ Bit rate: {} kbps", format.bit_rate_kbps());
            println!("│ Data: {} bytes", data_size);
            println!("│ Duration: {}", Self::format_millis(format.millis_for_bytes(data_size)));
        }
        if let Some(problem) = problem {
            println!("│ Warning: {}", problem);
        }
        println!("└─");
    }

    /// Display an engine error with its severity
    pub fn display_error(error: &EngineError) {
        eprintln!("{}: {}", error.severity().as_str(), error.user_message());
        if error.is_recoverable() {
            eprintln!("Playback may continue with reduced functionality.");
        }
    }

    /// Format milliseconds as MM:SS.t or HH:MM:SS for longer tracks
    pub fn format_millis(millis: u32) -> String {
        let total_seconds = millis / 1000;
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        } else {
            format!("{:02}:{:02}.{}", minutes, seconds, (millis % 1000) / 100)
        }
    }

    /// Get channel description from channel count
    pub fn channel_description(channels: u16) -> &'static str {
        match channels {
            1 => "Mono",
            2 => "Stereo",
            0 => "None",
            _ => "Multi-channel, first two played",
        }
    }

    /// Horizontal meter for a 0..=1 level
    pub fn level_bar(level: f32, width: usize) -> String {
        let filled = ((level.clamp(0.0, 1.0) * width as f32) as usize).min(width);
        format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
    }
}
