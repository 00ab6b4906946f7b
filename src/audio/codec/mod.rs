//! Playback codecs: transport state, position bookkeeping and the per-tick decode.

pub mod pcm;
pub mod silence;

use std::path::Path;
use std::sync::atomic::{fence, AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use log::trace;

use crate::audio::context::EngineContext;
use crate::audio::gain::LevelMeter;
use crate::audio::stream_buffer::StreamBuffer;
use crate::error::EngineError;

pub use pcm::{PcmCodec, PcmFormat};
pub use silence::SilenceCodec;

/// Added to every output sample so the DAC auto-mute never engages
pub const DAC_BIAS: i32 = 1;

/// Identifies a codec slot in the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    Silence = 0,
    Pcm = 1,
}

impl CodecId {
    pub const ALL: [CodecId; 2] = [CodecId::Silence, CodecId::Pcm];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(CodecId::Silence),
            1 => Some(CodecId::Pcm),
            _ => None,
        }
    }

    /// Codec that plays a file, chosen by extension
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("wav") => CodecId::Pcm,
            _ => CodecId::Silence,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CodecId::Silence => "silence",
            CodecId::Pcm => "pcm",
        }
    }
}

/// `(byte_offset, samples_played)` published as one consistent pair
///
/// Sequence-locked: the count is odd while a write is in progress and readers
/// retry until they see the same even count on both sides of their read.
/// Writers must be serialized externally; codecs write only while holding
/// their decode-state lock.
#[derive(Debug, Default)]
pub struct ResumePoint {
    seq: AtomicU32,
    position: AtomicU64,
    samples: AtomicU32,
}

impl ResumePoint {
    pub(crate) fn store(&self, position: u64, samples: u32) {
        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);
        self.position.store(position, Ordering::Relaxed);
        self.samples.store(samples, Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }

    pub fn load(&self) -> (u64, u32) {
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }
            let position = self.position.load(Ordering::Relaxed);
            let samples = self.samples.load(Ordering::Relaxed);
            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == before {
                return (position, samples);
            }
        }
    }
}

/// Transport state and counters shared between the control and decode contexts
pub struct Session {
    ctx: Arc<EngineContext>,
    playing: AtomicBool,
    paused: AtomicBool,
    /// Consumed byte offset in the bound file and samples played so far
    resume: ResumePoint,
    sample_rate: AtomicU32,
    levels: LevelMeter,
}

impl Session {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        let sample_rate = ctx.config().sample_rate;
        let levels = LevelMeter::new(ctx.config().level_fall_step);
        Self {
            ctx,
            playing: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            resume: ResumePoint::default(),
            sample_rate: AtomicU32::new(sample_rate),
            levels,
        }
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn levels(&self) -> &LevelMeter {
        &self.levels
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    pub fn samples_played(&self) -> u32 {
        self.resume.load().1
    }

    pub(crate) fn set_sample_rate(&self, rate: u32) {
        self.sample_rate.store(rate, Ordering::Relaxed);
    }

    /// Enter Playing with the given counters
    pub(crate) fn begin(&self, position: u64, samples_played: u32) {
        self.resume.store(position, samples_played);
        self.paused.store(false, Ordering::Release);
        self.playing.store(true, Ordering::Release);
    }

    /// Enter Stopped, returning whether the session was playing
    pub(crate) fn halt(&self) -> bool {
        self.paused.store(false, Ordering::Release);
        self.playing.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn set_paused(&self, flag: bool) {
        self.paused.store(flag, Ordering::Release);
    }

    pub(crate) fn advance(&self, frames: u32, position: u64) {
        let (_, samples) = self.resume.load();
        self.resume.store(position, samples.wrapping_add(frames));
    }

    /// Consistent `(byte_offset, samples_played)` pair
    pub fn resume_point(&self) -> (u64, u32) {
        self.resume.load()
    }

    /// Emit one tick of bias-only output and zero the meters
    pub(crate) fn fill_silence(&self) {
        let sink = self.ctx.sink();
        let Some(mut buffer) = sink.acquire_buffer(true) else {
            trace!("No output buffer available; tick skipped");
            return;
        };
        buffer.fill(DAC_BIAS);
        sink.release_buffer(buffer);
        self.levels.reset();
    }
}

/// Open `path` through the context's filesystem and bind it to `rdbuf`
pub(crate) fn open_stream(
    ctx: &EngineContext,
    rdbuf: &mut StreamBuffer,
    path: &Path,
) -> Result<(), EngineError> {
    let file = ctx
        .file_system()
        .open(path)
        .map_err(|source| EngineError::FileUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
    rdbuf.bind(file);
    Ok(())
}

/// Common capability of every playback codec
///
/// `decode` runs in the timing context; everything else is called from the
/// control context.
pub trait PlaybackCodec: Send + Sync {
    fn id(&self) -> CodecId;

    fn session(&self) -> &Session;

    /// Start playing `path` from a resume point, stopping any current file first
    fn play(&self, path: &Path, byte_offset: u64, samples_played: u32) -> Result<(), EngineError>;

    /// Close the bound file and enter Stopped; no-op when already stopped
    fn stop(&self);

    /// Fill one output buffer; never blocks
    fn decode(&self);

    fn total_millis(&self) -> u32;

    fn elapsed_millis(&self) -> u32 {
        let session = self.session();
        match session.sample_rate() {
            0 => 0,
            rate => (u64::from(session.samples_played()) * 1000 / u64::from(rate)) as u32,
        }
    }

    /// Pause or resume; ignored while stopped
    fn pause(&self, flag: bool) {
        let session = self.session();
        if session.is_playing() {
            session.set_paused(flag);
        }
    }

    fn is_playing(&self) -> bool {
        self.session().is_playing()
    }

    fn is_paused(&self) -> bool {
        self.session().is_paused()
    }

    fn get_volume(&self) -> u8 {
        self.session().context().volume()
    }

    fn set_volume(&self, value: u8) {
        self.session().context().set_volume(value);
    }

    fn volume_up(&self) {
        self.session().context().volume_up();
    }

    fn volume_down(&self) {
        self.session().context().volume_down();
    }

    /// Resume pair `(byte_offset, samples_played)`; `(0, 0)` when not playing
    fn get_current_position(&self) -> (u64, u32) {
        let session = self.session();
        if session.is_playing() {
            session.resume_point()
        } else {
            (0, 0)
        }
    }

    fn get_level(&self) -> (f32, f32) {
        self.session().levels().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_codec_for_path() {
        assert_eq!(CodecId::for_path(&PathBuf::from("/m/a.wav")), CodecId::Pcm);
        assert_eq!(CodecId::for_path(&PathBuf::from("/m/B.WAV")), CodecId::Pcm);
        assert_eq!(CodecId::for_path(&PathBuf::from("/m/c.flac")), CodecId::Silence);
        assert_eq!(CodecId::for_path(&PathBuf::from("/m/noext")), CodecId::Silence);
    }

    #[test]
    fn test_resume_point_pairs_stay_consistent() {
        let point = Arc::new(ResumePoint::default());
        let writer_point = Arc::clone(&point);
        let writer = std::thread::spawn(move || {
            for n in 1..=20_000u32 {
                // every published pair keeps position == 4 * samples
                writer_point.store(u64::from(n) * 4, n);
            }
        });

        let mut last = 0;
        while !writer.is_finished() {
            let (position, samples) = point.load();
            assert_eq!(position, u64::from(samples) * 4);
            assert!(samples >= last);
            last = samples;
        }
        writer.join().unwrap();
        assert_eq!(point.load(), (80_000, 20_000));
    }

    #[test]
    fn test_codec_index_roundtrip() {
        for id in CodecId::ALL {
            assert_eq!(CodecId::from_index(id.index() as u8), Some(id));
        }
        assert_eq!(CodecId::from_index(7), None);
    }
}
