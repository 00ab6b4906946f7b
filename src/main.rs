use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info, log, warn};

use pcm_engine::audio::codec::pcm::discover;
use pcm_engine::audio::{
    BufferPool, CodecId, CpalOutput, Dispatcher, EngineContext, FileSystem, PcmFormat,
    StdFileSystem, StreamBuffer, TickDriver,
};
use pcm_engine::cli::{CliApp, Commands, StatusDisplay};
use pcm_engine::config::ConfigManager;
use pcm_engine::error::EngineError;
use pcm_engine::logging;

/// How often the live status line is redrawn
const STATUS_INTERVAL: Duration = Duration::from_millis(100);

/// Main application controller that coordinates all components
pub struct AppController {
    config_manager: ConfigManager,
}

impl AppController {
    /// Create a new application controller
    pub fn new(cli: &CliApp) -> Result<Self, EngineError> {
        let config_manager = match &cli.config {
            Some(path) => ConfigManager::with_path(CliApp::expand_path(&path.to_string_lossy()))?,
            None => ConfigManager::new()?,
        };
        info!("Configuration loaded from {}", config_manager.config_path().display());
        Ok(Self { config_manager })
    }

    pub fn execute_command(&self, command: Commands) -> Result<(), EngineError> {
        match command {
            Commands::Play {
                path,
                offset,
                samples,
                volume,
            } => self.play(&CliApp::expand_path(&path), offset, samples, volume),
            Commands::Probe { path } => self.probe(&path),
        }
    }

    fn play(&self, path: &Path, offset: u64, samples: u32, volume: Option<u8>) -> Result<(), EngineError> {
        let config = self.config_manager.get_config().clone();
        let pool = Arc::new(BufferPool::new(config.output_buffers, config.output_frames));
        let ctx = Arc::new(EngineContext::new(config, Arc::new(StdFileSystem), pool.clone()));
        let dispatcher = Arc::new(Dispatcher::new(ctx));
        if let Some(volume) = volume {
            dispatcher.context().set_volume(volume);
        }

        let codec = dispatcher.set_active(CodecId::for_path(path));
        codec.play(path, offset, samples)?;

        let output = CpalOutput::open(Arc::clone(&pool), codec.session().sample_rate())?;
        info!("Output running at {} Hz", output.sample_rate());
        let period = Duration::from_secs_f64(dispatcher.tick_period_secs());
        let mut driver = TickDriver::start(period, dispatcher.tick_callback())?;

        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&interrupted);
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            warn!("Cannot install Ctrl-C handler: {}", e);
        }

        while codec.is_playing() && !interrupted.load(Ordering::Relaxed) {
            let line = StatusDisplay::format_progress_line(
                codec.is_paused(),
                codec.elapsed_millis(),
                codec.total_millis(),
                codec.get_volume(),
                codec.get_level(),
            );
            StatusDisplay::display_progress(&line);
            thread::sleep(STATUS_INTERVAL);
        }

        let (resume_offset, resume_samples) = codec.get_current_position();
        codec.stop();
        driver.stop();
        output.pause();
        debug!("Ran {} ticks at {:?}", driver.ticks(), period);

        if interrupted.load(Ordering::Relaxed) {
            StatusDisplay::display_resume_point(resume_offset, resume_samples);
        } else {
            println!();
            println!("Finished {}", path.display());
        }
        Ok(())
    }

    fn probe(&self, path: &str) -> Result<(), EngineError> {
        let path = CliApp::expand_path(path);
        let codec = CodecId::for_path(&path);
        if codec != CodecId::Pcm {
            StatusDisplay::display_probe(
                &path.to_string_lossy(),
                codec,
                None,
                0,
                Some("no decoder for this extension; plays as silence"),
            );
            return Ok(());
        }

        let config = self.config_manager.get_config();
        let file = StdFileSystem
            .open(&path)
            .map_err(|source| EngineError::FileUnavailable {
                path: path.clone(),
                source,
            })?;
        let mut rdbuf = StreamBuffer::new(config.read_buffer_size, config.refill_threshold);
        rdbuf.bind(file);

        let mut format = PcmFormat::default();
        let window = &rdbuf.buf()[..rdbuf.get_left()];
        let (data_size, problem) = match discover(window, &mut format) {
            Ok(chunk) => (chunk.data_size, None),
            Err(e) => (0, Some(e.user_message())),
        };
        StatusDisplay::display_probe(
            &path.to_string_lossy(),
            codec,
            Some(&format),
            data_size,
            problem.as_deref(),
        );
        Ok(())
    }
}

fn main() {
    // keep the status line readable unless asked otherwise
    if std::env::var(logging::LOG_LEVEL_ENV).is_err() {
        std::env::set_var(logging::LOG_LEVEL_ENV, "warn");
    }
    if let Err(e) = logging::init() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let cli = CliApp::parse();
    let result = AppController::new(&cli).and_then(|app| app.execute_command(cli.command));
    if let Err(e) = result {
        log!(e.severity().log_level(), "{}", e);
        StatusDisplay::display_error(&e);
        std::process::exit(1);
    }
    info!("Application shutdown complete");
}
