use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::audio::fs::FileSystem;
use crate::audio::gain::{GainTable, MAX_VOLUME};
use crate::audio::output::OutputSink;
use crate::config::EngineConfig;

/// State shared by every codec of one engine instance
pub struct EngineContext {
    config: EngineConfig,
    gain: GainTable,
    volume: AtomicU8,
    fs: Arc<dyn FileSystem>,
    sink: Arc<dyn OutputSink>,
}

impl EngineContext {
    pub fn new(config: EngineConfig, fs: Arc<dyn FileSystem>, sink: Arc<dyn OutputSink>) -> Self {
        let volume = config.initial_volume.min(MAX_VOLUME);
        Self {
            config,
            gain: GainTable::standard(),
            volume: AtomicU8::new(volume),
            fs,
            sink,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn gain_table(&self) -> &GainTable {
        &self.gain
    }

    pub fn file_system(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn sink(&self) -> &dyn OutputSink {
        self.sink.as_ref()
    }

    pub fn volume(&self) -> u8 {
        self.volume.load(Ordering::Relaxed)
    }

    /// Set the volume index, clamped to 0..=100
    pub fn set_volume(&self, value: u8) {
        self.volume.store(value.min(MAX_VOLUME), Ordering::Relaxed);
    }

    pub fn volume_up(&self) {
        let _ = self
            .volume
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                (v < MAX_VOLUME).then(|| v + 1)
            });
    }

    pub fn volume_down(&self) {
        let _ = self
            .volume
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }
}
