use std::path::Path;
use std::sync::Arc;

use log::info;
use parking_lot::Mutex;

use crate::audio::codec::{open_stream, CodecId, PlaybackCodec, Session};
use crate::audio::context::EngineContext;
use crate::audio::stream_buffer::StreamBuffer;
use crate::error::EngineError;

/// Codec that binds a file but only ever outputs the DAC bias
pub struct SilenceCodec {
    session: Session,
    rdbuf: Mutex<StreamBuffer>,
}

impl SilenceCodec {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        let config = ctx.config();
        let rdbuf = StreamBuffer::new(config.read_buffer_size, config.refill_threshold);
        Self {
            session: Session::new(ctx),
            rdbuf: Mutex::new(rdbuf),
        }
    }
}

impl PlaybackCodec for SilenceCodec {
    fn id(&self) -> CodecId {
        CodecId::Silence
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn play(&self, path: &Path, byte_offset: u64, samples_played: u32) -> Result<(), EngineError> {
        self.stop();

        let mut rdbuf = self.rdbuf.lock();
        open_stream(self.session.context(), &mut rdbuf, path)?;
        if byte_offset > 0 {
            if let Err(e) = rdbuf.seek(byte_offset) {
                rdbuf.unbind();
                return Err(e.into());
            }
        }
        self.session.begin(rdbuf.tell(), samples_played);
        info!("Playing {} (silence)", path.display());
        Ok(())
    }

    fn stop(&self) {
        if self.session.halt() {
            self.rdbuf.lock().unbind();
            info!("Silence playback stopped");
        }
    }

    fn decode(&self) {
        self.session.fill_silence();
    }

    fn elapsed_millis(&self) -> u32 {
        0
    }

    fn total_millis(&self) -> u32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::codec::DAC_BIAS;
    use crate::audio::fs::MemoryFileSystem;
    use crate::audio::output::BufferPool;
    use crate::config::EngineConfig;
    use std::path::PathBuf;

    fn setup() -> (SilenceCodec, Arc<BufferPool>, MemoryFileSystem) {
        let fs = MemoryFileSystem::new();
        let pool = Arc::new(BufferPool::new(2, 8));
        let ctx = Arc::new(EngineContext::new(
            EngineConfig::default(),
            Arc::new(fs.clone()),
            pool.clone(),
        ));
        (SilenceCodec::new(ctx), pool, fs)
    }

    #[test]
    fn test_decode_outputs_bias_only() {
        let (codec, pool, fs) = setup();
        fs.insert("/x.mp3", vec![0x55; 64]);
        codec.play(&PathBuf::from("/x.mp3"), 0, 0).unwrap();

        codec.decode();
        let out = pool.take_filled().unwrap();
        assert_eq!(out.sample_count(), 8);
        assert!(out.samples().iter().all(|&s| s == DAC_BIAS));
        assert_eq!(codec.get_level(), (0.0, 0.0));
    }

    #[test]
    fn test_reports_fixed_times() {
        let (codec, _pool, fs) = setup();
        fs.insert("/x.mp3", vec![0; 16]);
        codec.play(&PathBuf::from("/x.mp3"), 0, 5000).unwrap();
        assert!(codec.is_playing());
        assert_eq!(codec.elapsed_millis(), 0);
        assert_eq!(codec.total_millis(), 1);
        assert_eq!(codec.get_current_position(), (0, 5000));
    }

    #[test]
    fn test_missing_file_stays_stopped() {
        let (codec, _pool, _fs) = setup();
        let err = codec.play(&PathBuf::from("/absent.ogg"), 0, 0).unwrap_err();
        assert!(matches!(err, EngineError::FileUnavailable { .. }));
        assert!(!codec.is_playing());
    }
}
