use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use log::info;

use crate::audio::codec::{CodecId, PcmCodec, PlaybackCodec, SilenceCodec};
use crate::audio::context::EngineContext;

/// Fixed registry of codecs with one active slot
///
/// The timing source only ever calls [`Dispatcher::on_tick`].
pub struct Dispatcher {
    ctx: Arc<EngineContext>,
    silence: SilenceCodec,
    pcm: PcmCodec,
    active: AtomicU8,
}

impl Dispatcher {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self {
            silence: SilenceCodec::new(Arc::clone(&ctx)),
            pcm: PcmCodec::new(Arc::clone(&ctx)),
            ctx,
            active: AtomicU8::new(CodecId::Silence as u8),
        }
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn codec(&self, id: CodecId) -> &dyn PlaybackCodec {
        match id {
            CodecId::Silence => &self.silence,
            CodecId::Pcm => &self.pcm,
        }
    }

    pub fn active_id(&self) -> CodecId {
        CodecId::from_index(self.active.load(Ordering::Acquire)).unwrap_or(CodecId::Silence)
    }

    pub fn get_active(&self) -> &dyn PlaybackCodec {
        self.codec(self.active_id())
    }

    /// Switch the active codec, stopping the previous one if it differs
    pub fn set_active(&self, id: CodecId) -> &dyn PlaybackCodec {
        let previous = self.active_id();
        if previous != id {
            self.codec(previous).stop();
            self.active.store(id as u8, Ordering::Release);
            info!("Active codec: {} -> {}", previous.name(), id.name());
        }
        self.codec(id)
    }

    /// Periodic entry point: forward to the active codec's decode
    #[inline]
    pub fn on_tick(&self) {
        self.get_active().decode();
    }

    /// Closure suitable for registering with a timing source
    pub fn tick_callback(self: &Arc<Self>) -> impl Fn() + Send + Sync + 'static {
        let dispatcher = Arc::clone(self);
        move || dispatcher.on_tick()
    }

    /// Tick period in seconds for the active sample rate
    pub fn tick_period_secs(&self) -> f64 {
        let rate = match self.get_active().session().sample_rate() {
            0 => self.ctx.config().sample_rate,
            rate => rate,
        };
        self.ctx.sink().frame_capacity() as f64 / f64::from(rate)
    }
}
