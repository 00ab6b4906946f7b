pub mod codec;
pub mod context;
pub mod device;
pub mod dispatcher;
pub mod fs;
pub mod gain;
pub mod output;
pub mod stream_buffer;
pub mod timer;

#[cfg(test)]
pub mod tests;

// Re-export the codec surface
pub use codec::{CodecId, PcmCodec, PcmFormat, PlaybackCodec, Session, SilenceCodec, DAC_BIAS};

// Re-export shared engine state
pub use context::EngineContext;
pub use dispatcher::Dispatcher;

// Re-export I/O seams
pub use fs::{FileSource, FileSystem, MemoryFileSystem, StdFileSystem};
pub use output::{BufferPool, OutputBuffer, OutputSink, OUTPUT_CHANNELS};
pub use stream_buffer::StreamBuffer;

// Re-export volume and metering
pub use gain::{GainTable, LevelMeter, MAX_VOLUME};

// Re-export runtime drivers
pub use device::CpalOutput;
pub use timer::TickDriver;
