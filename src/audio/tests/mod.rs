//! Scenario tests driving the dispatcher and codecs end to end.


use std::sync::Arc;

use crate::audio::dispatcher::Dispatcher;
use crate::audio::context::EngineContext;
use crate::audio::fs::{FileSystem, MemoryFileSystem};
use crate::audio::output::BufferPool;
use crate::config::EngineConfig;

/// Builds RIFF/WAVE images for tests
pub struct WavBuilder {
    channels: u16,
    sample_rate: u32,
    bits: u16,
    extra_chunks: Vec<Vec<u8>>,
    declared_size: Option<u32>,
    payload: Vec<u8>,
}

impl WavBuilder {
    pub fn new(channels: u16, sample_rate: u32, bits: u16) -> Self {
        Self {
            channels,
            sample_rate,
            bits,
            extra_chunks: Vec::new(),
            declared_size: None,
            payload: Vec::new(),
        }
    }

    /// Insert an unknown chunk between `fmt ` and `data`
    pub fn chunk(mut self, id: &[u8; 4], body: &[u8]) -> Self {
        let mut chunk = id.to_vec();
        chunk.extend_from_slice(&(body.len() as u32).to_le_bytes());
        chunk.extend_from_slice(body);
        self.extra_chunks.push(chunk);
        self
    }

    pub fn samples_16(mut self, samples: &[i16]) -> Self {
        self.payload = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        self
    }

    pub fn samples_24(mut self, samples: &[i32]) -> Self {
        self.payload = samples
            .iter()
            .flat_map(|s| {
                let b = s.to_le_bytes();
                [b[0], b[1], b[2]]
            })
            .collect();
        self
    }

    /// Override the data chunk's size field
    pub fn declared_size(mut self, size: u32) -> Self {
        self.declared_size = Some(size);
        self
    }

    /// Byte offset of the first sample
    pub fn header_len(&self) -> usize {
        12 + 24 + self.extra_chunks.iter().map(Vec::len).sum::<usize>() + 8
    }

    pub fn build(&self) -> Vec<u8> {
        let block = self.channels * self.bits / 8;
        let mut body = b"fmt ".to_vec();
        body.extend_from_slice(&16u32.to_le_bytes());
        body.extend_from_slice(&1u16.to_le_bytes());
        body.extend_from_slice(&self.channels.to_le_bytes());
        body.extend_from_slice(&self.sample_rate.to_le_bytes());
        body.extend_from_slice(&(self.sample_rate * u32::from(block)).to_le_bytes());
        body.extend_from_slice(&block.to_le_bytes());
        body.extend_from_slice(&self.bits.to_le_bytes());
        for chunk in &self.extra_chunks {
            body.extend_from_slice(chunk);
        }
        body.extend_from_slice(b"data");
        let size = self.declared_size.unwrap_or(self.payload.len() as u32);
        body.extend_from_slice(&size.to_le_bytes());
        body.extend_from_slice(&self.payload);

        let mut out = b"RIFF".to_vec();
        out.extend_from_slice(&((body.len() + 4) as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(&body);
        out
    }
}

/// A dispatcher wired to an in-memory filesystem and output pool
pub struct Harness {
    pub dispatcher: Arc<Dispatcher>,
    pub pool: Arc<BufferPool>,
    pub fs: MemoryFileSystem,
}

impl Harness {
    pub fn new(output_frames: usize, output_buffers: usize) -> Self {
        let fs = MemoryFileSystem::new();
        Self::with_fs(fs, output_frames, output_buffers)
    }

    pub fn with_fs(fs: MemoryFileSystem, output_frames: usize, output_buffers: usize) -> Self {
        let config = EngineConfig {
            output_frames,
            output_buffers,
            ..EngineConfig::default()
        };
        let pool = Arc::new(BufferPool::new(output_buffers, output_frames));
        let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
        let ctx = Arc::new(EngineContext::new(config, shared, pool.clone()));
        Self {
            dispatcher: Arc::new(Dispatcher::new(ctx)),
            pool,
            fs,
        }
    }

    /// Take the next filled buffer's samples, returning its frame count too
    pub fn next_output(&self) -> Option<(usize, Vec<i32>)> {
        let buffer = self.pool.take_filled()?;
        let frames = buffer.sample_count();
        let samples = buffer.samples().to_vec();
        self.pool.recycle(buffer);
        Some((frames, samples))
    }
}
