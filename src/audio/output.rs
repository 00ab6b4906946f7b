//! Hardware output buffers and the pool they circulate through.
//!
//! Buffers are allocated once when the pool is built. Afterwards they only
//! move between the free and filled queues, so neither the producer (the
//! decode tick) nor the consumer (the device callback) allocates.

use crossbeam_channel::{bounded, Receiver, Sender};
use log::warn;

/// Interleaved channels per output frame
pub const OUTPUT_CHANNELS: usize = 2;

/// Fixed-capacity block of interleaved stereo samples
#[derive(Debug)]
pub struct OutputBuffer {
    samples: Box<[i32]>,
    sample_count: usize,
}

impl OutputBuffer {
    pub fn new(capacity_frames: usize) -> Self {
        Self {
            samples: vec![0; capacity_frames * OUTPUT_CHANNELS].into_boxed_slice(),
            sample_count: 0,
        }
    }

    /// Capacity in frames
    pub fn max_sample_count(&self) -> usize {
        self.samples.len() / OUTPUT_CHANNELS
    }

    /// Frames holding valid output
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Set the valid frame count, clamped to capacity
    pub fn set_sample_count(&mut self, frames: usize) {
        self.sample_count = frames.min(self.max_sample_count());
    }

    /// Fill every frame with `value` and mark the whole buffer valid
    pub fn fill(&mut self, value: i32) {
        self.samples.fill(value);
        self.sample_count = self.max_sample_count();
    }

    /// Whole backing storage, valid or not
    pub fn samples_mut(&mut self) -> &mut [i32] {
        &mut self.samples
    }

    /// Valid interleaved samples
    pub fn samples(&self) -> &[i32] {
        &self.samples[..self.sample_count * OUTPUT_CHANNELS]
    }
}

/// Destination for decoded output
pub trait OutputSink: Send + Sync {
    /// Take an empty buffer; `None` when the pool is exhausted and `non_blocking` is set
    fn acquire_buffer(&self, non_blocking: bool) -> Option<OutputBuffer>;

    /// Queue a filled buffer for output
    fn release_buffer(&self, buffer: OutputBuffer);

    /// Frames per buffer
    fn frame_capacity(&self) -> usize;
}

/// Preallocated pool of output buffers
pub struct BufferPool {
    free_tx: Sender<OutputBuffer>,
    free_rx: Receiver<OutputBuffer>,
    filled_tx: Sender<OutputBuffer>,
    filled_rx: Receiver<OutputBuffer>,
    frame_capacity: usize,
}

impl BufferPool {
    /// Allocate `count` buffers of `frame_capacity` frames each
    pub fn new(count: usize, frame_capacity: usize) -> Self {
        let (free_tx, free_rx) = bounded(count);
        let (filled_tx, filled_rx) = bounded(count);
        for _ in 0..count {
            // capacity is exactly `count`, so this cannot fail
            let _ = free_tx.try_send(OutputBuffer::new(frame_capacity));
        }
        Self {
            free_tx,
            free_rx,
            filled_tx,
            filled_rx,
            frame_capacity,
        }
    }

    /// Buffers waiting to be played
    pub fn filled_len(&self) -> usize {
        self.filled_rx.len()
    }

    /// Buffers available to the producer
    pub fn free_len(&self) -> usize {
        self.free_rx.len()
    }

    /// Consumer side: take the oldest filled buffer
    pub fn take_filled(&self) -> Option<OutputBuffer> {
        self.filled_rx.try_recv().ok()
    }

    /// Consumer side: hand a played buffer back to the producer
    pub fn recycle(&self, mut buffer: OutputBuffer) {
        buffer.set_sample_count(0);
        if self.free_tx.try_send(buffer).is_err() {
            warn!("Output pool free queue full; dropping foreign buffer");
        }
    }
}

impl OutputSink for BufferPool {
    fn acquire_buffer(&self, non_blocking: bool) -> Option<OutputBuffer> {
        if non_blocking {
            self.free_rx.try_recv().ok()
        } else {
            self.free_rx.recv().ok()
        }
    }

    fn release_buffer(&self, buffer: OutputBuffer) {
        if self.filled_tx.try_send(buffer).is_err() {
            warn!("Output pool filled queue full; dropping buffer");
        }
    }

    fn frame_capacity(&self) -> usize {
        self.frame_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_exhaustion_is_non_blocking() {
        let pool = BufferPool::new(2, 8);
        let a = pool.acquire_buffer(true).unwrap();
        let b = pool.acquire_buffer(true).unwrap();
        assert!(pool.acquire_buffer(true).is_none());

        pool.release_buffer(a);
        pool.release_buffer(b);
        assert_eq!(pool.filled_len(), 2);
        assert_eq!(pool.free_len(), 0);
    }

    #[test]
    fn test_recycle_returns_buffer() {
        let pool = BufferPool::new(1, 4);
        let mut buf = pool.acquire_buffer(true).unwrap();
        buf.fill(7);
        pool.release_buffer(buf);

        let played = pool.take_filled().unwrap();
        assert_eq!(played.samples(), &[7; 8]);
        pool.recycle(played);

        let again = pool.acquire_buffer(false).unwrap();
        assert_eq!(again.sample_count(), 0);
        assert_eq!(again.max_sample_count(), 4);
    }

    #[test]
    fn test_sample_count_clamped() {
        let mut buf = OutputBuffer::new(3);
        buf.set_sample_count(10);
        assert_eq!(buf.sample_count(), 3);
        assert_eq!(buf.samples().len(), 6);
    }
}
