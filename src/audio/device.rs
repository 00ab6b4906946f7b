use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use log::{error, info, warn};

use crate::audio::output::{BufferPool, OutputBuffer, OUTPUT_CHANNELS};
use crate::error::OutputError;

/// Full-scale value of the engine's i32 output samples
const FULL_SCALE: f32 = 2_147_483_648.0;

/// Convert one engine output sample to a normalised float
#[inline]
pub fn sample_to_f32(sample: i32) -> f32 {
    sample as f32 / FULL_SCALE
}

/// Drains filled output buffers from the pool into a device callback
struct PoolReader {
    pool: Arc<BufferPool>,
    current: Option<OutputBuffer>,
    /// Next frame to play from `current`
    frame: usize,
}

impl PoolReader {
    fn new(pool: Arc<BufferPool>) -> Self {
        Self {
            pool,
            current: None,
            frame: 0,
        }
    }

    /// Write interleaved device frames, padding with silence on underrun
    fn render(&mut self, data: &mut [f32], device_channels: usize) -> usize {
        let mut underrun = 0;
        for out in data.chunks_mut(device_channels) {
            if self.current.is_none() {
                while let Some(next) = self.pool.take_filled() {
                    if next.sample_count() > 0 {
                        self.current = Some(next);
                        break;
                    }
                    self.pool.recycle(next);
                }
                self.frame = 0;
            }
            let Some(buffer) = self.current.as_ref() else {
                out.fill(0.0);
                underrun += 1;
                continue;
            };

            let base = self.frame * OUTPUT_CHANNELS;
            let samples = buffer.samples();
            for (ch, slot) in out.iter_mut().enumerate() {
                *slot = if ch < OUTPUT_CHANNELS {
                    sample_to_f32(samples[base + ch])
                } else {
                    0.0
                };
            }

            self.frame += 1;
            if self.frame >= buffer.sample_count() {
                if let Some(done) = self.current.take() {
                    self.pool.recycle(done);
                }
            }
        }
        underrun
    }
}

/// Desktop output device fed from a [`BufferPool`]
pub struct CpalOutput {
    stream: Stream,
    sample_rate: u32,
}

impl CpalOutput {
    /// Open the default output device at `sample_rate`
    pub fn open(pool: Arc<BufferPool>, sample_rate: u32) -> Result<Self, OutputError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(OutputError::NoDevice)?;
        let name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let config = StreamConfig {
            channels: OUTPUT_CHANNELS as u16,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let device_channels = usize::from(config.channels);
        let mut reader = PoolReader::new(pool);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    reader.render(data, device_channels);
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| OutputError::Stream(format!("Failed to build output stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| OutputError::Stream(format!("Failed to start stream: {}", e)))?;
        info!("Output stream opened on '{}' at {} Hz", name, sample_rate);

        Ok(Self {
            stream,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn pause(&self) {
        if let Err(e) = self.stream.pause() {
            warn!("Failed to pause output stream: {}", e);
        }
    }
}
