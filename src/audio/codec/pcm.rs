use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use log::{debug, info, trace, warn};
use parking_lot::Mutex;

use crate::audio::codec::{open_stream, CodecId, PlaybackCodec, Session, DAC_BIAS};
use crate::audio::context::EngineContext;
use crate::audio::gain::{GainTable, UNITY_24BIT};
use crate::audio::output::{OutputBuffer, OUTPUT_CHANNELS};
use crate::audio::stream_buffer::StreamBuffer;
use crate::error::{ContainerError, EngineError};

/// Format fields read from the `fmt ` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub bits_per_sample: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: 44100,
            byte_rate: 44100 * 2 * 2,
            bits_per_sample: 16,
        }
    }
}

impl PcmFormat {
    /// Bytes per frame, zero for degenerate formats
    pub fn frame_size(&self) -> usize {
        usize::from(self.channels) * usize::from(self.bits_per_sample / 8)
    }

    pub fn bit_rate_kbps(&self) -> u32 {
        (u64::from(self.byte_rate) * 8 / 1000) as u32
    }

    /// Duration of `data_size` bytes in milliseconds
    pub fn millis_for_bytes(&self, data_size: u32) -> u32 {
        let bytes_per_sec = u64::from(self.sample_rate) * self.frame_size() as u64;
        if bytes_per_sec == 0 {
            return 0;
        }
        (u64::from(data_size) * 1000 / bytes_per_sec) as u32
    }
}

/// Location of the sample data found by discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataChunk {
    /// Bytes from the window start to the first sample byte
    pub header_len: usize,
    /// Declared payload size of the data chunk
    pub data_size: u32,
}

fn u16_le(window: &[u8], at: usize) -> Option<u16> {
    let bytes = window.get(at..at + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn u32_le(window: &[u8], at: usize) -> Option<u32> {
    let bytes = window.get(at..at + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Walk the RIFF chunks in `window` up to the start of the `data` payload
///
/// `format` is updated as soon as a `fmt ` chunk is parsed, even if the scan
/// later runs out of buffered bytes. Nothing is consumed here.
pub fn discover(window: &[u8], format: &mut PcmFormat) -> Result<DataChunk, ContainerError> {
    if window.get(0..4) != Some(b"RIFF".as_slice()) || window.get(8..12) != Some(b"WAVE".as_slice()) {
        return Err(ContainerError::NotRiffWave);
    }

    let mut ofs = 12usize;
    loop {
        let truncated = ContainerError::Truncated { offset: ofs };
        if ofs > window.len() {
            return Err(truncated);
        }
        let (Some(id), Some(size)) = (window.get(ofs..ofs + 4), u32_le(window, ofs + 4)) else {
            return Err(truncated);
        };

        match id {
            b"fmt " => {
                let body = ofs + 8;
                let parsed = (
                    u16_le(window, body + 2),
                    u32_le(window, body + 4),
                    u32_le(window, body + 8),
                    u16_le(window, body + 14),
                );
                let (Some(channels), Some(sample_rate), Some(byte_rate), Some(bits_per_sample)) =
                    parsed
                else {
                    return Err(truncated);
                };
                *format = PcmFormat {
                    channels,
                    sample_rate,
                    byte_rate,
                    bits_per_sample,
                };
            }
            b"data" => {
                return Ok(DataChunk {
                    header_len: ofs + 8,
                    data_size: size,
                });
            }
            _ => trace!("Skipping chunk {:?} of {} bytes", String::from_utf8_lossy(id), size),
        }
        ofs = ofs.saturating_add(8).saturating_add(size as usize);
    }
}

/// Apply gain to a 24-bit sample
///
/// At or above unity the gain is reduced first, which keeps all 24 bits;
/// below unity the product is scaled down afterwards, trading resolution for
/// finer volume steps.
#[inline]
pub fn apply_gain_24(sample: i32, gain: i32) -> i32 {
    if gain >= UNITY_24BIT {
        sample * (gain / UNITY_24BIT)
    } else {
        sample * gain / UNITY_24BIT
    }
}

/// Result of rendering one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tick {
    frames: usize,
    /// Per-channel sum of squared 16-bit-range samples / 32768
    accum: [u64; OUTPUT_CHANNELS],
    end_of_stream: bool,
}

/// Decode-path state, owned by the timing context while playing
struct PcmStream {
    rdbuf: StreamBuffer,
    format: PcmFormat,
    data_size: u32,
}

impl PcmStream {
    fn render(&mut self, out: &mut OutputBuffer, gain: i32) -> Tick {
        let format = self.format;
        let channels = usize::from(format.channels);
        let width = usize::from(format.bits_per_sample / 8);
        let frame_size = format.frame_size();
        if channels == 0 || !matches!(format.bits_per_sample, 16 | 24) {
            out.fill(DAC_BIAS);
            return Tick {
                frames: 0,
                accum: [0; OUTPUT_CHANNELS],
                end_of_stream: true,
            };
        }

        let frames = out.max_sample_count().min(self.rdbuf.get_left() / frame_size);
        let mut accum = [0u64; OUTPUT_CHANNELS];
        let src = self.rdbuf.buf();
        let dst = out.samples_mut();
        for (frame, slot) in src
            .chunks_exact(frame_size)
            .take(frames)
            .zip(dst.chunks_exact_mut(OUTPUT_CHANNELS))
        {
            for (ch, out_sample) in slot.iter_mut().enumerate() {
                // mono feeds both outputs; channels past the second are dropped
                let at = ch.min(channels - 1) * width;
                let (value, level) = if width == 2 {
                    let s16 = i32::from(i16::from_le_bytes([frame[at], frame[at + 1]]));
                    (s16 * gain + DAC_BIAS, s16)
                } else {
                    let s24 = i32::from_le_bytes([0, frame[at], frame[at + 1], frame[at + 2]]) / 256;
                    (apply_gain_24(s24, gain) + DAC_BIAS, s24 / 256)
                };
                *out_sample = value;
                accum[ch] += (level * level) as u64 / 32768;
            }
        }

        if frames == 0 {
            out.fill(DAC_BIAS);
        } else {
            out.set_sample_count(frames);
        }
        self.rdbuf.shift(frames * frame_size);
        Tick {
            frames,
            accum,
            end_of_stream: self.rdbuf.get_left() / frame_size == 0,
        }
    }
}

/// Codec for uncompressed little-endian PCM in a RIFF/WAVE container
pub struct PcmCodec {
    session: Session,
    stream: Mutex<PcmStream>,
    declared_millis: AtomicU32,
}

impl PcmCodec {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        let config = ctx.config();
        let rdbuf = StreamBuffer::new(config.read_buffer_size, config.refill_threshold);
        Self {
            session: Session::new(ctx),
            stream: Mutex::new(PcmStream {
                rdbuf,
                format: PcmFormat::default(),
                data_size: 0,
            }),
            declared_millis: AtomicU32::new(0),
        }
    }

    /// Run discovery on the freshly bound window and drop the header bytes
    fn skip_to_data_chunk(stream: &mut PcmStream) -> Result<DataChunk, ContainerError> {
        let left = stream.rdbuf.get_left();
        let chunk = discover(&stream.rdbuf.buf()[..left], &mut stream.format)?;
        stream.data_size = chunk.data_size;
        stream.rdbuf.shift(chunk.header_len);
        Ok(chunk)
    }

    /// Raw meter levels for a tick holding at least one frame
    fn levels_for(table: &GainTable, tick: &Tick) -> (f32, f32) {
        let frames = tick.frames.max(1) as u64;
        let mean = |sum: u64| (sum / frames).min(u64::from(u32::MAX)) as u32;
        (
            table.level_from_mean_square(mean(tick.accum[0])),
            table.level_from_mean_square(mean(tick.accum[1])),
        )
    }
}

impl PlaybackCodec for PcmCodec {
    fn id(&self) -> CodecId {
        CodecId::Pcm
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn play(&self, path: &Path, byte_offset: u64, samples_played: u32) -> Result<(), EngineError> {
        self.stop();

        let mut stream = self.stream.lock();
        open_stream(self.session.context(), &mut stream.rdbuf, path)?;

        match Self::skip_to_data_chunk(&mut stream) {
            Ok(chunk) => debug!(
                "{}: data at byte {}, {} bytes declared",
                path.display(),
                chunk.header_len,
                chunk.data_size
            ),
            Err(e) => warn!("{}: {}", path.display(), e.user_message()),
        }
        if byte_offset > 0 {
            if let Err(e) = stream.rdbuf.seek(byte_offset) {
                stream.rdbuf.unbind();
                return Err(e.into());
            }
        }

        let format = stream.format;
        self.session.set_sample_rate(format.sample_rate);
        self.declared_millis
            .store(format.millis_for_bytes(stream.data_size), Ordering::Relaxed);
        self.session.begin(stream.rdbuf.tell(), samples_played);
        info!(
            "Playing {} ({} ch, {} Hz, {}-bit, {} kbps)",
            path.display(),
            format.channels,
            format.sample_rate,
            format.bits_per_sample,
            format.bit_rate_kbps()
        );
        Ok(())
    }

    fn stop(&self) {
        if self.session.halt() {
            self.stream.lock().rdbuf.unbind();
            info!("PCM playback stopped");
        }
    }

    fn decode(&self) {
        let session = &self.session;
        if !session.is_playing() || session.is_paused() {
            session.fill_silence();
            return;
        }
        // control context is mid play/stop
        let Some(mut stream) = self.stream.try_lock() else {
            session.fill_silence();
            return;
        };

        let ctx = session.context();
        let sink = ctx.sink();
        let Some(mut buffer) = sink.acquire_buffer(true) else {
            trace!("No output buffer available; tick skipped");
            return;
        };
        let table = ctx.gain_table();
        let tick = stream.render(&mut buffer, table.gain(ctx.volume()));
        sink.release_buffer(buffer);

        session.advance(tick.frames as u32, stream.rdbuf.tell());
        if tick.frames == 0 {
            session.levels().reset();
        } else {
            let (left, right) = Self::levels_for(table, &tick);
            session.levels().update(left, right);
        }

        if tick.end_of_stream {
            stream.rdbuf.unbind();
            session.halt();
            debug!("End of stream after {} samples", session.samples_played());
        }
    }

    fn total_millis(&self) -> u32 {
        self.declared_millis
            .load(Ordering::Relaxed)
            .max(self.elapsed_millis())
    }
}
