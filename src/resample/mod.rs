//! Streaming sample-rate conversion
//!
//! This module implements a per-channel, stateful linear resampler. Each
//! channel carries `{last, fraction, increment}` across calls so that
//! feeding a stream in arbitrarily-sized back-to-back chunks produces the
//! same samples as a single call over the concatenation. Coefficient
//! arithmetic is always done in f64 regardless of the stored sample type.

use crate::frame::{FrameLayout, HeapBuffer, MediaFrame, SampleFormat};
use crate::time::MediaTime;
use crate::utils::error::{MediaCoreError, Result};

/// Audio stream format the resampler converts between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Numeric sample format
    pub sample_format: SampleFormat,

    /// Channel count
    pub channels: usize,

    /// Samples per second
    pub sample_rate: u32,
}

/// Per-channel interpolation state
///
/// At rest between calls `0 <= fraction < max(1, increment)`: when
/// upsampling the phase never accumulates beyond one full input sample;
/// when downsampling it also carries the whole input samples the last
/// call overshot past its chunk end.
#[derive(Debug, Clone, Copy)]
struct ChannelState {
    /// Final input sample of the previous chunk
    last: f64,

    /// Fractional input position carried into the next chunk
    fraction: f64,

    /// Input samples consumed per output sample; fixed at construction
    increment: f64,
}

impl ChannelState {
    fn new(increment: f64) -> Self {
        Self { last: 0.0, fraction: increment, increment }
    }
}

/// Per-channel stateful streaming sample-rate converter
pub struct StreamingResampler {
    /// Input format accepted by `resample`
    in_format: AudioFormat,

    /// Output format produced by `resample`
    out_format: AudioFormat,

    /// `rate_in / rate_out`
    increment: f64,

    /// One interpolation state per channel
    channels: Vec<ChannelState>,
}

impl StreamingResampler {
    /// Create a converter from `in_format` to `out_format`
    ///
    /// The sample format and channel count must match between the two;
    /// only the rate changes. Fails with `BadParameter` on zero rates or
    /// mismatched geometry.
    pub fn new(in_format: AudioFormat, out_format: AudioFormat) -> Result<Self> {
        if in_format.sample_rate == 0 || out_format.sample_rate == 0 {
            return Err(MediaCoreError::BadParameter(
                "Sample rates must be non-zero".to_string(),
            ));
        }
        if in_format.channels == 0 {
            return Err(MediaCoreError::BadParameter(
                "Channel count must be non-zero".to_string(),
            ));
        }
        if in_format.sample_format != out_format.sample_format {
            return Err(MediaCoreError::UnsupportedFormat(format!(
                "Resampler does not convert {:?} to {:?}",
                in_format.sample_format, out_format.sample_format
            )));
        }
        if in_format.channels != out_format.channels {
            return Err(MediaCoreError::BadParameter(format!(
                "Channel count mismatch: {} in, {} out",
                in_format.channels, out_format.channels
            )));
        }

        let increment = in_format.sample_rate as f64 / out_format.sample_rate as f64;
        let channels = (0..in_format.channels)
            .map(|_| ChannelState::new(increment))
            .collect();

        Ok(Self { in_format, out_format, increment, channels })
    }

    /// Input format accepted by `resample`
    pub fn input_format(&self) -> AudioFormat {
        self.in_format
    }

    /// Output format produced by `resample`
    pub fn output_format(&self) -> AudioFormat {
        self.out_format
    }

    /// Fractional phase of channel `c`, for diagnostics
    pub fn fraction(&self, channel: usize) -> Option<f64> {
        self.channels.get(channel).map(|s| s.fraction)
    }

    /// Reset all channel states to the post-construction phase
    ///
    /// Must be called on any stream discontinuity (seek, flush) so the
    /// converter does not interpolate across the gap.
    pub fn reset(&mut self) {
        for state in &mut self.channels {
            *state = ChannelState::new(self.increment);
        }
    }

    /// Convert one input frame, carrying phase into the next call
    ///
    /// A zero-sample input yields a zero-sample output and leaves the
    /// carried phase untouched. The output frame keeps the input pts; its
    /// duration is derived from the emitted sample count at the output
    /// rate.
    pub fn resample(&mut self, input: &MediaFrame) -> Result<MediaFrame> {
        let samples = self.validate_input(input)?;

        let channels = self.in_format.channels;
        let planar = input.plane_count() == channels && channels > 1;
        let capacity = Self::output_capacity(samples, self.in_format, self.out_format);

        let mut outputs: Vec<Vec<f64>> = Vec::with_capacity(channels);
        for c in 0..channels {
            let input_samples = self.read_channel(input, c, samples, planar)?;
            outputs.push(self.convert_channel(c, &input_samples, capacity));
        }

        // All channels share the same state geometry and must emit the
        // same count.
        let emitted = outputs.first().map(|o| o.len()).unwrap_or(0);
        debug_assert!(outputs.iter().all(|o| o.len() == emitted));

        self.build_frame(input, outputs, emitted, planar)
    }

    /// Worst-case output size: the +1 covers fractional carry
    fn output_capacity(samples: usize, in_format: AudioFormat, out_format: AudioFormat) -> usize {
        let ratio = out_format.sample_rate as f64 / in_format.sample_rate as f64;
        (samples as f64 * ratio).ceil() as usize + 1
    }

    /// Run the interpolation loop for one channel
    fn convert_channel(&mut self, channel: usize, input: &[f64], capacity: usize) -> Vec<f64> {
        let state = &mut self.channels[channel];
        let n = input.len();
        let mut out = Vec::with_capacity(capacity);

        if n == 0 {
            return out;
        }

        let mut index = state.fraction;

        // Positions inside the seam between the previous chunk's final
        // sample and input[0].
        while index.floor() == 0.0 {
            out.push(lerp(state.last, input[0], index));
            index += state.increment;
        }

        while (index.floor() as usize) < n {
            let x0 = index.floor() as usize;
            out.push(lerp(input[x0 - 1], input[x0], index - x0 as f64));
            index += state.increment;
        }

        state.last = input[n - 1];
        // Carry the phase relative to the chunk end. When downsampling the
        // overshoot past `n` can exceed one whole sample; the integer part
        // is consumed by the main loop of the next call, which starts at
        // `floor(fraction)` instead of running the seam.
        state.fraction = index - n as f64;

        out
    }

    /// Check geometry against the configured input format
    fn validate_input(&self, input: &MediaFrame) -> Result<usize> {
        match input.layout {
            FrameLayout::Audio { sample_format, channels, sample_rate, samples } => {
                if sample_format != self.in_format.sample_format
                    || channels != self.in_format.channels
                    || sample_rate != self.in_format.sample_rate
                {
                    return Err(MediaCoreError::BadParameter(format!(
                        "Frame geometry {:?}/{}ch/{}Hz does not match resampler input {:?}/{}ch/{}Hz",
                        sample_format, channels, sample_rate,
                        self.in_format.sample_format, self.in_format.channels,
                        self.in_format.sample_rate
                    )));
                }
                Ok(samples)
            }
            FrameLayout::Video { .. } => Err(MediaCoreError::BadParameter(
                "Resampler fed a video frame".to_string(),
            )),
        }
    }

    /// Read one channel's samples as f64, from a planar plane or from an
    /// interleaved single plane
    fn read_channel(
        &self,
        input: &MediaFrame,
        channel: usize,
        samples: usize,
        planar: bool,
    ) -> Result<Vec<f64>> {
        let format = self.in_format.sample_format;
        let stride = format.bytes_per_sample();

        let (plane, step, base) = if planar {
            let plane = input.plane(channel).ok_or_else(|| {
                MediaCoreError::BadParameter(format!("Missing plane for channel {}", channel))
            })?;
            (plane, stride, 0)
        } else {
            let plane = input.plane(0).ok_or_else(|| {
                MediaCoreError::BadParameter("Missing data plane".to_string())
            })?;
            (plane, stride * self.in_format.channels, stride * channel)
        };

        let needed = base + samples.saturating_sub(1) * step + stride;
        if samples > 0 && plane.len() < needed {
            return Err(MediaCoreError::BadParameter(format!(
                "Plane too small: {} bytes for {} samples",
                plane.len(),
                samples
            )));
        }

        let mut out = Vec::with_capacity(samples);
        for i in 0..samples {
            out.push(decode_sample(format, &plane[base + i * step..]));
        }
        Ok(out)
    }

    /// Assemble the output frame in the same plane arrangement as the input
    fn build_frame(
        &self,
        input: &MediaFrame,
        outputs: Vec<Vec<f64>>,
        emitted: usize,
        planar: bool,
    ) -> Result<MediaFrame> {
        let format = self.out_format.sample_format;
        let stride = format.bytes_per_sample();
        let channels = self.out_format.channels;

        let planes = if planar {
            outputs
                .iter()
                .map(|channel_samples| {
                    let mut bytes = vec![0u8; emitted * stride];
                    for (i, &sample) in channel_samples.iter().enumerate() {
                        encode_sample(format, sample, &mut bytes[i * stride..]);
                    }
                    HeapBuffer::new(bytes)
                })
                .collect()
        } else {
            let mut bytes = vec![0u8; emitted * stride * channels];
            for (c, channel_samples) in outputs.iter().enumerate() {
                for (i, &sample) in channel_samples.iter().enumerate() {
                    let offset = (i * channels + c) * stride;
                    encode_sample(format, sample, &mut bytes[offset..]);
                }
            }
            vec![HeapBuffer::new(bytes)]
        };

        let layout = FrameLayout::Audio {
            sample_format: format,
            channels,
            sample_rate: self.out_format.sample_rate,
            samples: emitted,
        };
        let duration = MediaTime::new(emitted as i64, self.out_format.sample_rate as i64);

        MediaFrame::new(planes, layout, input.pts, duration)
    }
}

/// Linear interpolation in the coefficient type
#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

/// Decode one sample at the head of `bytes` into f64
#[inline]
fn decode_sample(format: SampleFormat, bytes: &[u8]) -> f64 {
    match format {
        SampleFormat::U8 => bytes[0] as f64,
        SampleFormat::S16 => i16::from_ne_bytes([bytes[0], bytes[1]]) as f64,
        SampleFormat::S32 => {
            i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
        }
        SampleFormat::F32 => {
            f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
        }
        SampleFormat::F64 => f64::from_ne_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]),
    }
}

/// Encode one f64 sample at the head of `bytes`, rounding and saturating
/// for the integer formats
#[inline]
fn encode_sample(format: SampleFormat, sample: f64, bytes: &mut [u8]) {
    match format {
        SampleFormat::U8 => {
            bytes[0] = sample.round().clamp(u8::MIN as f64, u8::MAX as f64) as u8;
        }
        SampleFormat::S16 => {
            let v = sample.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16;
            bytes[..2].copy_from_slice(&v.to_ne_bytes());
        }
        SampleFormat::S32 => {
            let v = sample.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32;
            bytes[..4].copy_from_slice(&v.to_ne_bytes());
        }
        SampleFormat::F32 => {
            bytes[..4].copy_from_slice(&(sample as f32).to_ne_bytes());
        }
        SampleFormat::F64 => {
            bytes[..8].copy_from_slice(&sample.to_ne_bytes());
        }
    }
}
