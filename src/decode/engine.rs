//! Decode engine contract
//!
//! A `DecodeEngine` is the collaborator boundary around a concrete decode
//! implementation: a software codec library or an OS hardware codec
//! session. Engines are non-blocking: `submit` reports backpressure
//! instead of waiting and `poll` reports needs-input instead of blocking.
//! Whether decode completes synchronously or on an engine-owned thread is
//! hidden behind this contract; the adapter in the parent module never
//! cares.

use crate::decode::{StreamFormat, StreamParams};
use crate::frame::{CodecPacket, FrameLayout, HeapBuffer, MediaFrame};
use crate::time::MediaTime;
use crate::utils::error::{MediaCoreError, Result};
use std::collections::VecDeque;

/// Outcome of handing a packet to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    /// Packet consumed
    Accepted,

    /// Transient backpressure; drain via poll() and resubmit
    Busy,
}

/// Outcome of asking the engine for a decoded frame
#[derive(Debug)]
pub enum PollStatus {
    /// One decoded frame
    Frame(MediaFrame),

    /// Nothing decoded yet; feed more input
    NeedsInput,

    /// Drain finished; no further frames will appear
    Drained,
}

/// Uniform contract over heterogeneous decode implementations
pub trait DecodeEngine: Send {
    /// Allocate the underlying decode context for a stream
    fn open(&mut self, format: &StreamFormat) -> Result<()>;

    /// Hand one compressed packet to the engine
    fn submit(&mut self, packet: &CodecPacket) -> Result<SubmitStatus>;

    /// Tell the engine no further input will arrive; pending work flushes
    fn signal_end(&mut self) -> Result<()>;

    /// Ask for one decoded frame
    fn poll(&mut self) -> Result<PollStatus>;

    /// Discard all pending input and output state
    fn reset(&mut self) -> Result<()>;

    /// Whether decode runs on dedicated hardware
    fn is_hardware(&self) -> bool;

    /// Short engine name for logs
    fn name(&self) -> &'static str;
}

/// Constructs engines of one variant on demand
///
/// The adapter factory walks a list of providers to pick the variant for
/// a requested mode and codec, falling back from hardware to software.
pub trait EngineProvider: Send + Sync {
    /// Whether engines from this provider decode the codec
    fn supports(&self, format: &StreamFormat) -> bool;

    /// Whether engines from this provider are hardware-backed
    fn is_hardware(&self) -> bool;

    /// Build an unopened engine
    fn create(&self, format: &StreamFormat) -> Result<Box<dyn DecodeEngine>>;
}

/// Software engine for uncompressed PCM streams
///
/// "Decode" is a copy of the packet payload into an audio frame of the
/// stream's geometry. Synchronous and never busy; useful on its own for
/// PCM tracks and in tests as the simplest conforming engine.
pub struct PcmEngine {
    /// Audio geometry from open(); None until opened
    format: Option<crate::resample::AudioFormat>,

    /// Decoded frames awaiting poll()
    ready: VecDeque<MediaFrame>,

    /// signal_end() observed
    draining: bool,
}

impl PcmEngine {
    pub fn new() -> Self {
        Self { format: None, ready: VecDeque::new(), draining: false }
    }
}

impl Default for PcmEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeEngine for PcmEngine {
    fn open(&mut self, format: &StreamFormat) -> Result<()> {
        match format.params {
            StreamParams::Audio { sample_format, channels, sample_rate } => {
                if channels == 0 || sample_rate == 0 {
                    return Err(MediaCoreError::BadParameter(
                        "PCM stream needs non-zero channels and sample rate".to_string(),
                    ));
                }
                self.format = Some(crate::resample::AudioFormat {
                    sample_format,
                    channels,
                    sample_rate,
                });
                Ok(())
            }
            StreamParams::Video { .. } => Err(MediaCoreError::UnsupportedFormat(
                "PCM engine cannot decode video".to_string(),
            )),
        }
    }

    fn submit(&mut self, packet: &CodecPacket) -> Result<SubmitStatus> {
        let format = self.format.ok_or_else(|| {
            MediaCoreError::DecodeError("PCM engine not opened".to_string())
        })?;

        let frame_size = format.sample_format.bytes_per_sample() * format.channels;
        if frame_size == 0 || packet.data.len() % frame_size != 0 {
            return Err(MediaCoreError::DecodeError(format!(
                "PCM packet of {} bytes is not a whole number of {}-byte frames",
                packet.data.len(),
                frame_size
            )));
        }
        let samples = packet.data.len() / frame_size;

        let frame = MediaFrame::new(
            vec![HeapBuffer::new(packet.data.clone())],
            FrameLayout::Audio {
                sample_format: format.sample_format,
                channels: format.channels,
                sample_rate: format.sample_rate,
                samples,
            },
            // The adapter re-stamps from its timestamp FIFO.
            MediaTime::INVALID,
            MediaTime::new(samples as i64, format.sample_rate as i64),
        )?;

        self.ready.push_back(frame);
        Ok(SubmitStatus::Accepted)
    }

    fn signal_end(&mut self) -> Result<()> {
        self.draining = true;
        Ok(())
    }

    fn poll(&mut self) -> Result<PollStatus> {
        match self.ready.pop_front() {
            Some(frame) => Ok(PollStatus::Frame(frame)),
            None if self.draining => Ok(PollStatus::Drained),
            None => Ok(PollStatus::NeedsInput),
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.ready.clear();
        self.draining = false;
        Ok(())
    }

    fn is_hardware(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "pcm"
    }
}

/// Provider for the built-in PCM engine
pub struct PcmEngineProvider;

impl EngineProvider for PcmEngineProvider {
    fn supports(&self, format: &StreamFormat) -> bool {
        format.codec == crate::frame::CodecId::Pcm
    }

    fn is_hardware(&self) -> bool {
        false
    }

    fn create(&self, _format: &StreamFormat) -> Result<Box<dyn DecodeEngine>> {
        Ok(Box::new(PcmEngine::new()))
    }
}
