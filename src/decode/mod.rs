//! Decoder adapter
//!
//! `DecoderAdapter` puts a uniform push/pull/flush contract over
//! heterogeneous decode engines. Asynchronous engines (hardware sessions)
//! lose the original packet timestamps in their native reordering, so the
//! adapter keeps an ordered FIFO of submitted decode timestamps and
//! re-stamps frames as they come back: engines preserve submission order
//! for non-discarded packets, so the k-th frame out pairs with the k-th
//! non-disposable packet in. Presentation reordering itself is handled
//! one layer up by the reorder queue.

mod engine;
mod tables;

pub use engine::{
    DecodeEngine, EngineProvider, PcmEngine, PcmEngineProvider, PollStatus, SubmitStatus,
};
pub use tables::{
    codec_from_tag, codec_tag, pixel_from_tag, pixel_tag, sample_from_tag, sample_tag,
};

use crate::frame::{CodecId, CodecPacket, MediaFrame, SampleFormat};
use crate::time::MediaTime;
use crate::utils::error::{MediaCoreError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Stream-type-specific mandatory negotiation keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamParams {
    /// Audio stream geometry
    Audio {
        /// Numeric sample format
        sample_format: SampleFormat,

        /// Channel count
        channels: usize,

        /// Samples per second
        sample_rate: u32,
    },

    /// Video stream geometry
    Video {
        /// Coded width in pixels
        width: u32,

        /// Coded height in pixels
        height: u32,
    },
}

/// Everything a decode engine needs to open a stream
#[derive(Debug, Clone)]
pub struct StreamFormat {
    /// Codec of the stream
    pub codec: CodecId,

    /// Audio or video geometry
    pub params: StreamParams,

    /// Codec-specific out-of-band configuration (sequence headers);
    /// mandatory for codecs that require it
    pub extradata: Option<Vec<u8>>,
}

/// Which engine variant the factory should select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderMode {
    /// Hardware when available, software otherwise
    #[default]
    Auto,

    /// Hardware only; falls back to software with a warning
    Hardware,

    /// Software only
    Software,
}

/// Adapter lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    /// No engine context allocated
    Uninitialized,

    /// Open and idle
    Ready,

    /// Packets in flight
    Running,

    /// End-of-stream signaled; pending work flushing out
    Draining,

    /// Drain complete
    Ended,
}

/// Outcome of `DecoderAdapter::read`
///
/// `NeedsInput` and `EndOfStream` are flow-control signals, not errors.
#[derive(Debug)]
pub enum ReadResult {
    /// One decoded frame, re-stamped with the paired dts
    Frame(MediaFrame),

    /// Nothing available; feed more input (or poll again while draining)
    NeedsInput,

    /// Drain complete; no further frames until flush() and new input
    EndOfStream,
}

/// Uniform push/pull/flush wrapper over one decode engine instance
pub struct DecoderAdapter {
    /// The wrapped engine
    engine: Box<dyn DecodeEngine>,

    /// Lifecycle state
    state: AdapterState,

    /// Decode timestamps of accepted non-disposable packets, ascending
    pending_dts: Mutex<VecDeque<MediaTime>>,

    /// Packets accepted since init/flush
    packets_in: u64,

    /// Frames returned since init/flush
    frames_out: u64,
}

impl DecoderAdapter {
    /// Wrap an engine without opening it; callers then `init`
    pub fn new(engine: Box<dyn DecodeEngine>) -> Self {
        Self {
            engine,
            state: AdapterState::Uninitialized,
            pending_dts: Mutex::new(VecDeque::new()),
            packets_in: 0,
            frames_out: 0,
        }
    }

    /// Select an engine variant and wrap it, without opening
    ///
    /// Walks `providers` honoring `mode`: hardware first for
    /// `Auto`/`Hardware`, logging the fallback when a hardware request
    /// lands on software. Fails with `UnsupportedFormat` when no provider
    /// supports the codec.
    pub fn create(
        mode: DecoderMode,
        format: &StreamFormat,
        providers: &[Box<dyn EngineProvider>],
    ) -> Result<Self> {
        let candidates: Vec<&Box<dyn EngineProvider>> =
            providers.iter().filter(|p| p.supports(format)).collect();

        if candidates.is_empty() {
            return Err(MediaCoreError::UnsupportedFormat(format!(
                "No decode engine for {:?}",
                format.codec
            )));
        }

        let provider = match mode {
            DecoderMode::Software => candidates
                .iter()
                .find(|p| !p.is_hardware())
                .ok_or_else(|| {
                    MediaCoreError::UnsupportedFormat(format!(
                        "No software engine for {:?}",
                        format.codec
                    ))
                })?,
            DecoderMode::Hardware | DecoderMode::Auto => {
                match candidates.iter().find(|p| p.is_hardware()) {
                    Some(hw) => hw,
                    None => {
                        let sw = candidates.first().ok_or_else(|| {
                            MediaCoreError::UnsupportedFormat(format!(
                                "No engine for {:?}",
                                format.codec
                            ))
                        })?;
                        if mode == DecoderMode::Hardware {
                            log::warn!(
                                "No hardware engine for {:?}, falling back to software",
                                format.codec
                            );
                        }
                        sw
                    }
                }
            }
        };

        let engine = provider.create(format)?;
        log::debug!("Selected '{}' engine for {:?}", engine.name(), format.codec);
        Ok(Self::new(engine))
    }

    /// Providers available without external registration
    pub fn default_providers() -> Vec<Box<dyn EngineProvider>> {
        vec![Box::new(PcmEngineProvider)]
    }

    /// Allocate the engine context for a stream
    ///
    /// Validates the mapping tables know the codec and that mandatory
    /// out-of-band configuration is present before touching the engine.
    pub fn init(&mut self, format: &StreamFormat) -> Result<()> {
        if self.state != AdapterState::Uninitialized {
            return Err(MediaCoreError::BadParameter(
                "Adapter already initialized; flush() or recreate".to_string(),
            ));
        }

        // Unknown codecs fail here, not mid-stream.
        tables::codec_tag(format.codec)?;
        if let StreamParams::Audio { sample_format, .. } = format.params {
            tables::sample_tag(sample_format)?;
        }

        if format.codec.requires_extradata()
            && format.extradata.as_ref().map_or(true, |d| d.is_empty())
        {
            return Err(MediaCoreError::BadParameter(format!(
                "{:?} requires out-of-band configuration bytes",
                format.codec
            )));
        }

        self.engine.open(format)?;
        self.state = AdapterState::Ready;
        Ok(())
    }

    /// Current lifecycle state
    pub fn state(&self) -> AdapterState {
        self.state
    }

    /// Packets accepted since init/flush
    pub fn packets_in(&self) -> u64 {
        self.packets_in
    }

    /// Frames returned since init/flush
    pub fn frames_out(&self) -> u64 {
        self.frames_out
    }

    /// Push one packet, or signal end-of-stream with `None`
    ///
    /// On engine backpressure returns `ResourceBusy`; the caller must
    /// drain via `read()` and retry the same packet. Any other engine
    /// failure is fatal for this adapter instance.
    pub fn write(&mut self, packet: Option<&CodecPacket>) -> Result<()> {
        match self.state {
            AdapterState::Uninitialized => {
                return Err(MediaCoreError::BadParameter(
                    "Adapter not initialized".to_string(),
                ));
            }
            AdapterState::Draining | AdapterState::Ended => {
                return Err(MediaCoreError::BadParameter(
                    "No input accepted after end-of-stream; flush() to reuse".to_string(),
                ));
            }
            AdapterState::Ready | AdapterState::Running => {}
        }

        let Some(packet) = packet else {
            self.engine.signal_end()?;
            self.state = AdapterState::Draining;
            return Ok(());
        };

        match self.engine.submit(packet)? {
            SubmitStatus::Busy => return Err(MediaCoreError::ResourceBusy),
            SubmitStatus::Accepted => {}
        }

        // Disposable packets never surface as frames; pairing them would
        // shift every later timestamp.
        if !packet.flags.disposable {
            let mut fifo = self.pending_dts.lock();
            // Submission dts order is ascending; keep the FIFO sorted even
            // if a demuxer misbehaves.
            let position = fifo
                .iter()
                .rposition(|queued| {
                    queued.partial_cmp(&packet.dts) != Some(std::cmp::Ordering::Greater)
                })
                .map(|i| i + 1)
                .unwrap_or(0);
            fifo.insert(position, packet.dts);
        }

        self.packets_in += 1;
        self.state = AdapterState::Running;
        Ok(())
    }

    /// Pull one decoded frame if available
    ///
    /// Successful frames are re-stamped with the oldest pending dts.
    /// `NeedsInput` and `EndOfStream` are scheduling hints, not failures.
    pub fn read(&mut self) -> Result<ReadResult> {
        match self.state {
            AdapterState::Uninitialized => {
                return Err(MediaCoreError::BadParameter(
                    "Adapter not initialized".to_string(),
                ));
            }
            AdapterState::Ended => return Ok(ReadResult::EndOfStream),
            _ => {}
        }

        match self.engine.poll()? {
            PollStatus::Frame(mut frame) => {
                if let Some(dts) = self.pending_dts.lock().pop_front() {
                    frame.pts = dts;
                } else {
                    log::warn!("Decoded frame with no pending timestamp; pts left as-is");
                }
                self.frames_out += 1;
                Ok(ReadResult::Frame(frame))
            }
            PollStatus::NeedsInput => Ok(ReadResult::NeedsInput),
            PollStatus::Drained => {
                self.state = AdapterState::Ended;
                Ok(ReadResult::EndOfStream)
            }
        }
    }

    /// Discard all pending state and return to `Ready`
    ///
    /// The cancellation primitive: safe from any initialized state.
    pub fn flush(&mut self) -> Result<()> {
        if self.state == AdapterState::Uninitialized {
            return Err(MediaCoreError::BadParameter(
                "Adapter not initialized".to_string(),
            ));
        }

        self.engine.reset()?;
        self.pending_dts.lock().clear();
        self.packets_in = 0;
        self.frames_out = 0;
        self.state = AdapterState::Ready;
        Ok(())
    }
}

impl std::fmt::Debug for DecoderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderAdapter")
            .field("engine", &self.engine.name())
            .field("state", &self.state)
            .field("pending_dts", &self.pending_dts.lock().len())
            .field("packets_in", &self.packets_in)
            .field("frames_out", &self.frames_out)
            .finish()
    }
}
