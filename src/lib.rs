//! mediacore - a media pipeline core
//!
//! This crate ingests compressed audio/video packets, drives pluggable
//! hardware/software decode engines, and performs sample-rate conversion
//! and frame reordering before handing finished frames to an output sink.
//!
//! Container demuxing, OS output devices, and the codec bindings
//! themselves are external collaborators: the crate models their
//! contracts ([`decode::DecodeEngine`], [`pipeline::FrameSink`]) and owns
//! the parts that must reason about time, ordering, and buffer geometry
//! under streaming and asynchronous conditions:
//!
//! - [`time::MediaTime`] - rational timestamps with exact comparison
//! - [`resample::StreamingResampler`] - drift-free chunked sample-rate
//!   conversion with per-channel fractional phase state
//! - [`decode::DecoderAdapter`] - push/pull state machine over sync or
//!   async engines, restoring timestamps via an ordered FIFO
//! - [`reorder::ReorderQueue`] - lookahead-gated release of decoded
//!   frames in strictly increasing presentation order
//! - [`pipeline::Pipeline`] - single-threaded command-driven driver
//!   gluing the stages together with per-track failure isolation

pub mod decode;
pub mod frame;
pub mod pipeline;
pub mod reorder;
pub mod resample;
pub mod time;
pub mod utils;

pub use decode::{DecoderAdapter, DecoderMode, ReadResult, StreamFormat, StreamParams};
pub use frame::{CodecId, CodecPacket, MediaFrame, PixelFormat, SampleFormat};
pub use pipeline::{FrameSink, Pipeline, PipelineCommand, TrackPipeline};
pub use reorder::ReorderQueue;
pub use resample::{AudioFormat, StreamingResampler};
pub use time::MediaTime;
pub use utils::error::{MediaCoreError, Result};
pub use utils::PipelineConfig;
