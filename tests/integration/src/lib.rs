//! Integration test utilities for mediacore
//!
//! This module provides common helpers for end-to-end pipeline tests:
//! - PCM packet and stream format builders
//! - A scripted video engine that completes frames B-frame style
//! - A frame sink that collects delivered timestamps

use crossbeam_channel::{unbounded, Receiver, Sender};
use mediacore::decode::{
    DecodeEngine, EngineProvider, PollStatus, StreamFormat, StreamParams, SubmitStatus,
};
use mediacore::frame::{CodecPacket, FrameLayout, HeapBuffer, PacketFlags};
use mediacore::pipeline::FrameSink;
use mediacore::{CodecId, MediaFrame, MediaTime, PixelFormat, Result, SampleFormat};
use std::collections::VecDeque;

/// Stream format for mono s16 PCM at `sample_rate`
pub fn pcm_stream(sample_rate: u32) -> StreamFormat {
    StreamFormat {
        codec: CodecId::Pcm,
        params: StreamParams::Audio {
            sample_format: SampleFormat::S16,
            channels: 1,
            sample_rate,
        },
        extradata: None,
    }
}

/// Stream format for a small H.264 stream with dummy sequence headers
pub fn h264_stream() -> StreamFormat {
    StreamFormat {
        codec: CodecId::H264,
        params: StreamParams::Video { width: 64, height: 48 },
        extradata: Some(vec![0x01, 0x64, 0x00, 0x1e]),
    }
}

/// Interleave a 440-ish Hz sine into s16 native-endian bytes
pub fn sine_s16(samples: usize, sample_rate: u32) -> Vec<u8> {
    let step = 2.0 * std::f64::consts::PI * 440.0 / sample_rate as f64;
    let mut data = Vec::with_capacity(samples * 2);
    for i in 0..samples {
        let value = ((i as f64 * step).sin() * 16_000.0) as i16;
        data.extend_from_slice(&value.to_ne_bytes());
    }
    data
}

/// One PCM packet of `samples` mono s16 samples starting at `offset`
pub fn pcm_packet(index: u64, offset: i64, samples: usize, sample_rate: u32) -> CodecPacket {
    CodecPacket {
        data: sine_s16(samples, sample_rate),
        index,
        format: CodecId::Pcm,
        flags: PacketFlags { sync: true, disposable: false },
        dts: MediaTime::new(offset, sample_rate as i64),
        pts: MediaTime::new(offset, sample_rate as i64),
    }
}

/// One compressed video packet; dts ascending with index, pts free
pub fn video_packet(index: u64, dts: i64, pts: i64) -> CodecPacket {
    CodecPacket {
        data: vec![index as u8; 32],
        index,
        format: CodecId::H264,
        flags: PacketFlags { sync: index == 0, disposable: false },
        dts: MediaTime::new(dts, 90_000),
        pts: MediaTime::new(pts, 90_000),
    }
}

/// Sink collecting delivered frame timestamps on a channel
pub struct CollectSink {
    tx: Sender<MediaTime>,
}

impl CollectSink {
    pub fn pair() -> (Box<dyn FrameSink>, Receiver<MediaTime>) {
        let (tx, rx) = unbounded();
        (Box::new(CollectSink { tx }), rx)
    }
}

impl FrameSink for CollectSink {
    fn deliver(&mut self, frame: MediaFrame) {
        let _ = self.tx.send(frame.pts);
    }
}

/// Video engine that buffers `delay` packets before completing any,
/// mimicking a hardware session with in-flight decode depth
pub struct DelayedVideoEngine {
    pending: VecDeque<MediaFrame>,
    delay: usize,
    draining: bool,
}

impl DelayedVideoEngine {
    pub fn new(delay: usize) -> Self {
        Self { pending: VecDeque::new(), delay, draining: false }
    }
}

impl DecodeEngine for DelayedVideoEngine {
    fn open(&mut self, format: &StreamFormat) -> Result<()> {
        match format.params {
            StreamParams::Video { .. } => Ok(()),
            StreamParams::Audio { .. } => Err(mediacore::MediaCoreError::UnsupportedFormat(
                "video engine opened with audio stream".to_string(),
            )),
        }
    }

    fn submit(&mut self, packet: &CodecPacket) -> Result<SubmitStatus> {
        let frame = MediaFrame::new(
            vec![HeapBuffer::new(packet.data.clone())],
            FrameLayout::Video {
                pixel_format: PixelFormat::Nv12,
                width: 64,
                height: 48,
                stride: 64,
                slice_height: 48,
            },
            MediaTime::INVALID,
            MediaTime::new(3_000, 90_000),
        )?;
        self.pending.push_back(frame);
        Ok(SubmitStatus::Accepted)
    }

    fn signal_end(&mut self) -> Result<()> {
        self.draining = true;
        Ok(())
    }

    fn poll(&mut self) -> Result<PollStatus> {
        let held_back = if self.draining { 0 } else { self.delay };
        if self.pending.len() > held_back {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(PollStatus::Frame(frame));
            }
        }
        if self.draining {
            Ok(PollStatus::Drained)
        } else {
            Ok(PollStatus::NeedsInput)
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.pending.clear();
        self.draining = false;
        Ok(())
    }

    fn is_hardware(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "delayed-video"
    }
}

/// Provider exposing [`DelayedVideoEngine`] as a hardware engine
pub struct DelayedVideoProvider {
    pub delay: usize,
}

impl EngineProvider for DelayedVideoProvider {
    fn supports(&self, format: &StreamFormat) -> bool {
        matches!(format.codec, CodecId::H264 | CodecId::Hevc)
    }

    fn is_hardware(&self) -> bool {
        true
    }

    fn create(&self, _format: &StreamFormat) -> Result<Box<dyn DecodeEngine>> {
        Ok(Box::new(DelayedVideoEngine::new(self.delay)))
    }
}
