//! End-to-end pipeline tests
//!
//! These tests drive the full packet → decode → resample/reorder → sink
//! path with the built-in PCM engine and a scripted hardware-style video
//! engine, verifying:
//! - Sample-rate conversion across many small packets
//! - Timestamp restoration and presentation-order release
//! - Flush and reuse mid-stream
//! - Per-track failure isolation

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use mediacore::pipeline::{
    FrameSink, Pipeline, PipelineCommand, TrackPipeline, TrackState,
};
use mediacore::{
    AudioFormat, DecoderAdapter, DecoderMode, MediaFrame, MediaTime, ReorderQueue,
    SampleFormat, StreamingResampler,
};
use mediacore_integration_tests::{
    h264_stream, pcm_packet, pcm_stream, video_packet, CollectSink, DelayedVideoProvider,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Sink recording (pts, sample count) per delivered frame
struct AudioSink {
    tx: Sender<(MediaTime, usize)>,
}

impl AudioSink {
    fn pair() -> (Box<dyn FrameSink>, Receiver<(MediaTime, usize)>) {
        let (tx, rx) = unbounded();
        (Box::new(AudioSink { tx }), rx)
    }
}

impl FrameSink for AudioSink {
    fn deliver(&mut self, frame: MediaFrame) {
        let _ = self.tx.send((frame.pts, frame.sample_count()));
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn audio_track(rate_in: u32, rate_out: u32, sink: Box<dyn FrameSink>) -> Result<TrackPipeline> {
    let format = pcm_stream(rate_in);
    let providers = DecoderAdapter::default_providers();
    let mut adapter = DecoderAdapter::create(DecoderMode::Software, &format, &providers)?;
    adapter.init(&format)?;

    let resampler = StreamingResampler::new(
        AudioFormat {
            sample_format: SampleFormat::S16,
            channels: 1,
            sample_rate: rate_in,
        },
        AudioFormat {
            sample_format: SampleFormat::S16,
            channels: 1,
            sample_rate: rate_out,
        },
    )?;

    Ok(TrackPipeline::new(adapter, Some(resampler), None, sink))
}

fn video_track(delay: usize, sink: Box<dyn FrameSink>) -> Result<TrackPipeline> {
    let format = h264_stream();
    let providers: Vec<Box<dyn mediacore::decode::EngineProvider>> =
        vec![Box::new(DelayedVideoProvider { delay })];
    let mut adapter = DecoderAdapter::create(DecoderMode::Hardware, &format, &providers)?;
    adapter.init(&format)?;

    let reorder = Arc::new(Mutex::new(ReorderQueue::new()));
    Ok(TrackPipeline::new(adapter, None, Some(reorder), sink))
}

#[test]
fn test_audio_chunked_resample_end_to_end() -> Result<()> {
    init_logging();
    let (sink, rx) = AudioSink::pair();
    let mut track = audio_track(8_000, 48_000, sink)?;

    // One second of audio in 10 packets of 800 samples.
    for i in 0..10u64 {
        track.feed(&pcm_packet(i, i as i64 * 800, 800, 8_000))?;
    }
    track.end_of_stream()?;

    let delivered: Vec<(MediaTime, usize)> = rx.try_iter().collect();
    assert_eq!(delivered.len(), 10);

    // Input pts values pass through the decoder FIFO unchanged.
    for (i, (pts, _)) in delivered.iter().enumerate() {
        assert_eq!(*pts, MediaTime::new(i as i64 * 800, 8_000));
    }

    // 6x upsampling: one second in yields one second out, give or take
    // one sample of fractional carry across the whole stream.
    let total: usize = delivered.iter().map(|(_, n)| n).sum();
    assert!((total as i64 - 48_000).abs() <= 1, "total output {}", total);

    assert_eq!(track.state(), TrackState::Ended);
    assert_eq!(track.stats().packets_fed, 10);
    assert_eq!(track.stats().frames_delivered, 10);
    Ok(())
}

#[test]
fn test_video_timestamps_restored_in_order() -> Result<()> {
    init_logging();
    let (sink, rx) = CollectSink::pair();
    // Engine holds three frames in flight before completing any.
    let mut track = video_track(3, sink)?;

    // B-frame style: dts ascending, pts shuffled within each GOP.
    let pts_order = [2i64, 0, 1, 5, 3, 4, 8, 6, 7];
    for (i, &p) in pts_order.iter().enumerate() {
        track.feed(&video_packet(i as u64, i as i64 * 3_000, p * 3_000))?;
    }
    track.end_of_stream()?;

    // The adapter re-stamps with submission dts, and the reorder queue
    // releases in increasing order, so the sink sees ascending values
    // with nothing dropped.
    let delivered: Vec<i64> = rx.try_iter().map(|t| t.value()).collect();
    let expected: Vec<i64> = (0..9).map(|i| i * 3_000).collect();
    assert_eq!(delivered, expected);
    assert_eq!(track.stats().frames_dropped, 0);
    Ok(())
}

#[test]
fn test_flush_mid_stream_and_reuse() -> Result<()> {
    init_logging();
    let (sink, rx) = CollectSink::pair();
    let mut track = video_track(0, sink)?;

    for i in 0..3u64 {
        track.feed(&video_packet(i, i as i64 * 3_000, i as i64 * 3_000))?;
    }
    track.flush()?;
    // Everything buffered pre-flush is gone.
    assert_eq!(rx.try_iter().count(), 0);

    // Seek back to zero: pts values repeat, which would violate the
    // reorder invariant had clear() not reset the release tracker.
    for i in 0..5u64 {
        track.feed(&video_packet(i, i as i64 * 3_000, i as i64 * 3_000))?;
    }
    track.end_of_stream()?;

    let delivered: Vec<i64> = rx.try_iter().map(|t| t.value()).collect();
    assert_eq!(delivered, vec![0, 3_000, 6_000, 9_000, 12_000]);
    assert_eq!(track.stats().frames_dropped, 0);
    Ok(())
}

#[test]
fn test_track_failure_is_isolated() -> Result<()> {
    init_logging();
    let mut pipeline = Pipeline::new();

    let (audio_sink, audio_rx) = AudioSink::pair();
    pipeline.add_track(1, audio_track(8_000, 16_000, audio_sink)?);

    let (bad_sink, _bad_rx) = CollectSink::pair();
    pipeline.add_track(2, audio_track(8_000, 16_000, bad_sink)?);

    // Track 2 gets a malformed PCM packet: an odd byte count cannot be
    // whole s16 frames, which the PCM engine treats as a fatal error.
    let mut bad_packet = pcm_packet(0, 0, 100, 8_000);
    bad_packet.data.truncate(99);

    let tx = pipeline.sender();
    tx.send(PipelineCommand::Feed(2, bad_packet))?;
    tx.send(PipelineCommand::Feed(1, pcm_packet(0, 0, 400, 8_000)))?;
    tx.send(PipelineCommand::Feed(1, pcm_packet(1, 400, 400, 8_000)))?;
    tx.send(PipelineCommand::EndOfStream(1))?;
    tx.send(PipelineCommand::Shutdown)?;
    pipeline.run();

    assert_eq!(pipeline.track(2).unwrap().state(), TrackState::Failed);
    assert_eq!(pipeline.track(1).unwrap().state(), TrackState::Ended);
    assert_eq!(audio_rx.try_iter().count(), 2);
    Ok(())
}
