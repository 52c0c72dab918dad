//! Pipeline driver
//!
//! Single-threaded cooperative orchestrator gluing packet arrival to
//! decode, resample/reorder, and sink delivery. Commands arrive on a
//! channel and are processed one at a time with no reentrancy; the only
//! state touched from engine callback threads is the reorder queue, which
//! sits behind its own mutex.
//!
//! Backpressure (`ResourceBusy`) and starvation (`NeedsInput`) from the
//! decoder are scheduling hints here, not failures: the driver drains
//! decoded frames and retries. A fatal decode error stops only the track
//! that raised it; other tracks keep running.

use crate::decode::{DecoderAdapter, ReadResult};
use crate::frame::{CodecPacket, MediaFrame};
use crate::reorder::ReorderQueue;
use crate::resample::StreamingResampler;
use crate::utils::error::{MediaCoreError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Identifies one elementary stream within a pipeline
pub type TrackId = u32;

/// Consecutive `NeedsInput` reads tolerated while draining a track to
/// end-of-stream before the engine is declared wedged
const EOS_DRAIN_STALL_LIMIT: usize = 64;

/// Consumer of finished frames
///
/// Delivery is push-style and must not block the driver; a sink that
/// needs to wait should queue internally.
pub trait FrameSink: Send {
    /// Accept one frame in presentation order
    fn deliver(&mut self, frame: MediaFrame);
}

/// Commands accepted by the pipeline's queue
pub enum PipelineCommand {
    /// One compressed packet for a track
    Feed(TrackId, CodecPacket),

    /// No further packets for a track; drain it
    EndOfStream(TrackId),

    /// Discard all pending state for a track (seek, discontinuity)
    Flush(TrackId),

    /// Stop processing; `run()` returns after this
    Shutdown,
}

/// Per-track delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackStats {
    /// Packets accepted by the decoder
    pub packets_fed: u64,

    /// Frames handed to the sink
    pub frames_delivered: u64,

    /// Frames dropped by the reorder queue
    pub frames_dropped: u64,
}

/// Lifecycle of one track within the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// Accepting packets
    Active,

    /// Drained to end-of-stream
    Ended,

    /// Stopped by a fatal decode error
    Failed,
}

/// Decode-to-sink chain for a single elementary stream
pub struct TrackPipeline {
    adapter: DecoderAdapter,

    /// Sample-rate conversion, audio tracks only
    resampler: Option<StreamingResampler>,

    /// Presentation-order release, tracks whose engine completes frames
    /// out of pts order. Shared with engine callback threads.
    reorder: Option<Arc<Mutex<ReorderQueue>>>,

    sink: Box<dyn FrameSink>,

    state: TrackState,

    stats: TrackStats,
}

impl TrackPipeline {
    /// Assemble a track chain; stages not supplied are pass-through
    pub fn new(
        adapter: DecoderAdapter,
        resampler: Option<StreamingResampler>,
        reorder: Option<Arc<Mutex<ReorderQueue>>>,
        sink: Box<dyn FrameSink>,
    ) -> Self {
        Self {
            adapter,
            resampler,
            reorder,
            sink,
            state: TrackState::Active,
            stats: TrackStats::default(),
        }
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn stats(&self) -> TrackStats {
        self.stats
    }

    /// Reorder queue handle, for engines that push completions directly
    pub fn reorder_queue(&self) -> Option<Arc<Mutex<ReorderQueue>>> {
        self.reorder.clone()
    }

    /// Feed one packet through decode and downstream stages
    ///
    /// Retries on decoder backpressure after draining output. Fatal
    /// decode errors mark the track `Failed` and are returned; the
    /// caller decides whether the whole pipeline stops.
    pub fn feed(&mut self, packet: &CodecPacket) -> Result<()> {
        if self.state != TrackState::Active {
            return Err(MediaCoreError::BadParameter(format!(
                "Track is {:?}, not accepting packets",
                self.state
            )));
        }

        loop {
            match self.adapter.write(Some(packet)) {
                Ok(()) => break,
                Err(MediaCoreError::ResourceBusy) => {
                    // Make room, then retry the same packet. If draining
                    // freed nothing the engine is wedged.
                    if self.drain_output()? == 0 {
                        return Err(MediaCoreError::ResourceBusy);
                    }
                }
                Err(err) => return Err(self.fail(err)),
            }
        }

        self.stats.packets_fed += 1;
        if let Err(err) = self.drain_output() {
            return Err(self.fail(err));
        }
        Ok(())
    }

    /// Signal end-of-stream and drain everything downstream
    pub fn end_of_stream(&mut self) -> Result<()> {
        if self.state != TrackState::Active {
            return Ok(());
        }

        if let Err(err) = self.adapter.write(None) {
            return Err(self.fail(err));
        }

        // A draining asynchronous engine may report NeedsInput while
        // completions are still in flight; retry a bounded number of
        // times instead of spinning, and treat exhaustion as a wedged
        // engine.
        let mut stalls = 0;
        loop {
            match self.adapter.read() {
                Ok(ReadResult::Frame(frame)) => {
                    stalls = 0;
                    self.route_frame(frame)?;
                }
                Ok(ReadResult::NeedsInput) => {
                    stalls += 1;
                    if stalls > EOS_DRAIN_STALL_LIMIT {
                        return Err(self.fail(MediaCoreError::Internal(
                            "Engine kept requesting input after end-of-stream".to_string(),
                        )));
                    }
                    std::thread::yield_now();
                }
                Ok(ReadResult::EndOfStream) => break,
                Err(err) => return Err(self.fail(err)),
            }
        }

        if let Some(reorder) = &self.reorder {
            let mut queue = reorder.lock();
            queue.mark_end_of_stream();
            loop {
                match queue.pop() {
                    Ok(Some(frame)) => {
                        self.sink.deliver(frame);
                        self.stats.frames_delivered += 1;
                    }
                    Ok(None) => break,
                    Err(err) => {
                        self.stats.frames_dropped += 1;
                        log::warn!("Dropped frame during drain: {}", err);
                    }
                }
            }
        }

        self.state = TrackState::Ended;
        Ok(())
    }

    /// Discard all in-flight state and return the track to accepting
    pub fn flush(&mut self) -> Result<()> {
        self.adapter.flush()?;
        if let Some(resampler) = &mut self.resampler {
            resampler.reset();
        }
        if let Some(reorder) = &self.reorder {
            // clear() bumps the generation so stale engine callbacks
            // land in the old epoch and are ignored.
            reorder.lock().clear();
        }
        self.stats = TrackStats::default();
        self.state = TrackState::Active;
        Ok(())
    }

    /// Pull decoded frames until the engine wants input; returns how
    /// many frames moved downstream
    fn drain_output(&mut self) -> Result<usize> {
        let mut moved = 0;
        loop {
            match self.adapter.read()? {
                ReadResult::Frame(frame) => {
                    self.route_frame(frame)?;
                    moved += 1;
                }
                ReadResult::NeedsInput | ReadResult::EndOfStream => return Ok(moved),
            }
        }
    }

    /// Send one decoded frame through resample and reorder to the sink
    fn route_frame(&mut self, frame: MediaFrame) -> Result<()> {
        let frame = match &mut self.resampler {
            Some(resampler) => resampler.resample(&frame)?,
            None => frame,
        };

        let Some(reorder) = &self.reorder else {
            self.sink.deliver(frame);
            self.stats.frames_delivered += 1;
            return Ok(());
        };

        let mut queue = reorder.lock();
        queue.push(frame)?;
        loop {
            match queue.pop() {
                Ok(Some(ready)) => {
                    self.sink.deliver(ready);
                    self.stats.frames_delivered += 1;
                }
                Ok(None) => break,
                Err(err) => {
                    // Recoverable: the offending frame was dropped.
                    self.stats.frames_dropped += 1;
                    log::warn!("Out-of-order frame dropped: {}", err);
                }
            }
        }
        Ok(())
    }

    fn fail(&mut self, err: MediaCoreError) -> MediaCoreError {
        log::error!("Track stopped: {}", err);
        self.state = TrackState::Failed;
        err
    }
}

/// Multi-track pipeline fed by a command queue
///
/// `run()` processes commands one at a time until `Shutdown`. A track
/// failure is logged and isolates that track; remaining tracks continue.
pub struct Pipeline {
    tracks: HashMap<TrackId, TrackPipeline>,
    command_tx: Sender<PipelineCommand>,
    command_rx: Receiver<PipelineCommand>,
}

impl Pipeline {
    pub fn new() -> Self {
        let (command_tx, command_rx) = unbounded();
        Self { tracks: HashMap::new(), command_tx, command_rx }
    }

    /// Register a track chain under an id; replaces any previous holder
    pub fn add_track(&mut self, id: TrackId, track: TrackPipeline) {
        if self.tracks.insert(id, track).is_some() {
            log::warn!("Track {} replaced", id);
        }
    }

    /// Handle for producers to enqueue commands
    pub fn sender(&self) -> Sender<PipelineCommand> {
        self.command_tx.clone()
    }

    pub fn track(&self, id: TrackId) -> Option<&TrackPipeline> {
        self.tracks.get(&id)
    }

    /// Process queued commands until `Shutdown` or the queue closes
    pub fn run(&mut self) {
        while let Ok(command) = self.command_rx.recv() {
            if !self.dispatch(command) {
                break;
            }
        }
    }

    /// Process commands already queued without blocking for more
    pub fn poll(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            if !self.dispatch(command) {
                break;
            }
        }
    }

    fn dispatch(&mut self, command: PipelineCommand) -> bool {
        match command {
            PipelineCommand::Feed(id, packet) => {
                self.with_track(id, |track| track.feed(&packet));
            }
            PipelineCommand::EndOfStream(id) => {
                self.with_track(id, |track| track.end_of_stream());
            }
            PipelineCommand::Flush(id) => {
                self.with_track(id, |track| track.flush());
            }
            PipelineCommand::Shutdown => return false,
        }
        true
    }

    fn with_track<F>(&mut self, id: TrackId, op: F)
    where
        F: FnOnce(&mut TrackPipeline) -> Result<()>,
    {
        let Some(track) = self.tracks.get_mut(&id) else {
            log::warn!("Command for unknown track {}", id);
            return;
        };
        if let Err(err) = op(track) {
            // Per-track isolation: the failure stays on this track.
            log::error!("Track {}: {}", id, err);
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
