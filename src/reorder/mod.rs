//! Presentation-order frame release
//!
//! Hardware decode engines with B-frame support complete frames out of
//! presentation order. `ReorderQueue` buffers decoded frames and releases
//! them in ascending pts order once enough lookahead has accumulated, or
//! unconditionally once end-of-stream is reached. A generation counter
//! bumped on `clear()` lets asynchronous engine callbacks detect that the
//! queue was flushed underneath them and drop their frame instead of
//! corrupting freshly-reset state.

use crate::frame::MediaFrame;
use crate::time::MediaTime;
use crate::utils::error::{MediaCoreError, Result};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// How many frames must be buffered before any is released
///
/// Too small risks releasing out-of-order frames; too large adds latency.
/// Matches the deepest reordering the supported codecs produce in
/// practice.
pub const DEFAULT_LOOKAHEAD: usize = 4;

/// Total-order key over valid pts values
#[derive(Debug, Clone, Copy, PartialEq)]
struct PtsKey(MediaTime);

impl Eq for PtsKey {}

impl PartialOrd for PtsKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PtsKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // push() rejects INVALID, so every stored pts is comparable.
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// Queue statistics for monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct ReorderStats {
    /// Total frames pushed
    pub frames_pushed: u64,

    /// Total frames released in order
    pub frames_released: u64,

    /// Frames dropped for violating release order
    pub frames_dropped: u64,

    /// Frames rejected as stale after a flush
    pub stale_rejected: u64,

    /// Maximum buffered depth reached
    pub max_depth: usize,
}

/// Bounded-lookahead pts-ordered release buffer
pub struct ReorderQueue {
    /// Buffered frames keyed by (pts, insertion sequence); the sequence
    /// keeps duplicate pts stable
    entries: BTreeMap<(PtsKey, u64), MediaFrame>,

    /// Insertion counter for stable ties
    next_sequence: u64,

    /// Frames required before release starts (EOS lifts the gate)
    lookahead: usize,

    /// End-of-stream observed
    at_end: bool,

    /// pts of the last released frame
    last_released: Option<MediaTime>,

    /// Bumped on every clear(); stale async pushes compare against it
    generation: u64,

    /// Statistics
    stats: ReorderStats,
}

impl ReorderQueue {
    /// Create a queue with the default lookahead
    pub fn new() -> Self {
        Self::with_lookahead(DEFAULT_LOOKAHEAD)
    }

    /// Create a queue with a specific lookahead threshold
    pub fn with_lookahead(lookahead: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            next_sequence: 0,
            lookahead,
            at_end: false,
            last_released: None,
            generation: 0,
            stats: ReorderStats::default(),
        }
    }

    /// Insert a decoded frame pending ordered release
    ///
    /// Frames must carry a comparable pts; `INVALID` is rejected with
    /// `BadParameter`.
    pub fn push(&mut self, frame: MediaFrame) -> Result<()> {
        if !frame.pts.is_valid() {
            return Err(MediaCoreError::BadParameter(
                "Reorder queue requires a valid pts".to_string(),
            ));
        }

        let key = (PtsKey(frame.pts), self.next_sequence);
        self.next_sequence += 1;
        self.entries.insert(key, frame);

        self.stats.frames_pushed += 1;
        self.stats.max_depth = self.stats.max_depth.max(self.entries.len());

        Ok(())
    }

    /// Insert from an asynchronous engine callback
    ///
    /// `generation` is the value the callback captured before decode was
    /// submitted. If the queue was cleared since, the frame is silently
    /// dropped and `false` is returned.
    pub fn push_guarded(&mut self, frame: MediaFrame, generation: u64) -> Result<bool> {
        if generation != self.generation {
            log::debug!(
                "Dropping stale frame (generation {} != {})",
                generation,
                self.generation
            );
            self.stats.stale_rejected += 1;
            return Ok(false);
        }
        self.push(frame)?;
        Ok(true)
    }

    /// Signal that no further frames will be pushed for this stream
    pub fn mark_end_of_stream(&mut self) {
        self.at_end = true;
    }

    /// Whether end-of-stream has been signaled
    pub fn is_at_end(&self) -> bool {
        self.at_end
    }

    /// Release the next frame in presentation order, if allowed
    ///
    /// Returns `None` while fewer than `lookahead` frames are buffered and
    /// end-of-stream has not been signaled. After end-of-stream the gate
    /// is lifted and the buffer drains unconditionally.
    ///
    /// A frame whose pts is below the last released pts is dropped and
    /// reported as `TimestampOrderViolation`; equal pts (duplicates) are
    /// released in insertion order. The queue stays usable after a
    /// violation.
    pub fn pop(&mut self) -> Result<Option<MediaFrame>> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        if !self.at_end && self.entries.len() < self.lookahead {
            return Ok(None);
        }

        let key = *self.entries.keys().next().ok_or_else(|| {
            MediaCoreError::Internal("Reorder queue emptied concurrently".to_string())
        })?;
        let frame = self.entries.remove(&key).ok_or_else(|| {
            MediaCoreError::Internal("Reorder queue entry vanished".to_string())
        })?;

        if let Some(last) = self.last_released {
            if frame.pts.partial_cmp(&last) == Some(Ordering::Less) {
                log::warn!(
                    "Dropping frame with pts {} after releasing {}",
                    frame.pts,
                    last
                );
                self.stats.frames_dropped += 1;
                return Err(MediaCoreError::TimestampOrderViolation {
                    pts: frame.pts.value(),
                    last: last.value(),
                });
            }
        }

        self.last_released = Some(frame.pts);
        self.stats.frames_released += 1;
        Ok(Some(frame))
    }

    /// Discard all buffered frames and reset release tracking
    ///
    /// Bumps the generation counter so in-flight asynchronous pushes for
    /// the old stream position become no-ops.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_released = None;
        self.at_end = false;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Current generation; captured by engine callbacks before decode
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of buffered frames
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no frames are buffered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queue statistics
    pub fn stats(&self) -> ReorderStats {
        self.stats
    }
}

impl Default for ReorderQueue {
    fn default() -> Self {
        Self::new()
    }
}
