//! Rational media timestamps
//!
//! This module defines `MediaTime`, the base arithmetic unit for every
//! timestamp in the pipeline: a signed value counted in ticks of a
//! per-stream timescale. Comparison and arithmetic normalize by
//! cross-multiplication so that ordering always agrees with arithmetic;
//! conversion to floating seconds exists for display and logging only.

use std::cmp::Ordering;
use std::ops::{Add, Sub};

/// Reserved value encoding for the invalid sentinel
const INVALID_VALUE: i64 = i64::MIN;

/// Reserved value encoding for the begin-of-stream sentinel
const BEGIN_VALUE: i64 = i64::MIN + 1;

/// Reserved value encoding for the end-of-stream sentinel
const END_VALUE: i64 = i64::MAX;

/// A timestamp expressed as `value` ticks of a `timescale` ticks-per-second
/// clock.
///
/// Regular values keep the invariant `timescale > 0`. The three sentinels
/// (`INVALID`, `BEGIN`, `END`) use reserved value encodings with
/// `timescale = 1`.
#[derive(Debug, Clone, Copy)]
pub struct MediaTime {
    /// Tick count
    value: i64,

    /// Ticks per second; always positive for regular values
    timescale: i64,
}

impl MediaTime {
    /// Sentinel: no meaningful timestamp
    pub const INVALID: MediaTime = MediaTime { value: INVALID_VALUE, timescale: 1 };

    /// Sentinel ordering before every regular value
    pub const BEGIN: MediaTime = MediaTime { value: BEGIN_VALUE, timescale: 1 };

    /// Sentinel ordering after every regular value
    pub const END: MediaTime = MediaTime { value: END_VALUE, timescale: 1 };

    /// Zero at a 1 Hz timescale
    pub const ZERO: MediaTime = MediaTime { value: 0, timescale: 1 };

    /// Create a timestamp of `value` ticks at `timescale` ticks per second
    ///
    /// Returns `INVALID` when the timescale is not positive or the value
    /// collides with a reserved sentinel encoding.
    pub fn new(value: i64, timescale: i64) -> Self {
        if timescale <= 0 || value == INVALID_VALUE || value == BEGIN_VALUE || value == END_VALUE {
            return Self::INVALID;
        }
        Self { value, timescale }
    }

    /// Create a timestamp from floating seconds at the given timescale
    pub fn from_seconds(seconds: f64, timescale: i64) -> Self {
        if timescale <= 0 || !seconds.is_finite() {
            return Self::INVALID;
        }
        Self::new((seconds * timescale as f64).round() as i64, timescale)
    }

    /// Tick count
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Ticks per second
    pub fn timescale(&self) -> i64 {
        self.timescale
    }

    /// Whether this is a regular (non-sentinel) timestamp
    pub fn is_valid(&self) -> bool {
        !self.is_sentinel()
    }

    fn is_sentinel(&self) -> bool {
        matches!(self.value, INVALID_VALUE | BEGIN_VALUE | END_VALUE)
    }

    /// Rescale to a new timescale
    ///
    /// Lossy truncating integer operation:
    /// `new_value = (new_timescale * value) / old_timescale`. Sentinels
    /// rescale to themselves; a non-positive target yields `INVALID`.
    pub fn rescale(&self, new_timescale: i64) -> Self {
        if new_timescale <= 0 {
            return Self::INVALID;
        }
        if self.is_sentinel() {
            return *self;
        }
        let scaled = (new_timescale as i128 * self.value as i128) / self.timescale as i128;
        Self::new(scaled as i64, new_timescale)
    }

    /// Convert to floating seconds
    ///
    /// For display and logging only; never use the result for
    /// ordering-critical comparisons.
    pub fn to_seconds(&self) -> f64 {
        match self.value {
            INVALID_VALUE => f64::NAN,
            BEGIN_VALUE => f64::NEG_INFINITY,
            END_VALUE => f64::INFINITY,
            v => v as f64 / self.timescale as f64,
        }
    }

    /// Checked addition normalizing to a common timescale
    ///
    /// Returns `None` if either side is a sentinel or the cross-multiplied
    /// sum does not fit in an i64.
    pub fn checked_add(&self, other: MediaTime) -> Option<MediaTime> {
        if self.is_sentinel() || other.is_sentinel() {
            return None;
        }
        if self.timescale == other.timescale {
            return Some(Self::new(self.value.checked_add(other.value)?, self.timescale));
        }
        let scale = self.timescale as i128 * other.timescale as i128;
        let sum = self.value as i128 * other.timescale as i128
            + other.value as i128 * self.timescale as i128;
        Self::reduce(sum, scale)
    }

    /// Checked subtraction normalizing to a common timescale
    pub fn checked_sub(&self, other: MediaTime) -> Option<MediaTime> {
        if other.is_sentinel() {
            return None;
        }
        let negated = MediaTime { value: other.value.checked_neg()?, timescale: other.timescale };
        self.checked_add(negated)
    }

    /// Reduce an i128 value/timescale pair back into i64 range, dividing
    /// out the gcd first
    fn reduce(value: i128, timescale: i128) -> Option<MediaTime> {
        let g = gcd(value.unsigned_abs(), timescale.unsigned_abs()).max(1) as i128;
        let (value, timescale) = (value / g, timescale / g);
        if value > i64::MAX as i128
            || value < i64::MIN as i128
            || timescale > i64::MAX as i128
        {
            return None;
        }
        Some(MediaTime::new(value as i64, timescale as i64))
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        match (self.is_sentinel(), other.is_sentinel()) {
            (true, true) => self.value == other.value,
            (true, false) | (false, true) => false,
            // Exact cross-multiplication; i128 cannot overflow for two
            // i64 operands.
            (false, false) => {
                self.value as i128 * other.timescale as i128
                    == other.value as i128 * self.timescale as i128
            }
        }
    }
}

impl PartialOrd for MediaTime {
    /// Exact cross-multiplied ordering, consistent with arithmetic.
    ///
    /// `INVALID` is unordered against everything but itself, so `Ord`
    /// cannot be implemented for this type.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.value, other.value) {
            (INVALID_VALUE, INVALID_VALUE) => Some(Ordering::Equal),
            (INVALID_VALUE, _) | (_, INVALID_VALUE) => None,
            (BEGIN_VALUE, BEGIN_VALUE) | (END_VALUE, END_VALUE) => Some(Ordering::Equal),
            (BEGIN_VALUE, _) => Some(Ordering::Less),
            (_, BEGIN_VALUE) => Some(Ordering::Greater),
            (END_VALUE, _) => Some(Ordering::Greater),
            (_, END_VALUE) => Some(Ordering::Less),
            _ => {
                let lhs = self.value as i128 * other.timescale as i128;
                let rhs = other.value as i128 * self.timescale as i128;
                Some(lhs.cmp(&rhs))
            }
        }
    }
}

impl Add for MediaTime {
    type Output = MediaTime;

    fn add(self, other: MediaTime) -> MediaTime {
        self.checked_add(other).unwrap_or(MediaTime::INVALID)
    }
}

impl Sub for MediaTime {
    type Output = MediaTime;

    fn sub(self, other: MediaTime) -> MediaTime {
        self.checked_sub(other).unwrap_or(MediaTime::INVALID)
    }
}

impl std::fmt::Display for MediaTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.value {
            INVALID_VALUE => write!(f, "invalid"),
            BEGIN_VALUE => write!(f, "begin"),
            END_VALUE => write!(f, "end"),
            v => write!(f, "{}/{}", v, self.timescale),
        }
    }
}
