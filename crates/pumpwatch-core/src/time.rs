//! Monotonic timestamps and elapsed-time formatting
//!
//! Every elapsed-time and frequency computation works on differences of
//! [`Timestamp`] values taken from one monotonic clock. Wall-clock time only
//! appears in the measurement log.

use std::ops::Add;
use std::time::{Duration, Instant};

/// Monotonic point in time, measured from the origin of the clock that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// The clock origin
    pub const ZERO: Timestamp = Timestamp(Duration::ZERO);

    /// Timestamp at the given offset from the clock origin
    pub fn from_duration(offset: Duration) -> Self {
        Self(offset)
    }

    /// Timestamp at `secs` seconds after the clock origin (negative values clamp to zero)
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_finite() && secs > 0.0 {
            Self(Duration::from_secs_f64(secs))
        } else {
            Self::ZERO
        }
    }

    /// Timestamp at `millis` milliseconds after the clock origin
    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Offset from the clock origin
    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// Offset from the clock origin in seconds
    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is later than `self`
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }

    /// Signed difference `self - earlier` in seconds
    pub fn secs_since(&self, earlier: Timestamp) -> f64 {
        self.0.as_secs_f64() - earlier.0.as_secs_f64()
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        Timestamp(self.0.saturating_add(rhs))
    }
}

/// Source of monotonic timestamps
pub trait Clock: Send + Sync {
    /// Current point in time
    fn now(&self) -> Timestamp;
}

/// Clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose origin is the moment of construction
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.origin.elapsed())
    }
}

/// Format an elapsed time in seconds as `MM:SS.mmm`
///
/// Minutes are not wrapped at 60. Negative or non-finite input formats as zero.
///
/// # Example
/// ```
/// use pumpwatch_core::time::format_time;
///
/// assert_eq!(format_time(0.0), "00:00.000");
/// assert_eq!(format_time(125.5), "02:05.500");
/// assert_eq!(format_time(3661.001), "61:01.001");
/// ```
pub fn format_time(seconds: f64) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };
    format_millis(total_ms)
}

/// Format an elapsed [`Duration`] as `MM:SS.mmm`
pub fn format_duration(elapsed: Duration) -> String {
    // Round to the nearest millisecond
    let total_ms = (elapsed.as_nanos() + 500_000) / 1_000_000;
    format_millis(total_ms as u64)
}

fn format_millis(total_ms: u64) -> String {
    let minutes = total_ms / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}.{:03}", minutes, seconds, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_zero() {
        assert_eq!(format_time(0.0), "00:00.000");
        assert_eq!(format_duration(Duration::ZERO), "00:00.000");
    }

    #[test]
    fn test_format_minutes_and_fraction() {
        assert_eq!(format_time(125.5), "02:05.500");
        assert_eq!(format_time(59.9996), "01:00.000");
    }

    #[test]
    fn test_format_minutes_unbounded() {
        assert_eq!(format_time(3661.001), "61:01.001");
        assert_eq!(format_duration(Duration::from_secs(6000)), "100:00.000");
    }

    #[test]
    fn test_format_negative_is_zero() {
        assert_eq!(format_time(-3.0), "00:00.000");
        assert_eq!(format_time(f64::NAN), "00:00.000");
    }

    #[test]
    fn test_format_duration_rounds_to_millis() {
        assert_eq!(format_duration(Duration::from_micros(1_500_400)), "00:01.500");
        assert_eq!(format_duration(Duration::from_micros(1_500_600)), "00:01.501");
    }

    #[test]
    fn test_timestamp_arithmetic() {
        let a = Timestamp::from_millis(1000);
        let b = a + Duration::from_millis(250);
        assert_eq!(b.saturating_duration_since(a), Duration::from_millis(250));
        assert_eq!(a.saturating_duration_since(b), Duration::ZERO);
        assert!((b.secs_since(a) - 0.25).abs() < 1e-9);
        assert!(a.secs_since(b) < 0.0);
    }

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
