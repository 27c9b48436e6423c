//! Engine speed meter
//!
//! The engine sensor emits `k` pulses per revolution. The pulse frequency over
//! the last [`RPM_WINDOW`] pulses is divided by `k`, smoothed, and scaled to
//! revolutions per minute.

use super::bounds::{clamp_to_max, MAX_RPM};
use super::pulse::{PulseInput, PulseRateEstimator};
use super::ring::SampleRing;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Pulses kept for the frequency estimate
pub const RPM_WINDOW: usize = 10;

/// Default smoothing window (exponential: alpha = 1 / window), at most [`MAX_WINDOW`](super::MAX_WINDOW)
pub const DEFAULT_SMOOTHING_WINDOW: usize = 25;

/// Valid pulses-per-revolution range
pub const PULSES_PER_REV_RANGE: std::ops::RangeInclusive<u8> = 1..=4;

/// Smoothing strategy applied to the revolution frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Smoothing {
    /// Exponentially weighted moving average, alpha = 1 / window
    #[default]
    Exponential,
    /// Plain mean of the last `window` values
    Running,
}

/// Smoothing state
#[derive(Debug, Clone)]
enum Smoother {
    Exponential { alpha: f64, average: f64 },
    Running { values: SampleRing<f64> },
}

impl Smoother {
    fn new(kind: Smoothing, window: usize) -> Self {
        let window = window.max(1);
        match kind {
            Smoothing::Exponential => Smoother::Exponential {
                alpha: 1.0 / window as f64,
                average: 0.0,
            },
            Smoothing::Running => Smoother::Running {
                values: SampleRing::new(window),
            },
        }
    }

    fn update(&mut self, sample: f64) -> f64 {
        match self {
            Smoother::Exponential { alpha, average } => {
                *average = (1.0 - *alpha) * *average + *alpha * sample;
                *average
            }
            Smoother::Running { values } => {
                // Prime with the first value so the mean starts at the signal level
                if values.is_empty() {
                    for _ in 0..values.capacity() {
                        values.push(sample);
                    }
                }
                values.push(sample);
                values.mean().unwrap_or(sample)
            }
        }
    }
}

/// Engine speed meter reporting revolutions per minute
pub struct RpmMeter {
    estimator: PulseRateEstimator,
    pulses_per_rev: u8,
    smoother: Smoother,
    input: Option<PulseInput>,
}

impl RpmMeter {
    /// Create a meter fed through [`Self::record_pulse`]
    ///
    /// `pulses_per_rev` outside 1..=4 falls back to 1.
    pub fn new(pulses_per_rev: u8, smoothing: Smoothing, window: usize) -> Self {
        let pulses_per_rev = if PULSES_PER_REV_RANGE.contains(&pulses_per_rev) {
            pulses_per_rev
        } else {
            tracing::warn!(pulses_per_rev, "Pulses per revolution out of range 1..=4, using 1");
            1
        };
        Self {
            estimator: PulseRateEstimator::new(RPM_WINDOW),
            pulses_per_rev,
            smoother: Smoother::new(smoothing, window),
            input: None,
        }
    }

    /// Create a meter fed from the pulse queue of an edge callback
    pub fn with_input(pulses_per_rev: u8, smoothing: Smoothing, window: usize, input: PulseInput) -> Self {
        Self {
            input: Some(input),
            ..Self::new(pulses_per_rev, smoothing, window)
        }
    }

    pub fn pulses_per_rev(&self) -> u8 {
        self.pulses_per_rev
    }

    /// Record an engine pulse directly
    pub fn record_pulse(&mut self, timestamp: Timestamp) {
        self.estimator.record_pulse(timestamp);
    }

    /// Current engine speed in 1/min
    ///
    /// Zero while the engine has not produced a full window of pulses. Each
    /// call with a full window advances the smoothing state.
    pub fn current_rpm(&mut self) -> u32 {
        if let Some(input) = self.input.as_mut() {
            input.drain_into(&mut self.estimator);
        }
        let Some(frequency) = self.estimator.estimate_frequency() else {
            return 0;
        };
        let revs_per_sec = self.smoother.update(frequency / f64::from(self.pulses_per_rev));
        clamp_to_max(revs_per_sec * 60.0, MAX_RPM, "rpm")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Feed a full window at `hz` pulses per second
    fn feed(meter: &mut RpmMeter, hz: f64) {
        let period_ms = 1000.0 / hz;
        for i in 0..RPM_WINDOW {
            meter.record_pulse(Timestamp::from_secs_f64(i as f64 * period_ms / 1000.0));
        }
    }

    #[test]
    fn test_zero_until_window_full() {
        let mut m = RpmMeter::new(1, Smoothing::Exponential, 25);
        for i in 0..(RPM_WINDOW as u64 - 1) {
            m.record_pulse(Timestamp::from_millis(i * 10));
            assert_eq!(m.current_rpm(), 0);
        }
    }

    #[test]
    fn test_exponential_first_step() {
        let mut m = RpmMeter::new(1, Smoothing::Exponential, 25);
        feed(&mut m, 50.0);
        // average = 0.04 * 50 = 2 rev/s
        assert_eq!(m.current_rpm(), 120);
    }

    #[test]
    fn test_exponential_state_persists_and_converges() {
        let mut m = RpmMeter::new(1, Smoothing::Exponential, 25);
        feed(&mut m, 50.0);
        let first = m.current_rpm();
        let second = m.current_rpm();
        assert!(second > first);
        for _ in 0..1000 {
            m.current_rpm();
        }
        assert_eq!(m.current_rpm(), 3000);
    }

    #[test]
    fn test_pulses_per_rev_divides() {
        let mut m = RpmMeter::new(2, Smoothing::Running, 25);
        feed(&mut m, 50.0);
        assert_eq!(m.current_rpm(), 1500);
    }

    #[test]
    fn test_running_average_primes_with_first_value() {
        let mut m = RpmMeter::new(1, Smoothing::Running, 25);
        feed(&mut m, 20.0);
        assert_eq!(m.current_rpm(), 1200);
    }

    #[test]
    fn test_running_average_moves_towards_new_level() {
        let mut smoother = Smoother::new(Smoothing::Running, 4);
        assert_relative_eq!(smoother.update(10.0), 10.0);
        assert_relative_eq!(smoother.update(20.0), 12.5);
        assert_relative_eq!(smoother.update(20.0), 15.0);
    }

    #[test]
    fn test_invalid_pulses_per_rev_defaults() {
        assert_eq!(RpmMeter::new(0, Smoothing::Exponential, 25).pulses_per_rev(), 1);
        assert_eq!(RpmMeter::new(5, Smoothing::Exponential, 25).pulses_per_rev(), 1);
        assert_eq!(RpmMeter::new(4, Smoothing::Exponential, 25).pulses_per_rev(), 4);
    }

    #[test]
    fn test_clamps_to_max() {
        let mut m = RpmMeter::new(1, Smoothing::Running, 1);
        for i in 0..RPM_WINDOW as u64 {
            m.record_pulse(Timestamp::from_duration(std::time::Duration::from_micros(i)));
        }
        assert_eq!(m.current_rpm(), MAX_RPM);
    }
}
