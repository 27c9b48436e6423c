//! Pulse rate estimation
//!
//! Pulse timestamps arrive from an edge callback through a lock-free SPSC
//! queue ([`pulse_channel`]). The owning meter drains the queue into a
//! [`PulseRateEstimator`], which keeps the last N timestamps and derives the
//! frequency from the span between the oldest and the newest one.

use super::ring::SampleRing;
use crate::time::Timestamp;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;

/// Pulse queue size between edge callback and meter (covers several ticks at kHz rates)
pub const PULSE_QUEUE_SIZE: usize = 1024;

/// Frequency estimator over a fixed window of pulse timestamps
///
/// # Example
/// ```
/// use pumpwatch_core::measure::pulse::PulseRateEstimator;
/// use pumpwatch_core::time::Timestamp;
///
/// let mut estimator = PulseRateEstimator::new(5);
/// for ms in [0, 100, 200, 300] {
///     estimator.record_pulse(Timestamp::from_millis(ms));
/// }
/// assert_eq!(estimator.estimate_frequency(), None);
///
/// estimator.record_pulse(Timestamp::from_millis(400));
/// let hz = estimator.estimate_frequency().unwrap();
/// assert!((hz - 10.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct PulseRateEstimator {
    pulses: SampleRing<Timestamp>,
}

impl PulseRateEstimator {
    /// Create an estimator over the last `capacity` pulses
    pub fn new(capacity: usize) -> Self {
        Self {
            pulses: SampleRing::new(capacity),
        }
    }

    /// Record a pulse edge
    pub fn record_pulse(&mut self, timestamp: Timestamp) {
        self.pulses.push(timestamp);
    }

    /// Estimated pulse frequency in Hz
    ///
    /// `None` until the window is full, and when the window spans no time.
    pub fn estimate_frequency(&self) -> Option<f64> {
        if !self.pulses.is_full() {
            return None;
        }
        let span = self.pulses.newest()?.secs_since(self.pulses.oldest()?);
        if span <= 0.0 {
            tracing::trace!(span, "Pulse window spans no time");
            return None;
        }
        Some((self.pulses.capacity() - 1) as f64 / span)
    }

    pub fn is_full(&self) -> bool {
        self.pulses.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.pulses.capacity()
    }

    /// Number of pulses currently in the window
    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    pub fn clear(&mut self) {
        self.pulses.clear();
    }
}

/// Edge-callback end of a pulse queue
pub struct PulseProducer {
    inner: ringbuf::HeapProd<Timestamp>,
}

impl PulseProducer {
    /// Enqueue a pulse without blocking; returns false if the queue is full
    pub fn push(&mut self, timestamp: Timestamp) -> bool {
        self.inner.try_push(timestamp).is_ok()
    }
}

/// Meter end of a pulse queue
pub struct PulseInput {
    inner: ringbuf::HeapCons<Timestamp>,
}

impl PulseInput {
    /// Move every queued pulse into `estimator`, returning how many were moved
    pub fn drain_into(&mut self, estimator: &mut PulseRateEstimator) -> usize {
        let mut moved = 0;
        while let Some(ts) = self.inner.try_pop() {
            estimator.record_pulse(ts);
            moved += 1;
        }
        moved
    }
}

/// Create a lock-free single-producer single-consumer pulse queue
pub fn pulse_channel(capacity: usize) -> (PulseProducer, PulseInput) {
    let rb = HeapRb::<Timestamp>::new(capacity.max(1));
    let (prod, cons) = rb.split();
    (PulseProducer { inner: prod }, PulseInput { inner: cons })
}
