//! Water flow meter
//!
//! The flow sensor emits pulses at a rate proportional to the flow. The
//! frequency over the last [`FLOW_WINDOW`] pulses is converted with
//! `lpm = k * (f + q)`.

use super::bounds::{clamp_to_max, MAX_FLOW_LPM};
use super::pulse::{PulseInput, PulseRateEstimator};
use super::Calibration;
use crate::time::Timestamp;

/// Pulses kept for the frequency estimate
pub const FLOW_WINDOW: usize = 5;

/// Flow meter reporting liters per minute
pub struct FlowMeter {
    estimator: PulseRateEstimator,
    calibration: Calibration,
    input: Option<PulseInput>,
}

impl FlowMeter {
    /// Create a meter fed through [`Self::record_pulse`]
    pub fn new(calibration: Calibration) -> Self {
        Self {
            estimator: PulseRateEstimator::new(FLOW_WINDOW),
            calibration,
            input: None,
        }
    }

    /// Create a meter fed from the pulse queue of an edge callback
    pub fn with_input(calibration: Calibration, input: PulseInput) -> Self {
        Self {
            input: Some(input),
            ..Self::new(calibration)
        }
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Record a flow pulse directly
    pub fn record_pulse(&mut self, timestamp: Timestamp) {
        self.estimator.record_pulse(timestamp);
    }

    /// Current flow in l/min
    ///
    /// Zero while the pump has not produced a full window of pulses.
    pub fn current_flow(&mut self) -> u32 {
        if let Some(input) = self.input.as_mut() {
            input.drain_into(&mut self.estimator);
        }
        match self.estimator.estimate_frequency() {
            Some(f) => clamp_to_max(self.calibration.k * (f + self.calibration.q), MAX_FLOW_LPM, "flow"),
            None => 0,
        }
    }
}
