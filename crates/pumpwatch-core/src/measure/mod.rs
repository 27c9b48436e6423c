//! Measurement engine
//!
//! This module turns raw sensor streams into bounded physical quantities:
//! - Fixed-capacity sample ring ([`ring`])
//! - Frequency estimation from pulse timestamps ([`pulse`])
//! - Water flow in l/min ([`flow`])
//! - Engine revolutions per minute ([`rpm`])
//! - Dual-channel pressure in bar ([`pressure`])
//! - Clamp policy shared by all meters ([`bounds`])

pub mod bounds;
pub mod flow;
pub mod pressure;
pub mod pulse;
pub mod ring;
pub mod rpm;

use serde::{Deserialize, Serialize};

/// Largest configurable smoothing or pressure window
pub const MAX_WINDOW: usize = 1000;

/// Linear calibration constants of one sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub k: f64,
    pub q: f64,
}

impl Calibration {
    pub fn new(k: f64, q: f64) -> Self {
        Self { k, q }
    }

    /// `k * raw + q`
    pub fn apply(&self, raw: f64) -> f64 {
        self.k * raw + self.q
    }
}
