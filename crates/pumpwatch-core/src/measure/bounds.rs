//! Range policy for reported measurements
//!
//! A reading outside `[0, max]` is reported as `max`, including negative
//! readings. This mirrors the behavior of the deployed instrument.

/// Upper bound of flow readings (l/min)
pub const MAX_FLOW_LPM: u32 = 99_999;

/// Upper bound of engine speed readings (1/min)
pub const MAX_RPM: u32 = 99_999;

/// Upper bound of pressure readings (bar), full scale of the transducer
pub const MAX_PRESSURE_BAR: u32 = 100;

/// Round `value` to the nearest integer and clamp it into `[0, max]`
///
/// Anything outside the range, NaN included, becomes `max`.
pub fn clamp_to_max(value: f64, max: u32, quantity: &'static str) -> u32 {
    let rounded = value.round();
    if rounded >= 0.0 && rounded <= f64::from(max) {
        rounded as u32
    } else {
        tracing::debug!(quantity, value, max, "Measurement out of range, reporting maximum");
        max
    }
}
