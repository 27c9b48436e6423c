//! Pumpwatch Core - stopwatch state machine, measurement engine, and checkpoint log
//!
//! This library provides the engine of a firefighter pump-test instrument.
//! It times a drill from discrete trigger events (start, split, two stop
//! sensors, manual measurement, reset) and derives engine RPM, water flow and
//! dual-channel pressure from pulse and analog sensor streams.

pub mod config;
pub mod measure;
pub mod orchestrator;
pub mod record;
pub mod signal;
pub mod stopwatch;
pub mod time;

pub use config::AppConfig;
pub use measure::{flow::FlowMeter, pressure::PressureTransducer, rpm::RpmMeter};
pub use orchestrator::Orchestrator;
pub use record::csv_log::MeasurementLog;
pub use stopwatch::machine::Stopwatch;
pub use time::{MonotonicClock, Timestamp};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date stamped by build.rs
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Consumer loop tick (display refresh cadence of the instrument)
pub const TICK_INTERVAL_MS: u64 = 40;

/// How long a manual measurement stays on display before it is released
pub const MANUAL_HOLD_MS: u64 = 2000;
