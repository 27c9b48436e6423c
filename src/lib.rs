//! Pumpwatch - pump-test stopwatch and measurement instrument
//!
//! This library re-exports the stopwatch, measurement engine and log from
//! `pumpwatch-core` and adds the console front-end used by the binary.

pub mod cli;
pub mod console;

pub use pumpwatch_core::{config, measure, orchestrator, record, signal, stopwatch, time};

pub use pumpwatch_core::{AppConfig, FlowMeter, MeasurementLog, MonotonicClock, Orchestrator, PressureTransducer, RpmMeter, Stopwatch, Timestamp};
pub use pumpwatch_core::{BUILD_DATE, MANUAL_HOLD_MS, TICK_INTERVAL_MS, VERSION};
