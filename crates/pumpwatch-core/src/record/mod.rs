//! Measurement reports and their sinks
//!
//! The orchestrator turns stopwatch events into [`Report`]s carrying a
//! [`MeasurementSnapshot`] and hands them to every registered
//! [`MeasurementSink`]. The CSV log ([`csv_log`]) is one such sink, the
//! console display of the binary another.

pub mod csv_log;

use crate::stopwatch::Checkpoint;
use thiserror::Error;

/// Meter readings captured together with a stopwatch reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementSnapshot {
    /// Elapsed time `MM:SS.mmm`
    pub split_time: String,
    /// l/min
    pub flow: u32,
    /// 1/min
    pub rpm: u32,
    /// bar, channel 1 and 2
    pub pressure: (u32, u32),
}

/// What a sink is told about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Started,
    Stopped,
    Reset,
    /// Automatic measurement at a checkpoint
    Checkpoint {
        checkpoint: Checkpoint,
        snapshot: MeasurementSnapshot,
    },
    /// Operator-requested measurement
    ManualMeasurement { snapshot: MeasurementSnapshot },
    /// The manual measurement hold ran out
    ManualMeasureEnded,
}

/// Live values refreshed every tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveReading {
    pub stopwatch: String,
    pub flow: u32,
    pub rpm: u32,
    pub pressure: (u32, u32),
    /// A manual measurement is on hold; displays keep it instead of live values
    pub manual_hold: bool,
}

/// Errors raised by measurement sinks
#[derive(Error, Debug)]
pub enum LogError {
    #[error("cannot write measurement log {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Consumer of measurement reports
pub trait MeasurementSink: Send {
    /// Record one report
    fn record(&mut self, report: &Report) -> Result<(), LogError>;

    /// Live update, once per tick
    fn refresh(&mut self, _reading: &LiveReading) {}
}
