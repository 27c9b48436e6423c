//! Checkpoint measurement log (CSV)
//!
//! One row per checkpoint or manual measurement, appended as it happens. The
//! header is written only when the file does not exist yet, so a log grows
//! across sessions.

use super::{LogError, MeasurementSink, MeasurementSnapshot, Report};
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Column titles of the log
pub const HEADER: [&str; 8] = [
    "Measurement date and time",
    "Checkpoint",
    "Time",
    "Flow (l/min)",
    "Engine revs (1/min)",
    "Pressure #1 (bar)",
    "Pressure #2 (bar)",
    "Flag for auto/manual measurement {A, M}",
];

/// How a row was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureMode {
    /// Checkpoint sensor
    Automatic,
    /// Operator button
    Manual,
}

impl MeasureMode {
    pub fn flag(&self) -> &'static str {
        match self {
            MeasureMode::Automatic => "A",
            MeasureMode::Manual => "M",
        }
    }
}

/// Appending CSV log of measurements
#[derive(Debug, Clone)]
pub struct MeasurementLog {
    path: PathBuf,
}

impl MeasurementLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a row stamped with the current local time
    ///
    /// `checkpoint` is the checkpoint code, empty for manual measurements.
    pub fn append(&self, checkpoint: &str, snapshot: &MeasurementSnapshot, mode: MeasureMode) -> Result<(), LogError> {
        self.append_at(Local::now(), checkpoint, snapshot, mode)
    }

    /// Append a row with an explicit timestamp
    pub fn append_at(
        &self,
        at: DateTime<Local>,
        checkpoint: &str,
        snapshot: &MeasurementSnapshot,
        mode: MeasureMode,
    ) -> Result<(), LogError> {
        let write_header = !self.path.exists();
        let io_err = |source: std::io::Error| LogError::Io {
            path: self.path.display().to_string(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        let mut writer = BufWriter::new(file);

        if write_header {
            write_record(&mut writer, HEADER.iter().copied()).map_err(io_err)?;
        }

        let timestamp = at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
        let flow = snapshot.flow.to_string();
        let rpm = snapshot.rpm.to_string();
        let p1 = snapshot.pressure.0.to_string();
        let p2 = snapshot.pressure.1.to_string();
        let row = [
            timestamp.as_str(),
            checkpoint,
            snapshot.split_time.as_str(),
            flow.as_str(),
            rpm.as_str(),
            p1.as_str(),
            p2.as_str(),
            mode.flag(),
        ];
        write_record(&mut writer, row.iter().copied()).map_err(io_err)?;
        writer.flush().map_err(io_err)?;

        tracing::debug!(path = %self.path.display(), checkpoint, mode = mode.flag(), "Measurement logged");
        Ok(())
    }
}

impl MeasurementSink for MeasurementLog {
    fn record(&mut self, report: &Report) -> Result<(), LogError> {
        match report {
            Report::Checkpoint { checkpoint, snapshot } => {
                self.append(&checkpoint.code().to_string(), snapshot, MeasureMode::Automatic)
            }
            Report::ManualMeasurement { snapshot } => self.append("", snapshot, MeasureMode::Manual),
            Report::Started | Report::Stopped | Report::Reset | Report::ManualMeasureEnded => Ok(()),
        }
    }
}

/// Write one CSV record terminated by CRLF
fn write_record<'a, W: Write>(out: &mut W, fields: impl Iterator<Item = &'a str>) -> std::io::Result<()> {
    let mut first = true;
    for field in fields {
        if !first {
            out.write_all(b",")?;
        }
        first = false;
        out.write_all(quote(field).as_bytes())?;
    }
    out.write_all(b"\r\n")
}

/// Quote a field if it contains a separator, quote or line break
fn quote(field: &str) -> std::borrow::Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\"")).into()
    } else {
        field.into()
    }
}
