//! Console display
//!
//! Text stand-in for the instrument's screen: four checkpoint rows (start on
//! top, second stop sensor at the bottom), a manual measurement row, and a
//! live status line rewritten in place.

use pumpwatch_core::record::{LiveReading, LogError, MeasurementSink, MeasurementSnapshot, Report};
use pumpwatch_core::stopwatch::Checkpoint;
use std::io::Write;

const ROWS: usize = 4;

/// Measurement display writing to a terminal
pub struct ConsoleDisplay<W: Write + Send> {
    out: W,
    rows: [Option<MeasurementSnapshot>; ROWS],
    manual: Option<MeasurementSnapshot>,
    last_status: String,
}

impl ConsoleDisplay<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            rows: Default::default(),
            manual: None,
            last_status: String::new(),
        }
    }

    /// Snapshot shown on `row` (0 = start)
    pub fn row(&self, row: usize) -> Option<&MeasurementSnapshot> {
        self.rows.get(row).and_then(|r| r.as_ref())
    }

    /// Manual measurement on hold, if any
    pub fn manual(&self) -> Option<&MeasurementSnapshot> {
        self.manual.as_ref()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) -> Result<(), LogError> {
        let result = if self.last_status.is_empty() {
            writeln!(self.out, "{}", text)
        } else {
            // Leave the status line intact above the report
            self.last_status.clear();
            writeln!(self.out, "\n{}", text)
        };
        result.and_then(|_| self.out.flush()).map_err(|source| LogError::Io {
            path: "<console>".into(),
            source,
        })
    }
}

fn describe(snapshot: &MeasurementSnapshot) -> String {
    format!(
        "{:>10} | {:>5} l/min | {:>5} 1/min | {}/{} bar",
        snapshot.split_time, snapshot.flow, snapshot.rpm, snapshot.pressure.0, snapshot.pressure.1
    )
}

fn label(checkpoint: Checkpoint) -> &'static str {
    match checkpoint {
        Checkpoint::Start => "START",
        Checkpoint::FirstSplit => "SPLIT",
        Checkpoint::StopA => "STOP A",
        Checkpoint::StopB => "STOP B",
    }
}

impl<W: Write + Send> MeasurementSink for ConsoleDisplay<W> {
    fn record(&mut self, report: &Report) -> Result<(), LogError> {
        match report {
            Report::Started => self.line("Stopwatch started"),
            Report::Stopped => self.line("Stopwatch stopped"),
            Report::Reset => {
                self.rows = Default::default();
                self.manual = None;
                self.line("Stopwatch reset")
            }
            Report::Checkpoint { checkpoint, snapshot } => {
                let text = format!("[{}] {:<6} {}", checkpoint.code(), label(*checkpoint), describe(snapshot));
                self.rows[checkpoint.display_row()] = Some(snapshot.clone());
                self.line(&text)
            }
            Report::ManualMeasurement { snapshot } => {
                let text = format!("[M] MANUAL {}", describe(snapshot));
                self.manual = Some(snapshot.clone());
                self.line(&text)
            }
            Report::ManualMeasureEnded => {
                self.manual = None;
                Ok(())
            }
        }
    }

    fn refresh(&mut self, reading: &LiveReading) {
        let status = format!(
            "{}  {:>5} l/min  {:>5} 1/min  {}/{} bar{}",
            reading.stopwatch,
            reading.flow,
            reading.rpm,
            reading.pressure.0,
            reading.pressure.1,
            if reading.manual_hold { "  [M]" } else { "" }
        );
        // Only rewrite if changed
        if status != self.last_status {
            let _ = write!(self.out, "\r{}", status).and_then(|_| self.out.flush());
            self.last_status = status;
        }
    }
}
