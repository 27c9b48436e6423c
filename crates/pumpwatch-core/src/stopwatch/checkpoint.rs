//! Checkpoints and stopwatch events

/// Timing checkpoint of a drill
///
/// The numeric codes are the ones printed on the instrument and written to
/// the log. Rows on the display run in reverse code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Checkpoint {
    /// First stop sensor
    StopA = 1,
    /// Second stop sensor
    StopB = 2,
    /// First split gate
    FirstSplit = 3,
    /// Start button, the zero reference
    Start = 4,
}

impl Checkpoint {
    /// Checkpoint code 1..=4
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Look up a checkpoint by code
    pub fn from_code(code: i64) -> Option<Checkpoint> {
        match code {
            1 => Some(Checkpoint::StopA),
            2 => Some(Checkpoint::StopB),
            3 => Some(Checkpoint::FirstSplit),
            4 => Some(Checkpoint::Start),
            _ => None,
        }
    }

    /// Display row of this checkpoint: 4 → 0, 3 → 1, 2 → 2, 1 → 3
    pub fn display_row(&self) -> usize {
        4 - self.code() as usize
    }
}

/// Display row for a raw checkpoint code; unknown codes have no row
pub fn display_row(code: i64) -> Option<usize> {
    Checkpoint::from_code(code).map(|c| c.display_row())
}

/// Notification emitted by the stopwatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopwatchEvent {
    Started,
    Stopped,
    Reset,
    /// A checkpoint was recorded; `elapsed` is formatted `MM:SS.mmm`
    SplitTimeMeasured {
        checkpoint: Checkpoint,
        elapsed: String,
    },
    ManualMeasureStarted {
        elapsed: String,
    },
    /// The display hold of a manual measurement ran out
    ManualMeasureEnded,
}
