//! Checkpoint state machine
//!
//! A drill runs START → FIRST_SPLIT → {STOP_A, STOP_B} in any order of the two
//! stop sensors. The clock stops when the second stop sensor fires. Triggers
//! arriving out of order are ignored with a warning; RESET is accepted in any
//! state.
//!
//! ```text
//!          START            2nd stop sensor
//!   Idle ────────► Running ────────────────► Stopped
//!    ▲                │                         │
//!    └──── RESET ─────┴──────── RESET ──────────┘
//! ```

use super::checkpoint::{Checkpoint, StopwatchEvent};
use super::timer::{TimerId, TimerQueue};
use crate::signal::source::Trigger;
use crate::time::{format_duration, format_time, Timestamp};
use std::time::Duration;

/// Observable stopwatch state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopwatchState {
    /// Cleared, waiting for START
    Idle,
    /// Clock running
    Running,
    /// Both stop sensors fired; clock frozen at the last checkpoint
    Stopped,
}

/// Drill stopwatch
///
/// All methods take the timestamp of the edge that caused them, so elapsed
/// times do not depend on how late the consumer loop processed the event.
///
/// # Example
/// ```
/// use pumpwatch_core::stopwatch::{Stopwatch, StopwatchState};
/// use pumpwatch_core::signal::Trigger;
/// use pumpwatch_core::time::Timestamp;
///
/// let mut sw = Stopwatch::new();
/// sw.handle(Trigger::Start, Timestamp::from_millis(0));
/// sw.handle(Trigger::FirstSplit, Timestamp::from_millis(1000));
/// sw.handle(Trigger::StopA, Timestamp::from_millis(1500));
/// sw.handle(Trigger::StopB, Timestamp::from_millis(1600));
/// assert_eq!(sw.state(), StopwatchState::Stopped);
/// assert_eq!(sw.current_time(Timestamp::from_millis(9000)), "00:01.600");
/// ```
#[derive(Debug)]
pub struct Stopwatch {
    /// Recorded checkpoint times, index 0 is the start
    times: Vec<Timestamp>,
    cleared: bool,
    running: bool,
    /// Set by the first stop sensor; the second one stops the clock
    should_stop_clock: bool,
    first_split_measured: bool,
    checkpoint_1_measured: bool,
    checkpoint_2_measured: bool,
    timers: TimerQueue<StopwatchEvent>,
    manual_hold: Option<TimerId>,
    hold_duration: Duration,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::with_hold_duration(Duration::from_millis(crate::MANUAL_HOLD_MS))
    }

    /// Stopwatch whose manual measurements stay on display for `hold`
    pub fn with_hold_duration(hold: Duration) -> Self {
        Self {
            times: Vec::with_capacity(4),
            cleared: true,
            running: false,
            should_stop_clock: false,
            first_split_measured: false,
            checkpoint_1_measured: false,
            checkpoint_2_measured: false,
            timers: TimerQueue::new(),
            manual_hold: None,
            hold_duration: hold,
        }
    }

    pub fn state(&self) -> StopwatchState {
        if self.running {
            StopwatchState::Running
        } else if self.cleared {
            StopwatchState::Idle
        } else {
            StopwatchState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Recorded checkpoint times, start first
    pub fn checkpoint_times(&self) -> &[Timestamp] {
        &self.times
    }

    /// Whether `checkpoint` was recorded in the current run
    pub fn is_recorded(&self, checkpoint: Checkpoint) -> bool {
        match checkpoint {
            Checkpoint::Start => !self.cleared,
            Checkpoint::FirstSplit => self.first_split_measured,
            Checkpoint::StopA => self.checkpoint_1_measured,
            Checkpoint::StopB => self.checkpoint_2_measured,
        }
    }

    /// Whether a manual measurement is being held on display
    pub fn manual_hold_pending(&self) -> bool {
        self.manual_hold.is_some()
    }

    /// Dispatch a trigger
    pub fn handle(&mut self, trigger: Trigger, at: Timestamp) -> Vec<StopwatchEvent> {
        match trigger {
            Trigger::Start => self.start(at),
            Trigger::FirstSplit => self.first_split(at),
            Trigger::StopA => self.stop(Checkpoint::StopA, at),
            Trigger::StopB => self.stop(Checkpoint::StopB, at),
            Trigger::ManualMeasure => self.manual_measure(at),
            Trigger::Reset => self.reset(),
        }
    }

    /// Start the clock; only from a cleared, stopped watch
    pub fn start(&mut self, at: Timestamp) -> Vec<StopwatchEvent> {
        if !self.cleared || self.running {
            tracing::warn!(state = ?self.state(), "Start ignored, stopwatch not cleared");
            return Vec::new();
        }
        let mut events = vec![self.record(Checkpoint::Start, at)];
        self.cleared = false;
        self.running = true;
        events.push(StopwatchEvent::Started);
        tracing::info!("Stopwatch started");
        events
    }

    /// Record the first split; only while running, at most once per run
    pub fn first_split(&mut self, at: Timestamp) -> Vec<StopwatchEvent> {
        if !self.running {
            tracing::warn!(state = ?self.state(), "First split ignored, stopwatch not running");
            return Vec::new();
        }
        if self.first_split_measured {
            tracing::warn!(checkpoint = 3, "Repeated measure on checkpoint");
            return Vec::new();
        }
        self.first_split_measured = true;
        vec![self.record(Checkpoint::FirstSplit, at)]
    }

    /// Record a stop sensor; only after the first split, at most once per sensor
    ///
    /// The second distinct stop sensor stops the clock.
    pub fn stop(&mut self, sensor: Checkpoint, at: Timestamp) -> Vec<StopwatchEvent> {
        if !(self.running && self.first_split_measured) {
            tracing::warn!(checkpoint = sensor.code(), state = ?self.state(), "Stop ignored, first split not measured");
            return Vec::new();
        }
        let measured = match sensor {
            Checkpoint::StopA => &mut self.checkpoint_1_measured,
            Checkpoint::StopB => &mut self.checkpoint_2_measured,
            Checkpoint::Start | Checkpoint::FirstSplit => {
                tracing::warn!(checkpoint = sensor.code(), "Not a stop sensor");
                return Vec::new();
            }
        };
        if *measured {
            tracing::warn!(checkpoint = sensor.code(), "Repeated measure on checkpoint");
            return Vec::new();
        }
        *measured = true;

        let mut events = vec![self.record(sensor, at)];
        if self.should_stop_clock {
            self.running = false;
            events.push(StopwatchEvent::Stopped);
            tracing::info!("Stopwatch stopped");
        } else {
            self.should_stop_clock = true;
        }
        events
    }

    /// Capture a manual measurement; accepted in any state
    ///
    /// A `ManualMeasureEnded` is released by [`Self::poll_timers`] once the
    /// hold expires. A new manual measurement restarts the hold.
    pub fn manual_measure(&mut self, at: Timestamp) -> Vec<StopwatchEvent> {
        if let Some(previous) = self.manual_hold.take() {
            self.timers.cancel(previous);
        }
        let id = self
            .timers
            .schedule_after(at, self.hold_duration, StopwatchEvent::ManualMeasureEnded);
        self.manual_hold = Some(id);
        vec![StopwatchEvent::ManualMeasureStarted {
            elapsed: self.current_time(at),
        }]
    }

    /// Clear the run and cancel pending manual holds; accepted in any state
    pub fn reset(&mut self) -> Vec<StopwatchEvent> {
        self.cleared = true;
        self.running = false;
        self.should_stop_clock = false;
        self.first_split_measured = false;
        self.checkpoint_1_measured = false;
        self.checkpoint_2_measured = false;
        self.times.clear();
        let cancelled = self.timers.cancel_all();
        self.manual_hold = None;
        tracing::info!(cancelled_holds = cancelled, "Stopwatch reset");
        vec![StopwatchEvent::Reset]
    }

    /// Release deferred events that are due at `now`
    pub fn poll_timers(&mut self, now: Timestamp) -> Vec<StopwatchEvent> {
        let due = self.timers.poll(now);
        if due.contains(&StopwatchEvent::ManualMeasureEnded) {
            self.manual_hold = None;
        }
        due
    }

    /// Stopwatch reading as `MM:SS.mmm`
    ///
    /// Zero before the first start, time since start while running, and the
    /// last recorded checkpoint once stopped.
    pub fn current_time(&self, now: Timestamp) -> String {
        match self.times.first() {
            Some(&start) if self.running => format_duration(now.saturating_duration_since(start)),
            Some(&start) if self.times.len() > 1 => {
                let last = self.times[self.times.len() - 1];
                format_duration(last.saturating_duration_since(start))
            }
            _ => format_time(0.0),
        }
    }

    fn record(&mut self, checkpoint: Checkpoint, at: Timestamp) -> StopwatchEvent {
        self.times.push(at);
        let start = self.times[0];
        let elapsed = format_duration(at.saturating_duration_since(start));
        tracing::info!(checkpoint = checkpoint.code(), %elapsed, "Split time measured");
        StopwatchEvent::SplitTimeMeasured { checkpoint, elapsed }
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}
