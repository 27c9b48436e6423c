//! Consumer loop
//!
//! The orchestrator is the single consumer context. It owns the stopwatch and
//! the meters, drains the trigger queue every tick in arrival order, releases
//! due deferred events, and forwards everything to the measurement sinks.
//!
//! ```text
//!   edge callbacks ──► trigger queue ──┐
//!   pulse callbacks ─► pulse queues ───┼──► Orchestrator::tick ──► sinks
//!   pressure sampler ─► windows ───────┘
//! ```

use crate::config::AppConfig;
use crate::measure::flow::FlowMeter;
use crate::measure::pressure::PressureTransducer;
use crate::measure::pulse::{pulse_channel, PULSE_QUEUE_SIZE};
use crate::measure::rpm::RpmMeter;
use crate::record::{LiveReading, MeasurementSink, MeasurementSnapshot, Report};
use crate::signal::dispatch::{trigger_queue, wire_edges, EdgeHandler, TriggerReceiver, TRIGGER_QUEUE_SIZE};
use crate::signal::source::{AnalogInput, Capability};
use crate::stopwatch::{Stopwatch, StopwatchEvent};
use crate::time::{Clock, Timestamp};
use crossbeam_channel::TryRecvError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Errors that end the consumer loop
#[derive(Error, Debug, PartialEq, Eq)]
pub enum OrchestratorError {
    /// Every edge handler is gone; no trigger can arrive any more
    #[error("signal source lost: trigger queue disconnected")]
    SignalSourceLost,
}

/// Single-threaded owner of the stopwatch, the meters and the sinks
pub struct Orchestrator {
    stopwatch: Stopwatch,
    flow: FlowMeter,
    rpm: RpmMeter,
    pressure: PressureTransducer,
    triggers: TriggerReceiver,
    sinks: Vec<Box<dyn MeasurementSink>>,
    /// Meter values shown while no manual measurement is on hold
    live: LiveReading,
}

impl Orchestrator {
    pub fn new(
        stopwatch: Stopwatch,
        flow: FlowMeter,
        rpm: RpmMeter,
        pressure: PressureTransducer,
        triggers: TriggerReceiver,
    ) -> Self {
        Self {
            stopwatch,
            flow,
            rpm,
            pressure,
            triggers,
            sinks: Vec::new(),
            live: LiveReading {
                stopwatch: crate::time::format_time(0.0),
                flow: 0,
                rpm: 0,
                pressure: (0, 0),
                manual_hold: false,
            },
        }
    }

    /// Build an orchestrator from a config and return it with the edge
    /// handlers the signal source must drive
    ///
    /// The pressure sampler is started when the analog subsystem is available.
    pub fn assemble(
        config: &AppConfig,
        analog: Capability,
        adc: Option<Box<dyn AnalogInput>>,
    ) -> (Self, Vec<EdgeHandler>) {
        let (trigger_tx, trigger_rx) = trigger_queue(TRIGGER_QUEUE_SIZE);
        let (flow_tx, flow_rx) = pulse_channel(PULSE_QUEUE_SIZE);
        let (rpm_tx, rpm_rx) = pulse_channel(PULSE_QUEUE_SIZE);
        let edges = wire_edges(&trigger_tx, flow_tx, rpm_tx);

        let flow = FlowMeter::with_input(config.flow_calibration(), flow_rx);
        let rpm = RpmMeter::with_input(config.revs.k, config.revs.smoothing, config.revs.window, rpm_rx);
        let mut pressure = PressureTransducer::new(config.pressure_calibration(), config.pressure.samples, analog, adc);
        pressure.start_sampler();

        tracing::info!(
            flow_k = config.flow.k,
            flow_q = config.flow.q,
            pulses_per_rev = config.revs.k,
            smoothing = ?config.revs.smoothing,
            pressure_initialized = pressure.is_initialized(),
            "Orchestrator assembled"
        );

        (Self::new(Stopwatch::new(), flow, rpm, pressure, trigger_rx), edges)
    }

    /// Register a sink; sinks are called in registration order
    pub fn add_sink(&mut self, sink: Box<dyn MeasurementSink>) {
        self.sinks.push(sink);
    }

    pub fn stopwatch(&self) -> &Stopwatch {
        &self.stopwatch
    }

    pub fn pressure(&self) -> &PressureTransducer {
        &self.pressure
    }

    /// Most recent live reading
    pub fn live(&self) -> &LiveReading {
        &self.live
    }

    /// Run one consumer cycle at `now`
    ///
    /// Returns the number of stopwatch events processed. Fails only when the
    /// trigger queue is disconnected, after the triggers still queued were
    /// processed.
    pub fn tick(&mut self, now: Timestamp) -> Result<usize, OrchestratorError> {
        let mut processed = 0;
        let mut lost = false;

        loop {
            match self.triggers.try_recv() {
                Ok(event) => {
                    tracing::debug!(trigger = ?event.trigger, at_ms = event.timestamp.as_duration().as_millis() as u64, "Trigger received");
                    for ev in self.stopwatch.handle(event.trigger, event.timestamp) {
                        self.dispatch(ev);
                        processed += 1;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    lost = true;
                    break;
                }
            }
        }

        for ev in self.stopwatch.poll_timers(now) {
            self.dispatch(ev);
            processed += 1;
        }

        self.refresh_live(now);

        if lost {
            tracing::error!("Trigger queue disconnected, signal source lost");
            return Err(OrchestratorError::SignalSourceLost);
        }
        Ok(processed)
    }

    /// Tick every `interval` until `running` is cleared or the source is lost
    pub fn run(&mut self, clock: &dyn Clock, running: &AtomicBool, interval: Duration) -> Result<(), OrchestratorError> {
        tracing::info!(interval_ms = interval.as_millis() as u64, "Consumer loop started");
        while running.load(Ordering::SeqCst) {
            self.tick(clock.now())?;
            std::thread::sleep(interval);
        }
        tracing::info!("Consumer loop stopped");
        Ok(())
    }

    fn snapshot(&mut self, split_time: String) -> MeasurementSnapshot {
        MeasurementSnapshot {
            split_time,
            flow: self.flow.current_flow(),
            rpm: self.rpm.current_rpm(),
            pressure: self.pressure.sliding_average_pressure(),
        }
    }

    fn dispatch(&mut self, event: StopwatchEvent) {
        let report = match event {
            StopwatchEvent::Started => Report::Started,
            StopwatchEvent::Stopped => Report::Stopped,
            StopwatchEvent::Reset => Report::Reset,
            StopwatchEvent::SplitTimeMeasured { checkpoint, elapsed } => {
                tracing::info!(checkpoint = checkpoint.code(), "Split time measured on checkpoint");
                Report::Checkpoint {
                    checkpoint,
                    snapshot: self.snapshot(elapsed),
                }
            }
            StopwatchEvent::ManualMeasureStarted { elapsed } => Report::ManualMeasurement {
                snapshot: self.snapshot(elapsed),
            },
            StopwatchEvent::ManualMeasureEnded => Report::ManualMeasureEnded,
        };

        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.record(&report) {
                tracing::error!(error = %e, "Failed to record measurement");
            }
        }
    }

    fn refresh_live(&mut self, now: Timestamp) {
        self.live.stopwatch = self.stopwatch.current_time(now);
        self.live.manual_hold = self.stopwatch.manual_hold_pending();
        // Meter values freeze while a manual measurement is on display
        if !self.live.manual_hold {
            self.live.flow = self.flow.current_flow();
            self.live.rpm = self.rpm.current_rpm();
            self.live.pressure = self.pressure.sliding_average_pressure();
        }
        for sink in self.sinks.iter_mut() {
            sink.refresh(&self.live);
        }
    }
}
