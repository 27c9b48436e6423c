//! E2E tests for the assembled instrument
//!
//! Wires a config, a simulated ADC and the CSV log through
//! `Orchestrator::assemble`, drives the returned edge handlers like a GPIO
//! driver would, and checks what ends up in the measurement log.

use pumpwatch::orchestrator::OrchestratorError;
use pumpwatch::record::csv_log::HEADER;
use pumpwatch::signal::sim::SimulatedAnalog;
use pumpwatch::signal::{AnalogInput, Capability, EdgeHandler, Pin};
use pumpwatch::{AppConfig, MeasurementLog, MonotonicClock, Orchestrator, Timestamp};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn ms(v: u64) -> Timestamp {
    Timestamp::from_millis(v)
}

struct Bench {
    orchestrator: Orchestrator,
    edges: HashMap<Pin, EdgeHandler>,
}

impl Bench {
    fn new(config: &AppConfig, analog: Option<(f64, f64)>) -> Self {
        let (capability, adc): (Capability, Option<Box<dyn AnalogInput>>) = match analog {
            Some((v1, v2)) => {
                let adc: Box<dyn AnalogInput> = Box::new(SimulatedAnalog::new(v1, v2));
                (Capability::Available, Some(adc))
            }
            None => (Capability::Unavailable, None),
        };
        let (mut orchestrator, edges) = Orchestrator::assemble(config, capability, adc);
        orchestrator.add_sink(Box::new(MeasurementLog::new(config.logging.location.clone())));
        Self {
            orchestrator,
            edges: edges.into_iter().map(|e| (e.pin(), e)).collect(),
        }
    }

    fn edge(&mut self, pin: Pin, at: Timestamp) {
        let handler = self.edges.get_mut(&pin).unwrap();
        assert_eq!(handler.on_edge(at), Ok(true), "edge on {:?} not delivered", pin);
    }

    /// Steady pulse train on `pin` covering `[from, from + count * period)`
    fn pulses(&mut self, pin: Pin, from: u64, period: u64, count: u64) {
        for i in 0..count {
            self.edge(pin, ms(from + i * period));
        }
    }
}

fn rows(path: &Path) -> Vec<Vec<String>> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .skip(1)
        .map(|l| l.split(',').map(str::to_string).collect())
        .collect()
}

fn config_in(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.logging.location = dir.join("stopwatch_log.csv");
    config
}

#[test]
fn test_full_drill_logs_every_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let mut bench = Bench::new(&config, None);

    // Flow at 10 Hz, engine at 50 Hz
    bench.pulses(Pin::FlowPulse, 0, 100, 5);
    bench.pulses(Pin::RpmPulse, 0, 20, 10);

    bench.edge(Pin::Start, ms(1000));
    bench.edge(Pin::FirstSplit, ms(2000));
    bench.edge(Pin::StopA, ms(2500));
    bench.edge(Pin::StopB, ms(2600));
    assert_eq!(bench.orchestrator.tick(ms(2640)), Ok(6));

    let rows = rows(&config.logging.location);
    assert_eq!(rows.len(), 4);
    let summary: Vec<(&str, &str, &str)> = rows
        .iter()
        .map(|r| (r[1].as_str(), r[2].as_str(), r[7].as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("4", "00:00.000", "A"),
            ("3", "00:01.000", "A"),
            ("1", "00:01.500", "A"),
            ("2", "00:01.600", "A"),
        ]
    );
    // 8.34 * (10 + 0.229)
    assert!(rows.iter().all(|r| r[3] == "85"));
    // Pressure reads zero without an analog subsystem
    assert!(rows.iter().all(|r| r[5] == "0" && r[6] == "0"));
}

#[test]
fn test_header_matches_layout() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let mut bench = Bench::new(&config, None);
    bench.edge(Pin::ManualMeasure, ms(10));
    bench.orchestrator.tick(ms(20)).unwrap();

    let contents = std::fs::read_to_string(&config.logging.location).unwrap();
    let header = contents.lines().next().unwrap();
    assert!(header.starts_with(HEADER[0]));
    assert!(header.ends_with("\"Flag for auto/manual measurement {A, M}\""));

    let rows = rows(&config.logging.location);
    assert_eq!(rows[0][1], "");
    assert_eq!(rows[0][7], "M");
}

#[test]
fn test_pressure_in_log_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.pressure.samples = 5;
    let mut bench = Bench::new(&config, Some((0.4, 0.35)));

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while bench.orchestrator.pressure().cycles() < 2 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }

    bench.edge(Pin::Start, ms(0));
    bench.orchestrator.tick(ms(40)).unwrap();
    let rows = rows(&config.logging.location);
    assert_eq!(rows[0][5], "8");
    assert_eq!(rows[0][6], "7");
}

#[test]
fn test_unwritable_log_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.logging.location = dir.path().join("no-such-dir").join("log.csv");
    let mut bench = Bench::new(&config, None);

    bench.edge(Pin::Start, ms(0));
    bench.edge(Pin::FirstSplit, ms(300));
    assert_eq!(bench.orchestrator.tick(ms(320)), Ok(3));
    assert!(bench.orchestrator.stopwatch().is_running());
    assert!(!config.logging.location.exists());
}

#[test]
fn test_bounce_on_start_button_is_debounced() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let mut bench = Bench::new(&config, None);

    bench.edge(Pin::Start, ms(100));
    let handler = bench.edges.get_mut(&Pin::Start).unwrap();
    assert_eq!(handler.on_edge(ms(104)), Ok(false));
    assert_eq!(bench.orchestrator.tick(ms(140)), Ok(2));
}

#[test]
fn test_run_stops_on_flag_and_on_lost_source() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let clock = MonotonicClock::new();

    let mut bench = Bench::new(&config, None);
    let running = AtomicBool::new(false);
    assert_eq!(bench.orchestrator.run(&clock, &running, Duration::from_millis(1)), Ok(()));

    let Bench { mut orchestrator, edges } = Bench::new(&config, None);
    drop(edges);
    let running = Arc::new(AtomicBool::new(true));
    assert_eq!(
        orchestrator.run(&clock, &running, Duration::from_millis(1)),
        Err(OrchestratorError::SignalSourceLost)
    );
    assert!(running.load(Ordering::SeqCst));
}
