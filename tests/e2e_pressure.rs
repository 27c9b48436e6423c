//! E2E tests for the pressure transducer pair
//!
//! Covers capability-driven degraded mode, sliding averages from a
//! simulated ADC, and the background sampler lifecycle.

use pumpwatch::measure::pressure::DEFAULT_PRESSURE_SAMPLES;
use pumpwatch::measure::Calibration;
use pumpwatch::signal::sim::SimulatedAnalog;
use pumpwatch::signal::source::detect_capability;
use pumpwatch::signal::{AnalogInput, Capability};
use pumpwatch::PressureTransducer;
use std::time::{Duration, Instant};

fn adc(v1: f64, v2: f64) -> Option<Box<dyn AnalogInput>> {
    Some(Box::new(SimulatedAnalog::new(v1, v2)))
}

#[test]
fn test_missing_bus_means_degraded_mode() {
    let dir = tempfile::tempdir().unwrap();
    let capability = detect_capability(&dir.path().join("i2c-1"));
    assert_eq!(capability, Capability::Unavailable);

    let p = PressureTransducer::new(Calibration::new(20.0, 0.0), 25, capability, adc(3.0, 3.0));
    assert!(!p.is_initialized());
    for _ in 0..5 {
        assert!(!p.refresh());
    }
    assert_eq!(p.sliding_average_pressure(), (0, 0));
    assert_eq!(p.instantaneous_pressure(), (0, 0));
}

#[test]
fn test_present_device_is_available() {
    let file = tempfile::NamedTempFile::new().unwrap();
    assert_eq!(detect_capability(file.path()), Capability::Available);
}

#[test]
fn test_average_and_instantaneous_share_calibration() {
    let p = PressureTransducer::new(Calibration::new(20.0, 1.0), 10, Capability::Available, adc(2.5, 0.5));
    for _ in 0..10 {
        assert!(p.refresh());
    }
    // 20 * 2.5 + 1 = 51, 20 * 0.5 + 1 = 11
    assert_eq!(p.sliding_average_pressure(), (51, 11));
    assert_eq!(p.instantaneous_pressure(), (51, 11));
}

#[test]
fn test_partial_window_averages_samples_held() {
    let p = PressureTransducer::new(Calibration::new(20.0, 0.0), DEFAULT_PRESSURE_SAMPLES, Capability::Available, adc(1.0, 2.0));
    assert_eq!(p.sliding_average_pressure(), (0, 0));
    p.refresh();
    assert_eq!(p.sliding_average_pressure(), (20, 40));
}

#[test]
fn test_overrange_reports_full_scale() {
    let p = PressureTransducer::new(Calibration::new(20.0, 0.0), 5, Capability::Available, adc(7.0, 5.0));
    p.refresh();
    assert_eq!(p.sliding_average_pressure(), (100, 100));
}

#[test]
fn test_sampler_runs_until_dropped() {
    let mut p = PressureTransducer::new(Calibration::new(20.0, 0.0), 50, Capability::Available, adc(0.4, 0.35));
    assert_eq!(p.sample_interval(), Duration::from_millis(20));
    p.start_sampler();
    // Second start is a no-op
    p.start_sampler();

    let deadline = Instant::now() + Duration::from_secs(2);
    while p.cycles() < 5 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(p.cycles() >= 5);
    assert_eq!(p.sliding_average_pressure(), (8, 7));
    drop(p);
}

#[test]
fn test_sampler_not_started_in_degraded_mode() {
    let mut p = PressureTransducer::disabled(Calibration::new(20.0, 0.0));
    p.start_sampler();
    assert!(!p.is_sampling());
    assert_eq!(p.cycles(), 0);
}
