//! Simulated signal producers
//!
//! Stand-ins for the GPIO and ADC drivers on hosts without the instrument
//! hardware: a pulse train thread per pulse pin and a synthetic ADC.

use super::dispatch::EdgeHandler;
use super::source::{AnalogChannel, AnalogInput, SignalError};
use crate::time::Clock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Synthetic ADC returning a base voltage per channel with a slow ripple
#[derive(Debug, Clone)]
pub struct SimulatedAnalog {
    base: (f64, f64),
    ripple: f64,
    reads: u64,
}

impl SimulatedAnalog {
    /// Constant voltages on both channels
    pub fn new(channel_1: f64, channel_2: f64) -> Self {
        Self {
            base: (channel_1, channel_2),
            ripple: 0.0,
            reads: 0,
        }
    }

    /// Add a sinusoidal ripple of `amplitude` volts
    pub fn with_ripple(mut self, amplitude: f64) -> Self {
        self.ripple = amplitude;
        self
    }
}

impl AnalogInput for SimulatedAnalog {
    fn read_voltage(&mut self, channel: AnalogChannel) -> Result<f64, SignalError> {
        self.reads += 1;
        let wobble = self.ripple * (self.reads as f64 * 0.1).sin();
        let base = match channel {
            AnalogChannel::P0 => self.base.0,
            AnalogChannel::P1 => self.base.1,
        };
        Ok(base + wobble)
    }
}

/// Handle of a running pulse train; stops the thread on drop
pub struct PulseTrainHandle {
    stop_flag: Arc<AtomicBool>,
    pulses: Arc<AtomicU64>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl PulseTrainHandle {
    /// Stop the pulse thread and wait for it to finish
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(h) = self.thread.take() {
            let _ = h.join();
        }
    }

    /// Pulses delivered so far
    pub fn pulses(&self) -> u64 {
        self.pulses.load(Ordering::Relaxed)
    }
}

impl Drop for PulseTrainHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fires edges on a handler at a fixed frequency
pub struct PulseTrain;

impl PulseTrain {
    /// Spawn a thread calling `handler.on_edge` at `frequency_hz`
    pub fn spawn(
        mut handler: EdgeHandler,
        clock: Arc<dyn Clock>,
        frequency_hz: f64,
    ) -> std::io::Result<PulseTrainHandle> {
        let period = Duration::from_secs_f64(1.0 / frequency_hz.max(0.1));
        let stop_flag = Arc::new(AtomicBool::new(false));
        let pulses = Arc::new(AtomicU64::new(0));
        let thread_stop = Arc::clone(&stop_flag);
        let thread_pulses = Arc::clone(&pulses);
        let pin = handler.pin();

        let thread = std::thread::Builder::new()
            .name(format!("pulse-{:?}", pin).to_lowercase())
            .spawn(move || {
                while !thread_stop.load(Ordering::Acquire) {
                    std::thread::sleep(period);
                    match handler.on_edge(clock.now()) {
                        Ok(true) => {
                            thread_pulses.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(false) => {}
                        Err(e) => {
                            tracing::warn!(?pin, error = %e, "Pulse train stopped");
                            break;
                        }
                    }
                }
            })?;

        Ok(PulseTrainHandle {
            stop_flag,
            pulses,
            thread: Some(thread),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::pulse::{pulse_channel, PulseRateEstimator};
    use crate::signal::source::Pin;
    use crate::time::MonotonicClock;

    #[test]
    fn test_simulated_analog_constant() {
        let mut adc = SimulatedAnalog::new(2.0, 3.0);
        assert_eq!(adc.read_voltage(AnalogChannel::P0), Ok(2.0));
        assert_eq!(adc.read_voltage(AnalogChannel::P1), Ok(3.0));
    }

    #[test]
    fn test_simulated_analog_ripple_bounded() {
        let mut adc = SimulatedAnalog::new(2.0, 2.0).with_ripple(0.1);
        for _ in 0..100 {
            let v = adc.read_voltage(AnalogChannel::P0).unwrap();
            assert!((1.9..=2.1).contains(&v));
        }
    }

    #[test]
    fn test_pulse_train_delivers_pulses() {
        let (producer, mut input) = pulse_channel(256);
        let handler = EdgeHandler::for_pulse(Pin::RpmPulse, producer);
        let mut train = PulseTrain::spawn(handler, Arc::new(MonotonicClock::new()), 200.0).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while train.pulses() < 10 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        train.stop();

        let mut est = PulseRateEstimator::new(10);
        assert!(input.drain_into(&mut est) >= 10);
        assert!(est.estimate_frequency().unwrap() > 0.0);
    }
}
