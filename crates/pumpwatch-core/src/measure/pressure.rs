//! Dual-channel pressure transducer
//!
//! Two 0–10 V transducers (0–100 bar full scale) sit behind a voltage divider
//! on a 16-bit ADC. A background sampler reads both channels every
//! `1 / samples` seconds and appends the voltages to two sliding windows.
//! Readers copy the window averages under the same lock the sampler appends
//! with, so both channels always come from one consistent snapshot.
//!
//! When the analog subsystem is not available the transducer runs in a
//! permanent degraded mode and reports `(0, 0)`.

use super::bounds::{clamp_to_max, MAX_PRESSURE_BAR};
use super::ring::SampleRing;
use super::Calibration;
use crate::signal::source::{AnalogChannel, AnalogInput, Capability};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, TryLockError};
use std::time::Duration;

/// Default number of samples in each sliding window, at most [`MAX_WINDOW`](super::MAX_WINDOW)
pub const DEFAULT_PRESSURE_SAMPLES: usize = 25;

/// Voltage windows of both channels
#[derive(Debug)]
struct PressureWindows {
    channel_1: SampleRing<f64>,
    channel_2: SampleRing<f64>,
    /// Most recent raw voltages
    latest: Option<(f64, f64)>,
}

/// State shared between the sampler thread and readers
struct SharedState {
    windows: Mutex<PressureWindows>,
    /// ADC handle; held for the duration of one refresh cycle
    input: Mutex<Box<dyn AnalogInput>>,
    /// Completed refresh cycles
    cycles: AtomicU64,
}

impl SharedState {
    /// Read both channels once and append them to the windows
    ///
    /// Returns false if another refresh is in flight or a channel read failed.
    fn refresh(&self) -> bool {
        let mut input = match self.input.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return false,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let reading = input
            .read_voltage(AnalogChannel::P0)
            .and_then(|v1| input.read_voltage(AnalogChannel::P1).map(|v2| (v1, v2)));
        drop(input);

        let (v1, v2) = match reading {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "Pressure sample skipped");
                return false;
            }
        };

        let mut windows = self.windows.lock().unwrap_or_else(|p| p.into_inner());
        windows.channel_1.push(v1);
        windows.channel_2.push(v2);
        windows.latest = Some((v1, v2));
        drop(windows);

        self.cycles.fetch_add(1, Ordering::Relaxed);
        true
    }
}

/// Handle of the background sampler thread; stops it on drop
struct SamplerHandle {
    stop_flag: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl SamplerHandle {
    fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(h) = self.thread.take() {
            let _ = h.join();
        }
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pressure transducer pair with sliding-average smoothing
pub struct PressureTransducer {
    calibration: Calibration,
    samples: usize,
    /// `None` in degraded mode
    shared: Option<Arc<SharedState>>,
    sampler: Option<SamplerHandle>,
}

impl PressureTransducer {
    /// Create a transducer
    ///
    /// # Arguments
    /// * `calibration` - Linear voltage-to-bar conversion
    /// * `samples` - Window size; the sampler runs at `samples` Hz
    /// * `capability` - Result of probing the analog subsystem at startup
    /// * `input` - ADC driver, ignored unless `capability` is available
    pub fn new(
        calibration: Calibration,
        samples: usize,
        capability: Capability,
        input: Option<Box<dyn AnalogInput>>,
    ) -> Self {
        let samples = samples.max(1);
        let shared = match (capability, input) {
            (Capability::Available, Some(input)) => Some(Arc::new(SharedState {
                windows: Mutex::new(PressureWindows {
                    channel_1: SampleRing::new(samples),
                    channel_2: SampleRing::new(samples),
                    latest: None,
                }),
                input: Mutex::new(input),
                cycles: AtomicU64::new(0),
            })),
            (Capability::Available, None) => {
                tracing::warn!("Analog subsystem reported available but no ADC driver given, pressure disabled");
                None
            }
            (Capability::Unavailable, _) => {
                tracing::warn!("Analog subsystem unavailable, pressure readings disabled");
                None
            }
            (Capability::Error(reason), _) => {
                tracing::warn!(%reason, "Analog subsystem failed to initialize, pressure readings disabled");
                None
            }
        };
        Self {
            calibration,
            samples,
            shared,
            sampler: None,
        }
    }

    /// Create a transducer in permanent degraded mode
    pub fn disabled(calibration: Calibration) -> Self {
        Self::new(calibration, DEFAULT_PRESSURE_SAMPLES, Capability::Unavailable, None)
    }

    /// Whether the analog subsystem is in use
    pub fn is_initialized(&self) -> bool {
        self.shared.is_some()
    }

    /// Window size and sampling rate in Hz
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Interval between two refresh cycles
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.samples as f64)
    }

    /// Number of completed refresh cycles
    pub fn cycles(&self) -> u64 {
        self.shared
            .as_ref()
            .map(|s| s.cycles.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Run one refresh cycle on the calling thread
    ///
    /// Returns false in degraded mode, while another refresh is in flight, or
    /// when a channel read failed.
    pub fn refresh(&self) -> bool {
        self.shared.as_ref().map(|s| s.refresh()).unwrap_or(false)
    }

    /// Spawn the background sampler; no-op in degraded mode or when already running
    pub fn start_sampler(&mut self) {
        let Some(shared) = self.shared.as_ref() else {
            return;
        };
        if self.sampler.is_some() {
            return;
        }

        let stop_flag = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_flag);
        let thread_shared = Arc::clone(shared);
        let interval = self.sample_interval();

        let thread = std::thread::Builder::new()
            .name("pressure-sampler".into())
            .spawn(move || {
                tracing::info!(interval_ms = interval.as_millis() as u64, "Pressure sampler started");
                while !thread_stop.load(Ordering::Acquire) {
                    thread_shared.refresh();
                    std::thread::sleep(interval);
                }
                tracing::info!("Pressure sampler stopped");
            });

        match thread {
            Ok(handle) => {
                self.sampler = Some(SamplerHandle {
                    stop_flag,
                    thread: Some(handle),
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to spawn pressure sampler");
            }
        }
    }

    /// Stop the background sampler and wait for it to exit
    pub fn stop_sampler(&mut self) {
        if let Some(mut sampler) = self.sampler.take() {
            sampler.stop();
        }
    }

    pub fn is_sampling(&self) -> bool {
        self.sampler
            .as_ref()
            .and_then(|s| s.thread.as_ref())
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Pressure of both channels in bar, averaged over the sliding windows
    ///
    /// A partly filled window averages only the samples it holds.
    pub fn sliding_average_pressure(&self) -> (u32, u32) {
        let Some(shared) = self.shared.as_ref() else {
            return (0, 0);
        };
        let (v1, v2) = {
            let windows = shared.windows.lock().unwrap_or_else(|p| p.into_inner());
            (
                windows.channel_1.mean().unwrap_or(0.0),
                windows.channel_2.mean().unwrap_or(0.0),
            )
        };
        (self.to_bar(v1), self.to_bar(v2))
    }

    /// Pressure of both channels in bar from the most recent sample only
    pub fn instantaneous_pressure(&self) -> (u32, u32) {
        let Some(shared) = self.shared.as_ref() else {
            return (0, 0);
        };
        let latest = shared
            .windows
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .latest;
        let (v1, v2) = latest.unwrap_or((0.0, 0.0));
        (self.to_bar(v1), self.to_bar(v2))
    }

    fn to_bar(&self, voltage: f64) -> u32 {
        clamp_to_max(self.calibration.apply(voltage), MAX_PRESSURE_BAR, "pressure")
    }
}

impl Drop for PressureTransducer {
    fn drop(&mut self) {
        self.stop_sampler();
    }
}
