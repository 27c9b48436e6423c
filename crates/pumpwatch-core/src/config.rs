//! Instrument configuration
//!
//! Calibration constants, RPM smoothing and the log location, stored as JSON
//! (default `config.json` next to the binary):
//!
//! ```json
//! {
//!   "flow": { "k": 8.34, "q": 0.229 },
//!   "revs": { "k": 1, "smoothing": "exponential", "window": 25 },
//!   "pressure": { "k": 20.0, "q": 0.0, "samples": 25 },
//!   "logging": { "location": "stopwatch_log.csv" }
//! }
//! ```
//!
//! Every key is read on its own: a missing or malformed key is reported and
//! replaced by its default, the rest of the file still applies.

use crate::measure::pressure::DEFAULT_PRESSURE_SAMPLES;
use crate::measure::rpm::{Smoothing, DEFAULT_SMOOTHING_WINDOW, PULSES_PER_REV_RANGE};
use crate::measure::{Calibration, MAX_WINDOW};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Default config file name
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Default measurement log file name
pub const DEFAULT_LOG_FILE: &str = "stopwatch_log.csv";

/// Flow meter calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    pub k: f64,
    pub q: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self { k: 8.34, q: 0.229 }
    }
}

/// Engine revolution counter settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevsConfig {
    /// Pulses per engine revolution, 1..=4
    pub k: u8,
    #[serde(default)]
    pub smoothing: Smoothing,
    /// Smoothing window in samples
    pub window: usize,
}

impl Default for RevsConfig {
    fn default() -> Self {
        Self {
            k: 1,
            smoothing: Smoothing::Exponential,
            window: DEFAULT_SMOOTHING_WINDOW,
        }
    }
}

/// Pressure transducer calibration and window size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureConfig {
    pub k: f64,
    pub q: f64,
    /// Samples per sliding window; the sampler runs at this rate in Hz
    pub samples: usize,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            k: 20.0,
            q: 0.0,
            samples: DEFAULT_PRESSURE_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Measurement log path
    pub location: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            location: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

/// Complete instrument configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub flow: FlowConfig,
    #[serde(default)]
    pub revs: RevsConfig,
    #[serde(default)]
    pub pressure: PressureConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load config from disk, falling back to defaults on any error
    ///
    /// A missing file is not an error. An unreadable or unparsable file
    /// yields the full default config.
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                return Self::default();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str::<Value>(&contents) {
            Ok(root) => {
                let config = Self::from_value(&root);
                tracing::info!(path = %path.display(), "Loaded config from disk");
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                Self::default()
            }
        }
    }

    /// Build a config from a parsed JSON document, key by key
    pub fn from_value(root: &Value) -> Self {
        let defaults = Self::default();

        let flow = FlowConfig {
            k: read_key(root, "flow", "k", defaults.flow.k),
            q: read_key(root, "flow", "q", defaults.flow.q),
        };

        let mut pulses_per_rev = read_key(root, "revs", "k", defaults.revs.k);
        if !PULSES_PER_REV_RANGE.contains(&pulses_per_rev) {
            tracing::warn!(
                value = pulses_per_rev,
                default = defaults.revs.k,
                "Config key revs.k out of range 1..=4, using default"
            );
            pulses_per_rev = defaults.revs.k;
        }
        let revs = RevsConfig {
            k: pulses_per_rev,
            smoothing: read_key(root, "revs", "smoothing", defaults.revs.smoothing),
            window: window_in_range(read_key(root, "revs", "window", defaults.revs.window), "revs.window", defaults.revs.window),
        };

        let pressure = PressureConfig {
            k: read_key(root, "pressure", "k", defaults.pressure.k),
            q: read_key(root, "pressure", "q", defaults.pressure.q),
            samples: window_in_range(
                read_key(root, "pressure", "samples", defaults.pressure.samples),
                "pressure.samples",
                defaults.pressure.samples,
            ),
        };

        let logging = LoggingConfig {
            location: read_key(root, "logging", "location", defaults.logging.location),
        };

        Self {
            flow,
            revs,
            pressure,
            logging,
        }
    }

    /// Save config to disk, creating parent directories if needed
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Config saved to disk");
        Ok(())
    }

    pub fn flow_calibration(&self) -> Calibration {
        Calibration::new(self.flow.k, self.flow.q)
    }

    pub fn pressure_calibration(&self) -> Calibration {
        Calibration::new(self.pressure.k, self.pressure.q)
    }
}

/// Read `section.key`, warning and returning `default` when missing or malformed
fn read_key<T>(root: &Value, section: &str, key: &str, default: T) -> T
where
    T: DeserializeOwned + std::fmt::Debug,
{
    match root.get(section).and_then(|s| s.get(key)) {
        None => {
            tracing::warn!(key = %format!("{section}.{key}"), ?default, "Config key missing, using default");
            default
        }
        Some(value) => match T::deserialize(value) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(
                    key = %format!("{section}.{key}"),
                    %value,
                    error = %e,
                    ?default,
                    "Config key malformed, using default"
                );
                default
            }
        },
    }
}

fn window_in_range(value: usize, key: &str, default: usize) -> usize {
    if !(1..=MAX_WINDOW).contains(&value) {
        tracing::warn!(key, value, default, max = MAX_WINDOW, "Config window out of range, using default");
        default
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.flow.k, 8.34);
        assert_eq!(config.flow.q, 0.229);
        assert_eq!(config.revs.k, 1);
        assert_eq!(config.revs.smoothing, Smoothing::Exponential);
        assert_eq!(config.revs.window, 25);
        assert_eq!(config.pressure.k, 20.0);
        assert_eq!(config.pressure.q, 0.0);
        assert_eq!(config.pressure.samples, 25);
        assert_eq!(config.logging.location, PathBuf::from("stopwatch_log.csv"));
    }

    #[test]
    fn test_full_document() {
        let root = json!({
            "flow": { "k": 7.5, "q": 0.1 },
            "revs": { "k": 2, "smoothing": "running", "window": 10 },
            "pressure": { "k": 25.0, "q": -0.5, "samples": 50 },
            "logging": { "location": "/var/log/drill.csv" }
        });
        let config = AppConfig::from_value(&root);
        assert_eq!(config.flow, FlowConfig { k: 7.5, q: 0.1 });
        assert_eq!(config.revs.k, 2);
        assert_eq!(config.revs.smoothing, Smoothing::Running);
        assert_eq!(config.revs.window, 10);
        assert_eq!(config.pressure.samples, 50);
        assert_eq!(config.pressure_calibration(), Calibration::new(25.0, -0.5));
        assert_eq!(config.logging.location, PathBuf::from("/var/log/drill.csv"));
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let root = json!({ "flow": { "k": 9.0 } });
        let config = AppConfig::from_value(&root);
        assert_eq!(config.flow.k, 9.0);
        assert_eq!(config.flow.q, 0.229);
        assert_eq!(config.revs, RevsConfig::default());
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_malformed_key_falls_back_alone() {
        let root = json!({
            "flow": { "k": "fast", "q": 0.5 },
            "revs": { "smoothing": "median" }
        });
        let config = AppConfig::from_value(&root);
        assert_eq!(config.flow.k, 8.34);
        assert_eq!(config.flow.q, 0.5);
        assert_eq!(config.revs.smoothing, Smoothing::Exponential);
    }

    #[test]
    fn test_pulses_per_rev_out_of_range() {
        for bad in [json!(0), json!(5), json!(-1), json!(300)] {
            let config = AppConfig::from_value(&json!({ "revs": { "k": bad } }));
            assert_eq!(config.revs.k, 1);
        }
        let config = AppConfig::from_value(&json!({ "revs": { "k": 4 } }));
        assert_eq!(config.revs.k, 4);
    }

    #[test]
    fn test_zero_windows_rejected() {
        let root = json!({ "revs": { "window": 0 }, "pressure": { "samples": 0 } });
        let config = AppConfig::from_value(&root);
        assert_eq!(config.revs.window, 25);
        assert_eq!(config.pressure.samples, 25);
    }

    #[test]
    fn test_oversized_windows_rejected() {
        let root = json!({ "revs": { "window": 1001 }, "pressure": { "samples": 1u64 << 60 } });
        let config = AppConfig::from_value(&root);
        assert_eq!(config.revs.window, 25);
        assert_eq!(config.pressure.samples, 25);

        let root = json!({ "revs": { "window": MAX_WINDOW }, "pressure": { "samples": MAX_WINDOW } });
        let config = AppConfig::from_value(&root);
        assert_eq!(config.revs.window, MAX_WINDOW);
        assert_eq!(config.pressure.samples, MAX_WINDOW);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json"));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppConfig::load(&path), AppConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.flow.k = 6.0;
        config.revs.k = 3;
        config.revs.smoothing = Smoothing::Running;
        config.logging.location = PathBuf::from("runs.csv");
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path);
        assert_eq!(loaded, config);
    }
}
