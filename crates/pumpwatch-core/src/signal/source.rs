//! Pins, triggers, analog channels and hardware capability detection

use crate::time::Timestamp;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// GPIO character device probed at startup
pub const GPIO_DEVICE: &str = "/dev/gpiochip0";

/// I2C bus hosting the pressure ADC
pub const I2C_DEVICE: &str = "/dev/i2c-1";

/// Debounce interval for push buttons and gate sensors
pub const BUTTON_DEBOUNCE: Duration = Duration::from_millis(10);

/// Debounce interval for the flow meter pulse line
pub const FLOW_PULSE_DEBOUNCE: Duration = Duration::from_millis(1);

/// Errors raised at the signal source boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("Failed to read analog channel {channel:?}: {reason}")]
    ChannelRead {
        channel: AnalogChannel,
        reason: String,
    },

    #[error("Trigger queue full, dropped {0:?}")]
    QueueFull(Trigger),

    #[error("Signal consumer disconnected")]
    Disconnected,
}

/// Physical input lines of the instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pin {
    /// Start button
    Start,
    /// First split gate
    FirstSplit,
    /// First of the two stop sensors (checkpoint 1)
    StopA,
    /// Second of the two stop sensors (checkpoint 2)
    StopB,
    /// Manual measurement button
    ManualMeasure,
    /// Reset button
    Reset,
    /// Flow meter pulse output
    FlowPulse,
    /// Engine revolution pulse output
    RpmPulse,
}

impl Pin {
    /// Every pin the instrument listens on
    pub const ALL: [Pin; 8] = [
        Pin::Start,
        Pin::FirstSplit,
        Pin::StopA,
        Pin::StopB,
        Pin::ManualMeasure,
        Pin::Reset,
        Pin::FlowPulse,
        Pin::RpmPulse,
    ];

    /// BCM GPIO number of the pin on the reference harness
    pub fn bcm(&self) -> u8 {
        match self {
            Pin::Start => 7,
            Pin::FirstSplit => 8,
            Pin::StopA => 11,
            Pin::StopB => 25,
            Pin::ManualMeasure => 20,
            Pin::Reset => 21,
            Pin::FlowPulse => 26,
            Pin::RpmPulse => 16,
        }
    }

    /// Look up a pin by BCM GPIO number
    pub fn from_bcm(gpio: u8) -> Option<Pin> {
        Self::ALL.into_iter().find(|p| p.bcm() == gpio)
    }

    /// Minimum spacing between accepted edges, `None` for immediate delivery
    pub fn debounce(&self) -> Option<Duration> {
        match self {
            Pin::FlowPulse => Some(FLOW_PULSE_DEBOUNCE),
            Pin::RpmPulse => None,
            _ => Some(BUTTON_DEBOUNCE),
        }
    }

    /// Trigger raised by this pin, `None` for pulse lines
    pub fn trigger(&self) -> Option<Trigger> {
        match self {
            Pin::Start => Some(Trigger::Start),
            Pin::FirstSplit => Some(Trigger::FirstSplit),
            Pin::StopA => Some(Trigger::StopA),
            Pin::StopB => Some(Trigger::StopB),
            Pin::ManualMeasure => Some(Trigger::ManualMeasure),
            Pin::Reset => Some(Trigger::Reset),
            Pin::FlowPulse | Pin::RpmPulse => None,
        }
    }
}

/// Discrete stopwatch input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Start,
    FirstSplit,
    StopA,
    StopB,
    ManualMeasure,
    Reset,
}

/// A trigger together with the moment its edge fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub trigger: Trigger,
    pub timestamp: Timestamp,
}

impl TriggerEvent {
    pub fn new(trigger: Trigger, timestamp: Timestamp) -> Self {
        Self { trigger, timestamp }
    }
}

/// Single-ended inputs of the pressure ADC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogChannel {
    P0,
    P1,
}

/// Raw voltage source for the pressure transducers
///
/// Implemented by ADC drivers. Only the pressure sampler calls it, from its
/// own background thread.
pub trait AnalogInput: Send {
    /// Read the present voltage on `channel`
    fn read_voltage(&mut self, channel: AnalogChannel) -> Result<f64, SignalError>;
}

/// Result of probing for a hardware subsystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// Device present and accessible
    Available,
    /// Device absent, typically a non-hardware host
    Unavailable,
    /// Device present but probing failed
    Error(String),
}

impl Capability {
    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available)
    }
}

/// Capabilities of the host, evaluated once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareCapabilities {
    /// GPIO lines for buttons, gates and pulse sensors
    pub gpio: Capability,
    /// I2C bus with the pressure ADC
    pub analog: Capability,
}

/// Probe a device node
pub fn detect_capability(device: &Path) -> Capability {
    match std::fs::metadata(device) {
        Ok(_) => match std::fs::OpenOptions::new().read(true).open(device) {
            Ok(_) => Capability::Available,
            Err(e) => Capability::Error(format!("{}: {}", device.display(), e)),
        },
        Err(e) if e.kind() == ErrorKind::NotFound => Capability::Unavailable,
        Err(e) => Capability::Error(format!("{}: {}", device.display(), e)),
    }
}

/// Probe the GPIO and I2C device nodes of the host
pub fn probe_hardware() -> HardwareCapabilities {
    let caps = HardwareCapabilities {
        gpio: detect_capability(Path::new(GPIO_DEVICE)),
        analog: detect_capability(Path::new(I2C_DEVICE)),
    };
    tracing::info!(gpio = ?caps.gpio, analog = ?caps.analog, "Hardware probed");
    caps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_bcm_round_trip() {
        for pin in Pin::ALL {
            assert_eq!(Pin::from_bcm(pin.bcm()), Some(pin));
        }
        assert_eq!(Pin::from_bcm(3), None);
    }

    #[test]
    fn test_pin_debounce_policy() {
        assert_eq!(Pin::Start.debounce(), Some(Duration::from_millis(10)));
        assert_eq!(Pin::StopB.debounce(), Some(Duration::from_millis(10)));
        assert_eq!(Pin::FlowPulse.debounce(), Some(Duration::from_millis(1)));
        assert_eq!(Pin::RpmPulse.debounce(), None);
    }

    #[test]
    fn test_pulse_pins_have_no_trigger() {
        assert_eq!(Pin::FlowPulse.trigger(), None);
        assert_eq!(Pin::RpmPulse.trigger(), None);
        assert_eq!(Pin::StopA.trigger(), Some(Trigger::StopA));
    }

    #[test]
    fn test_detect_missing_device() {
        let cap = detect_capability(Path::new("/nonexistent/pumpwatch/device"));
        assert_eq!(cap, Capability::Unavailable);
        assert!(!cap.is_available());
    }

    #[test]
    fn test_detect_present_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(detect_capability(file.path()), Capability::Available);
    }
}
