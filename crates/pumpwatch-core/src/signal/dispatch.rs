//! Edge handlers
//!
//! A hardware driver owns one [`EdgeHandler`] per pin and calls
//! [`EdgeHandler::on_edge`] from its interrupt callback with the edge
//! timestamp. The handler debounces the edge and hands it over without
//! blocking:
//! - button and gate pins enqueue a [`TriggerEvent`] on the bounded trigger queue
//! - pulse pins push the timestamp into the lock-free pulse queue of their meter

use super::source::{Pin, SignalError, Trigger, TriggerEvent};
use crate::measure::pulse::PulseProducer;
use crate::time::Timestamp;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::time::Duration;

/// Trigger queue capacity; the consumer drains it every tick
pub const TRIGGER_QUEUE_SIZE: usize = 64;

/// Producer side of the trigger queue
pub type TriggerSender = Sender<TriggerEvent>;

/// Consumer side of the trigger queue
pub type TriggerReceiver = Receiver<TriggerEvent>;

/// Create the bounded trigger queue shared by all button and gate pins
pub fn trigger_queue(capacity: usize) -> (TriggerSender, TriggerReceiver) {
    crossbeam_channel::bounded(capacity.max(1))
}

/// Rejects edges closer than `interval` to the last accepted edge
#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    last_accepted: Option<Timestamp>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_accepted: None,
        }
    }

    /// Whether an edge at `at` should be delivered
    pub fn accept(&mut self, at: Timestamp) -> bool {
        if let Some(last) = self.last_accepted {
            if at < last || at.saturating_duration_since(last) < self.interval {
                return false;
            }
        }
        self.last_accepted = Some(at);
        true
    }
}

enum EdgeSink {
    Trigger(Trigger, TriggerSender),
    Pulse(PulseProducer),
}

/// Debounced hand-off for one pin
pub struct EdgeHandler {
    pin: Pin,
    debouncer: Option<Debouncer>,
    sink: EdgeSink,
}

impl EdgeHandler {
    /// Handler for a button or gate pin; `None` for pulse pins
    pub fn for_trigger(pin: Pin, sender: TriggerSender) -> Option<Self> {
        let trigger = pin.trigger()?;
        Some(Self {
            pin,
            debouncer: pin.debounce().map(Debouncer::new),
            sink: EdgeSink::Trigger(trigger, sender),
        })
    }

    /// Handler for a pulse pin feeding `producer`
    pub fn for_pulse(pin: Pin, producer: PulseProducer) -> Self {
        Self {
            pin,
            debouncer: pin.debounce().map(Debouncer::new),
            sink: EdgeSink::Pulse(producer),
        }
    }

    pub fn pin(&self) -> Pin {
        self.pin
    }

    /// Handle a rising edge at `at`
    ///
    /// Returns `Ok(false)` when the edge was debounced, `Ok(true)` when it was
    /// handed over. Never blocks.
    pub fn on_edge(&mut self, at: Timestamp) -> Result<bool, SignalError> {
        if let Some(debouncer) = self.debouncer.as_mut() {
            if !debouncer.accept(at) {
                return Ok(false);
            }
        }
        match &mut self.sink {
            EdgeSink::Trigger(trigger, sender) => match sender.try_send(TriggerEvent::new(*trigger, at)) {
                Ok(()) => Ok(true),
                Err(TrySendError::Full(_)) => Err(SignalError::QueueFull(*trigger)),
                Err(TrySendError::Disconnected(_)) => Err(SignalError::Disconnected),
            },
            // Pulses are dropped while the meter lags behind
            EdgeSink::Pulse(producer) => Ok(producer.push(at)),
        }
    }
}

/// Build handlers for every pin of the instrument
pub fn wire_edges(triggers: &TriggerSender, flow: PulseProducer, rpm: PulseProducer) -> Vec<EdgeHandler> {
    let mut handlers: Vec<EdgeHandler> = Pin::ALL
        .into_iter()
        .filter_map(|pin| EdgeHandler::for_trigger(pin, triggers.clone()))
        .collect();
    handlers.push(EdgeHandler::for_pulse(Pin::FlowPulse, flow));
    handlers.push(EdgeHandler::for_pulse(Pin::RpmPulse, rpm));
    handlers
}
