//! Signal source boundary
//!
//! This module contains the contract between hardware drivers and the engine:
//! - Pin map, triggers and analog channels ([`source`])
//! - Debounced edge handlers feeding the trigger queue and pulse rings ([`dispatch`])
//! - Simulated producers for bench testing without hardware ([`sim`])

pub mod dispatch;
pub mod sim;
pub mod source;

pub use dispatch::{trigger_queue, EdgeHandler, TriggerReceiver, TriggerSender};
pub use source::{AnalogChannel, AnalogInput, Capability, Pin, SignalError, Trigger, TriggerEvent};
