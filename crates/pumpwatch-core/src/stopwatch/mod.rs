//! Drill stopwatch
//!
//! - Checkpoints, display rows and emitted events ([`checkpoint`])
//! - Cancellable deferred events on the consumer loop ([`timer`])
//! - The checkpoint state machine ([`machine`])

pub mod checkpoint;
pub mod machine;
pub mod timer;

pub use checkpoint::{Checkpoint, StopwatchEvent};
pub use machine::{Stopwatch, StopwatchState};
