//! Deferred events on the consumer loop
//!
//! Events are scheduled against a deadline and released by [`TimerQueue::poll`]
//! on a later tick. Nothing runs on another thread, so a pending event can be
//! cancelled at any time before it is polled.

use crate::time::Timestamp;
use std::time::Duration;

/// Identifier of a scheduled event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Pending<E> {
    id: TimerId,
    deadline: Timestamp,
    event: E,
}

/// Cancellable schedule of deferred events
#[derive(Debug)]
pub struct TimerQueue<E> {
    next_id: u64,
    pending: Vec<Pending<E>>,
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: Vec::new(),
        }
    }

    /// Schedule `event` for release at `deadline`
    pub fn schedule_at(&mut self, deadline: Timestamp, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending { id, deadline, event });
        id
    }

    /// Schedule `event` for release `delay` after `now`
    pub fn schedule_after(&mut self, now: Timestamp, delay: Duration, event: E) -> TimerId {
        self.schedule_at(now + delay, event)
    }

    /// Cancel a pending event; false if it already fired or was cancelled
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.id != id);
        self.pending.len() != before
    }

    /// Cancel every pending event, returning how many were dropped
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Remove and return events whose deadline is at or before `now`,
    /// earliest deadline first (ties in scheduling order)
    pub fn poll(&mut self, now: Timestamp) -> Vec<E> {
        if !self.pending.iter().any(|p| p.deadline <= now) {
            return Vec::new();
        }
        let (mut due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.deadline <= now);
        self.pending = waiting;
        due.sort_by_key(|p| (p.deadline, p.id.0));
        due.into_iter().map(|p| p.event).collect()
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.pending.iter().map(|p| p.deadline).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}
