//! Event queue state for the headless platform

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::events::{Event, EventFilter};

/// Most events the queue holds before pushes fail
pub(crate) const MAX_QUEUED_EVENTS: usize = 65_535;

/// First registrable custom event type
const FIRST_USER_EVENT: u32 = 0x8000;
/// Last valid event type
const LAST_EVENT: u32 = 0xFFFF;

#[derive(Default)]
struct Pending {
    events: Mutex<VecDeque<Event>>,
    ready: Condvar,
}

/// Cross-thread event source standing in for OS input
///
/// Injected events reach the queue the next time the platform pumps, which
/// every poll and wait does. A blocked wait wakes up on injection.
#[derive(Clone, Default)]
pub struct EventInjector {
    pending: Arc<Pending>,
}

impl EventInjector {
    /// Deliver `event` as if it came from the OS
    pub fn inject(&self, event: Event) {
        let mut events = self.pending.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.push_back(event);
        self.pending.ready.notify_all();
    }

    pub(crate) fn drain(&self) -> Vec<Event> {
        let mut events = self.pending.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.drain(..).collect()
    }

    /// Block until something is injected or `timeout` elapses; `None` waits forever
    pub(crate) fn wait(&self, timeout: Option<Duration>) {
        let events = self.pending.events.lock().unwrap_or_else(PoisonError::into_inner);
        match timeout {
            Some(timeout) => {
                let _guard = self
                    .pending
                    .ready
                    .wait_timeout_while(events, timeout, |events| events.is_empty())
                    .unwrap_or_else(PoisonError::into_inner);
            }
            None => {
                let _guard = self
                    .pending
                    .ready
                    .wait_while(events, |events| events.is_empty())
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
    }
}

impl std::fmt::Debug for EventInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending = self.pending.events.lock().map(|events| events.len()).unwrap_or(0);
        f.debug_struct("EventInjector").field("pending", &pending).finish()
    }
}

/// Queue contents and custom type allocation
#[derive(Debug)]
pub(crate) struct EventQueue {
    events: VecDeque<Event>,
    next_user_type: u32,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self {
            events: VecDeque::new(),
            next_user_type: FIRST_USER_EVENT,
        }
    }
}

impl EventQueue {
    pub(crate) fn push(&mut self, event: Event) -> Result<(), String> {
        if self.events.len() >= MAX_QUEUED_EVENTS {
            return Err("Event queue is full".to_string());
        }
        self.events.push_back(event);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub(crate) fn flush(&mut self, min: u32, max: u32) {
        self.events
            .retain(|event| !(min..=max).contains(&event.event_type().0));
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
    }

    /// Reserve `count` consecutive custom types, returning the first
    pub(crate) fn register(&mut self, count: i32) -> Result<u32, String> {
        let count = u32::try_from(count)
            .ok()
            .filter(|count| *count > 0)
            .ok_or_else(|| "Parameter 'numevents' is invalid".to_string())?;
        let first = self.next_user_type;
        if first + count > LAST_EVENT {
            return Err("Too many custom event types registered".to_string());
        }
        self.next_user_type += count;
        Ok(first)
    }
}

/// Installed callbacks; kept apart from the queue so they can be taken out
/// while they run
#[derive(Default)]
pub(crate) struct Callbacks {
    pub(crate) filter: Option<EventFilter>,
    pub(crate) watches: Vec<(u64, EventFilter)>,
    /// Watches removed while the watch list was taken out for dispatch
    pub(crate) removed: Vec<u64>,
    pub(crate) next_watch: u64,
}
