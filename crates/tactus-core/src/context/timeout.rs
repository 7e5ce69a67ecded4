//! One-shot callbacks fired by the scheduling loop.

use crate::timeline::{Timeline, TimelineEvent};

/// Handle returned by [`Context::set_timeout`](crate::Context::set_timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeoutId(u64);

pub(crate) type TimeoutCallback = Box<dyn FnOnce() + Send + 'static>;

pub(crate) struct Timeout {
    time: f64,
    id: TimeoutId,
    callback: TimeoutCallback,
}

impl Timeout {
    pub(crate) fn fire(self) {
        (self.callback)();
    }
}

impl TimelineEvent for Timeout {
    fn time(&self) -> f64 {
        self.time
    }
}

#[derive(Default)]
pub(crate) struct TimeoutQueue {
    timeline: Timeline<Timeout>,
    next_id: u64,
}

impl TimeoutQueue {
    pub(crate) fn schedule(&mut self, time: f64, callback: TimeoutCallback) -> TimeoutId {
        let id = TimeoutId(self.next_id);
        self.next_id += 1;
        self.timeline.insert(Timeout { time, id, callback });
        id
    }

    /// Unknown or already fired ids are ignored.
    pub(crate) fn clear(&mut self, id: TimeoutId) -> bool {
        self.timeline.remove_where(|t| t.id == id).is_some()
    }

    /// Remove and return every timeout due at or before `horizon`, oldest first.
    pub(crate) fn take_due(&mut self, horizon: f64) -> Vec<Timeout> {
        let mut due = Vec::new();
        while self.timeline.peek().is_some_and(|t| t.time <= horizon) {
            if let Some(timeout) = self.timeline.shift() {
                due.push(timeout);
            }
        }
        due
    }

    pub(crate) fn len(&self) -> usize {
        self.timeline.len()
    }

    pub(crate) fn clear_all(&mut self) {
        self.timeline.clear();
    }
}
