//! Time-ordered event storage.
//!
//! [`Timeline`] keeps events sorted ascending by time with stable ties and
//! answers point and range queries by binary search. It is the storage behind
//! automation parameters, state timelines, tick offsets and context timeouts.
//!
//! # Example
//!
//! ```
//! use tactus_core::{Timeline, TimelineEvent};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Note {
//!     time: f64,
//!     pitch: u8,
//! }
//!
//! impl TimelineEvent for Note {
//!     fn time(&self) -> f64 {
//!         self.time
//!     }
//! }
//!
//! let mut timeline = Timeline::new();
//! timeline.insert(Note { time: 2.0, pitch: 64 });
//! timeline.insert(Note { time: 1.0, pitch: 60 });
//!
//! assert_eq!(timeline.get(1.5).map(|n| n.pitch), Some(60));
//! assert_eq!(timeline.get_after(1.5).map(|n| n.pitch), Some(64));
//! ```

mod state;

pub use state::{PlaybackState, StateEvent, TimelineState};

use crate::error::{Error, Result};
use crate::lockfree::AtomicDouble;

/// Anything stored in a [`Timeline`] must expose its time.
pub trait TimelineEvent {
    fn time(&self) -> f64;
}

/// Sorted event store with optional memory bound.
#[derive(Debug, Clone)]
pub struct Timeline<E> {
    events: Vec<E>,
    memory: Option<usize>,
    increasing: bool,
    last_query: AtomicDouble,
}

impl<E: TimelineEvent> Timeline<E> {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            memory: None,
            increasing: false,
            last_query: AtomicDouble::new(f64::NEG_INFINITY),
        }
    }

    /// Cap the number of retained events. Oldest events are evicted first, but
    /// never the pair bracketing the most recent query.
    pub fn with_memory(memory: usize) -> Self {
        Self {
            memory: Some(memory.max(2)),
            ..Self::new()
        }
    }

    /// Require [`try_insert`](Self::try_insert) callers to schedule in
    /// non-decreasing time order.
    pub fn increasing(mut self) -> Self {
        self.increasing = true;
        self
    }

    pub fn memory(&self) -> Option<usize> {
        self.memory
    }

    pub fn set_memory(&mut self, memory: Option<usize>) {
        self.memory = memory.map(|m| m.max(2));
        self.enforce_memory(|_, keep_from| keep_from);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, E> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[E] {
        &self.events
    }

    pub fn get_index(&self, index: usize) -> Option<&E> {
        self.events.get(index)
    }

    /// Earliest event.
    pub fn peek(&self) -> Option<&E> {
        self.events.first()
    }

    /// Latest event.
    pub fn last(&self) -> Option<&E> {
        self.events.last()
    }

    /// Remove and return the earliest event.
    pub fn shift(&mut self) -> Option<E> {
        if self.events.is_empty() {
            None
        } else {
            Some(self.events.remove(0))
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Insert in time order. Events sharing a time keep insertion order.
    pub fn insert(&mut self, event: E) {
        self.insert_protecting(event, |_, keep_from| keep_from);
    }

    /// Insert, letting `protect` pull the eviction bound earlier.
    ///
    /// `protect` receives the events and the index eviction would keep from,
    /// and returns the index to actually keep from. It must not return a
    /// larger index.
    pub fn insert_protecting<P>(&mut self, event: E, protect: P)
    where
        P: Fn(&[E], usize) -> usize,
    {
        let index = self.upper_bound(event.time());
        self.events.insert(index, event);
        self.enforce_memory(protect);
    }

    /// Insert, rejecting out-of-order events on an `increasing` timeline.
    pub fn try_insert(&mut self, event: E) -> Result<()> {
        if self.increasing {
            if let Some(last) = self.events.last() {
                if event.time() < last.time() {
                    return Err(Error::NonMonotonicInsert {
                        time: event.time(),
                        last: last.time(),
                    });
                }
            }
        }
        self.insert(event);
        Ok(())
    }

    /// Index of the last event with `time <= time`.
    #[inline]
    pub fn index_at_or_before(&self, time: f64) -> Option<usize> {
        self.upper_bound(time).checked_sub(1)
    }

    /// Index of the last event whose `key` is `<= value`. The key must be
    /// non-decreasing along the timeline.
    pub fn index_at_or_before_by<F>(&self, value: f64, key: F) -> Option<usize>
    where
        F: Fn(&E) -> f64,
    {
        self.events
            .partition_point(|e| key(e) <= value)
            .checked_sub(1)
    }

    /// Event at or before `time`.
    pub fn get(&self, time: f64) -> Option<&E> {
        self.note_query(time);
        self.index_at_or_before(time).map(|i| &self.events[i])
    }

    /// Event strictly before `time`.
    pub fn get_before(&self, time: f64) -> Option<&E> {
        self.note_query(time);
        self.lower_bound(time)
            .checked_sub(1)
            .map(|i| &self.events[i])
    }

    /// Event strictly after `time`.
    pub fn get_after(&self, time: f64) -> Option<&E> {
        self.note_query(time);
        self.events.get(self.upper_bound(time))
    }

    /// Event preceding the one at `index`.
    pub fn previous_event(&self, index: usize) -> Option<&E> {
        index.checked_sub(1).and_then(|i| self.events.get(i))
    }

    /// Events with `t0 <= time < t1`, in ascending order.
    pub fn between(&self, t0: f64, t1: f64) -> &[E] {
        if t1 <= t0 {
            return &[];
        }
        let start = self.lower_bound(t0);
        let end = self.lower_bound(t1);
        &self.events[start..end]
    }

    /// Invoke `f` once per event with `t0 <= time < t1`.
    pub fn for_each_between<F: FnMut(&E)>(&self, t0: f64, t1: f64, f: F) {
        self.between(t0, t1).iter().for_each(f);
    }

    /// Events with `time <= time`.
    pub fn for_each_before<F: FnMut(&E)>(&self, time: f64, f: F) {
        self.events[..self.upper_bound(time)].iter().for_each(f);
    }

    /// Events with `time > time`.
    pub fn for_each_after<F: FnMut(&E)>(&self, time: f64, f: F) {
        self.events[self.upper_bound(time)..].iter().for_each(f);
    }

    /// Events with `time >= time`.
    pub fn for_each_from<F: FnMut(&E)>(&self, time: f64, f: F) {
        self.events[self.lower_bound(time)..].iter().for_each(f);
    }

    /// Events with `time == time`.
    pub fn for_each_at_time<F: FnMut(&E)>(&self, time: f64, f: F) {
        self.events[self.lower_bound(time)..self.upper_bound(time)]
            .iter()
            .for_each(f);
    }

    /// Remove every event with `time >= after`.
    pub fn cancel(&mut self, after: f64) {
        let index = self.lower_bound(after);
        self.events.truncate(index);
    }

    /// Remove every event with `time <= time`.
    pub fn cancel_before(&mut self, time: f64) {
        let index = self.upper_bound(time);
        self.events.drain(..index);
    }

    /// Remove the first event matching `pred`.
    pub fn remove_where<P>(&mut self, pred: P) -> Option<E>
    where
        P: FnMut(&E) -> bool,
    {
        let index = self.events.iter().position(pred)?;
        Some(self.events.remove(index))
    }

    /// Mutate events from `index` onwards, each alongside the events preceding it.
    ///
    /// The closure must not change event times.
    pub fn update_from<F>(&mut self, index: usize, mut f: F)
    where
        F: FnMut(&[E], &mut E),
    {
        for i in index..self.events.len() {
            let (head, tail) = self.events.split_at_mut(i);
            let before = tail[0].time();
            f(head, &mut tail[0]);
            debug_assert_eq!(before, tail[0].time(), "update_from must not move events");
        }
    }

    /// Drop history no query at or after `now` can reach.
    ///
    /// Keeps the last event strictly before `now` and everything after it.
    /// Returns the number of removed events.
    pub fn prune(&mut self, now: f64) -> usize {
        let keep_from = self.lower_bound(now).saturating_sub(1);
        self.prune_front(keep_from)
    }

    /// Drop the first `count` events.
    pub fn prune_front(&mut self, count: usize) -> usize {
        let count = count.min(self.events.len());
        self.events.drain(..count);
        count
    }

    /// Time of the most recent point query.
    pub fn last_query(&self) -> f64 {
        self.last_query.get()
    }

    /// Mark `time` as queried so memory eviction keeps what it needs.
    #[inline]
    pub fn note_query(&self, time: f64) {
        self.last_query.set(time);
    }

    /// First index with `time >= t`.
    #[inline]
    fn lower_bound(&self, t: f64) -> usize {
        self.events.partition_point(|e| e.time() < t)
    }

    /// First index with `time > t`.
    #[inline]
    fn upper_bound(&self, t: f64) -> usize {
        self.events.partition_point(|e| e.time() <= t)
    }

    fn enforce_memory<P>(&mut self, protect: P)
    where
        P: Fn(&[E], usize) -> usize,
    {
        let Some(memory) = self.memory else {
            return;
        };
        if self.events.len() <= memory {
            return;
        }
        let excess = self.events.len() - memory;
        let query = self.last_query.get();
        let bound = if query == f64::NEG_INFINITY {
            excess
        } else {
            excess.min(self.lower_bound(query).saturating_sub(1))
        };
        let keep_from = protect(&self.events, bound).min(bound);
        self.prune_front(keep_from);
    }
}

impl<E: TimelineEvent> Default for Timeline<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, E: TimelineEvent> IntoIterator for &'a Timeline<E> {
    type Item = &'a E;
    type IntoIter = core::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
