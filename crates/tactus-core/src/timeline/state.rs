//! Timeline of discrete playback states.

use super::{Timeline, TimelineEvent};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    Started,
    #[default]
    Stopped,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateEvent {
    pub time: f64,
    pub state: PlaybackState,
}

impl StateEvent {
    pub fn new(state: PlaybackState, time: f64) -> Self {
        Self { time, state }
    }
}

impl TimelineEvent for StateEvent {
    fn time(&self) -> f64 {
        self.time
    }
}

/// A [`Timeline`] of [`PlaybackState`] transitions.
///
/// Always seeded with the initial state at time 0, so "state at time T" is
/// defined for every T.
#[derive(Debug, Clone)]
pub struct TimelineState {
    timeline: Timeline<StateEvent>,
    initial: PlaybackState,
}

impl TimelineState {
    pub fn new(initial: PlaybackState) -> Self {
        let mut timeline = Timeline::new();
        timeline.insert(StateEvent::new(initial, 0.0));
        Self { timeline, initial }
    }

    /// Schedule `state` at `time`, superseding everything at or after `time`.
    ///
    /// Re-issuing the active state is still recorded so a later cancel
    /// sees the exact timing.
    pub fn set_state_at_time(&mut self, state: PlaybackState, time: f64) {
        self.timeline.cancel(time);
        self.timeline.insert(StateEvent::new(state, time));
    }

    pub fn get_value_at_time(&self, time: f64) -> PlaybackState {
        self.timeline
            .get(time)
            .map(|e| e.state)
            .unwrap_or(self.initial)
    }

    pub fn get(&self, time: f64) -> Option<&StateEvent> {
        self.timeline.get(time)
    }

    /// Latest event in `state` at or before `time`.
    pub fn get_last_state(&self, state: PlaybackState, time: f64) -> Option<&StateEvent> {
        let end = self.timeline.index_at_or_before(time)?;
        self.timeline.as_slice()[..=end]
            .iter()
            .rev()
            .find(|e| e.state == state)
    }

    /// Earliest event in `state` strictly after `time`.
    pub fn get_next_state(&self, state: PlaybackState, time: f64) -> Option<&StateEvent> {
        let start = self.timeline.index_at_or_before(time).map_or(0, |i| i + 1);
        self.timeline.as_slice()[start..]
            .iter()
            .find(|e| e.state == state)
    }

    /// Transitions with `t0 <= time < t1`.
    pub fn between(&self, t0: f64, t1: f64) -> &[StateEvent] {
        self.timeline.between(t0, t1)
    }

    pub fn for_each_between<F: FnMut(&StateEvent)>(&self, t0: f64, t1: f64, f: F) {
        self.timeline.for_each_between(t0, t1, f);
    }

    pub fn cancel(&mut self, after: f64) {
        self.timeline.cancel(after);
    }

    pub fn events(&self) -> &[StateEvent] {
        self.timeline.as_slice()
    }

    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    /// Drop transitions older than the last stop at or before `now`.
    pub fn prune(&mut self, now: f64) -> usize {
        let Some(end) = self.timeline.index_at_or_before(now) else {
            return 0;
        };
        let last_stop = self.timeline.as_slice()[..=end]
            .iter()
            .rposition(|e| e.state == PlaybackState::Stopped);
        match last_stop {
            Some(index) => self.timeline.prune_front(index),
            None => 0,
        }
    }
}

impl Default for TimelineState {
    fn default() -> Self {
        Self::new(PlaybackState::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PlaybackState::*;

    #[test]
    fn test_default_is_stopped_at_zero() {
        let timeline = TimelineState::default();
        assert_eq!(timeline.get_value_at_time(0.0), Stopped);
        assert_eq!(timeline.get_value_at_time(100.0), Stopped);
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn test_state_changes() {
        let mut timeline = TimelineState::default();
        timeline.set_state_at_time(Started, 1.0);
        timeline.set_state_at_time(Paused, 2.0);
        timeline.set_state_at_time(Started, 3.0);

        assert_eq!(timeline.get_value_at_time(0.5), Stopped);
        assert_eq!(timeline.get_value_at_time(1.0), Started);
        assert_eq!(timeline.get_value_at_time(2.5), Paused);
        assert_eq!(timeline.get_value_at_time(10.0), Started);
    }

    #[test]
    fn test_set_state_supersedes_later_events() {
        let mut timeline = TimelineState::default();
        timeline.set_state_at_time(Started, 1.0);
        timeline.set_state_at_time(Stopped, 5.0);
        timeline.set_state_at_time(Paused, 3.0);

        assert_eq!(timeline.get_value_at_time(6.0), Paused);
        assert_eq!(timeline.len(), 3);
    }

    #[test]
    fn test_reissued_state_is_recorded() {
        let mut timeline = TimelineState::default();
        timeline.set_state_at_time(Started, 1.0);
        timeline.set_state_at_time(Started, 2.0);

        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.get_value_at_time(1.5), Started);
        assert_eq!(timeline.get_value_at_time(2.5), Started);
    }

    #[test]
    fn test_last_and_next_state() {
        let mut timeline = TimelineState::default();
        timeline.set_state_at_time(Started, 1.0);
        timeline.set_state_at_time(Stopped, 2.0);
        timeline.set_state_at_time(Started, 3.0);

        assert_eq!(timeline.get_last_state(Stopped, 2.5).map(|e| e.time), Some(2.0));
        assert_eq!(timeline.get_last_state(Stopped, 1.5).map(|e| e.time), Some(0.0));
        assert_eq!(timeline.get_last_state(Started, 0.5), None);

        assert_eq!(timeline.get_next_state(Started, 1.0).map(|e| e.time), Some(3.0));
        assert_eq!(timeline.get_next_state(Stopped, 0.0).map(|e| e.time), Some(2.0));
        assert_eq!(timeline.get_next_state(Paused, 0.0), None);
    }

    #[test]
    fn test_between_enumerates_transitions() {
        let mut timeline = TimelineState::default();
        timeline.set_state_at_time(Started, 1.0);
        timeline.set_state_at_time(Paused, 2.0);

        let states: Vec<_> = timeline.between(0.5, 2.0).iter().map(|e| e.state).collect();
        assert_eq!(states, vec![Started]);

        let states: Vec<_> = timeline.between(0.0, 3.0).iter().map(|e| e.state).collect();
        assert_eq!(states, vec![Stopped, Started, Paused]);
    }

    #[test]
    fn test_prune_keeps_last_stop() {
        let mut timeline = TimelineState::default();
        timeline.set_state_at_time(Started, 1.0);
        timeline.set_state_at_time(Stopped, 2.0);
        timeline.set_state_at_time(Started, 3.0);

        assert_eq!(timeline.prune(4.0), 2);
        assert_eq!(timeline.events()[0].time, 2.0);
        assert_eq!(timeline.get_value_at_time(4.0), Started);
        assert_eq!(timeline.get_last_state(Stopped, 4.0).map(|e| e.time), Some(2.0));
    }
}
