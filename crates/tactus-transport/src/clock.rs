//! Lookahead clock: a [`TickSource`] driven by the context's scheduling loop.

use crate::error::{Error, Result};
use crate::tick_source::TickSource;
use crossbeam_channel::Receiver;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tactus_automation::{TickParam, TickParamOptions};
use tactus_core::{
    AtomicFlag, Context, Disposable, PlaybackState, Scheduled, StateEvent, Turn,
};

/// Called once per tick with the tick's exact time and tick number.
pub type TickCallback = Arc<dyn Fn(f64, u64) + Send + Sync>;

/// Called once per lifecycle transition.
pub type ClockListener = Arc<dyn Fn(&ClockEvent) + Send + Sync>;

/// Lifecycle transition reported when its time enters the processed window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockEvent {
    /// `offset` is the tick count at `time`.
    Started { time: f64, offset: f64 },
    Stopped { time: f64 },
    Paused { time: f64 },
}

impl ClockEvent {
    pub fn time(&self) -> f64 {
        match *self {
            ClockEvent::Started { time, .. }
            | ClockEvent::Stopped { time }
            | ClockEvent::Paused { time } => time,
        }
    }
}

struct ClockState {
    source: TickSource,
    /// End of the last processed window.
    last_update: f64,
    /// Transitions scheduled behind `last_update`, reported next turn.
    late: Vec<StateEvent>,
    callback: Option<TickCallback>,
    listeners: Vec<ClockListener>,
}

struct ClockShared {
    state: Mutex<ClockState>,
    disposed: AtomicFlag,
    missed_ticks: AtomicU64,
}

/// Shared handle to a clock registered with a [`Context`].
///
/// Every turn the clock reports lifecycle transitions and then ticks whose
/// times fall in `[last_update, now + look_ahead)`. Callbacks receive the
/// exact tick time so work can be scheduled ahead on the renderer.
#[derive(Clone)]
pub struct Clock {
    shared: Arc<ClockShared>,
}

impl Clock {
    pub fn new<F>(ctx: &Context, frequency: f64, callback: F) -> Self
    where
        F: Fn(f64, u64) + Send + Sync + 'static,
    {
        let clock = Self::with_options(
            ctx,
            TickParamOptions {
                value: frequency,
                ..Default::default()
            },
        );
        clock.set_callback(callback);
        clock
    }

    /// Clock without a tick callback.
    pub fn with_options(ctx: &Context, options: TickParamOptions) -> Self {
        let shared = Arc::new(ClockShared {
            state: Mutex::new(ClockState {
                source: TickSource::with_options(ctx, options),
                last_update: ctx.current_time(),
                late: Vec::new(),
                callback: None,
                listeners: Vec::new(),
            }),
            disposed: AtomicFlag::new(false),
            missed_ticks: AtomicU64::new(0),
        });
        let participant: Weak<ClockShared> = Arc::downgrade(&shared);
        ctx.register(participant);
        Self { shared }
    }

    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(f64, u64) + Send + Sync + 'static,
    {
        self.shared.state.lock().callback = Some(Arc::new(callback));
    }

    pub fn clear_callback(&self) {
        self.shared.state.lock().callback = None;
    }

    /// Register a lifecycle listener.
    pub fn on_event<F>(&self, listener: F)
    where
        F: Fn(&ClockEvent) + Send + Sync + 'static,
    {
        self.shared.state.lock().listeners.push(Arc::new(listener));
    }

    /// Lifecycle events as a channel.
    pub fn subscribe(&self) -> Receiver<ClockEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.on_event(move |event| {
            let _ = tx.send(*event);
        });
        rx
    }

    pub fn context(&self) -> Context {
        self.shared.state.lock().source.context().clone()
    }

    /// Rate in ticks per second, locked for reading or scheduling automation.
    pub fn frequency(&self) -> MappedMutexGuard<'_, TickParam> {
        MutexGuard::map(self.shared.state.lock(), |s| s.source.frequency_mut())
    }

    pub fn start(&self) -> Result<&Self> {
        let now = self.context().now();
        self.start_at(now, None)
    }

    /// Start at `time`, optionally from `offset` ticks. Ignored while started.
    pub fn start_at(&self, time: f64, offset: Option<f64>) -> Result<&Self> {
        self.transition(PlaybackState::Started, time, |source| {
            source.start(time, offset)
        })
    }

    pub fn stop(&self) -> Result<&Self> {
        let now = self.context().now();
        self.stop_at(now)
    }

    /// Stop at `time`, resetting ticks. Ignored while stopped.
    pub fn stop_at(&self, time: f64) -> Result<&Self> {
        self.transition(PlaybackState::Stopped, time, |source| source.stop(time))
    }

    pub fn pause(&self) -> Result<&Self> {
        let now = self.context().now();
        self.pause_at(now)
    }

    /// Pause at `time`. Ignored unless started.
    pub fn pause_at(&self, time: f64) -> Result<&Self> {
        self.transition(PlaybackState::Paused, time, |source| source.pause(time))
    }

    /// Drop every transition and seek at or after `time`.
    pub fn cancel(&self, time: f64) -> Result<&Self> {
        self.ensure_live()?;
        let mut state = self.shared.state.lock();
        state.source.cancel(time)?;
        state.late.retain(|e| e.time < time);
        Ok(self)
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.state.lock().source.state()
    }

    pub fn get_state_at_time(&self, time: f64) -> PlaybackState {
        self.shared.state.lock().source.get_state_at_time(time)
    }

    pub fn ticks(&self) -> f64 {
        self.shared.state.lock().source.ticks()
    }

    pub fn set_ticks(&self, ticks: f64) -> Result<()> {
        self.shared.state.lock().source.set_ticks(ticks)
    }

    pub fn seconds(&self) -> f64 {
        self.shared.state.lock().source.seconds()
    }

    pub fn set_seconds(&self, seconds: f64) -> Result<()> {
        self.shared.state.lock().source.set_seconds(seconds)
    }

    pub fn get_ticks_at_time(&self, time: f64) -> f64 {
        self.shared.state.lock().source.get_ticks_at_time(time)
    }

    pub fn get_seconds_at_time(&self, time: f64) -> f64 {
        self.shared.state.lock().source.get_seconds_at_time(time)
    }

    pub fn set_ticks_at_time(&self, ticks: f64, time: f64) -> Result<()> {
        self.shared.state.lock().source.set_ticks_at_time(ticks, time)
    }

    pub fn get_time_of_tick(&self, tick: f64, before: f64) -> f64 {
        self.shared.state.lock().source.get_time_of_tick(tick, before)
    }

    /// Time `offset` ticks after the tick count at `when`.
    pub fn next_tick_time(&self, offset: f64, when: f64) -> f64 {
        let state = self.shared.state.lock();
        let current = state.source.get_ticks_at_time(when);
        state.source.get_time_of_tick(current + offset, when)
    }

    /// End of the last processed window.
    pub fn last_update(&self) -> f64 {
        self.shared.state.lock().last_update
    }

    /// Ticks skipped by catch-up since creation.
    pub fn missed_ticks(&self) -> u64 {
        self.shared.missed_ticks.load(Ordering::Relaxed)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.shared.disposed.get() {
            return Err(Error::Disposed);
        }
        Ok(())
    }

    fn transition<F>(&self, target: PlaybackState, time: f64, apply: F) -> Result<&Self>
    where
        F: FnOnce(&mut TickSource) -> Result<bool>,
    {
        self.ensure_live()?;
        let mut state = self.shared.state.lock();
        if apply(&mut state.source)? && time < state.last_update {
            tracing::debug!(
                "{:?} at {:.6} is behind the processed window ({:.6}), reporting next turn",
                target,
                time,
                state.last_update
            );
            state.late.push(StateEvent::new(target, time));
        }
        Ok(self)
    }
}

impl Disposable for Clock {
    fn dispose(&mut self) {
        if self.shared.disposed.swap(true) {
            return;
        }
        let mut state = self.shared.state.lock();
        state.callback = None;
        state.listeners.clear();
        state.late.clear();
    }

    fn is_disposed(&self) -> bool {
        self.shared.disposed.get()
    }
}

impl core::fmt::Debug for Clock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Clock")
            .field("source", &state.source)
            .field("last_update", &state.last_update)
            .field("disposed", &self.shared.disposed.get())
            .finish()
    }
}

impl ClockShared {
    fn event_for(source: &TickSource, event: &StateEvent) -> Option<ClockEvent> {
        match event.state {
            PlaybackState::Started => Some(ClockEvent::Started {
                time: event.time,
                offset: source.get_ticks_at_time(event.time),
            }),
            // The initial state is not a transition
            PlaybackState::Stopped if event.time == 0.0 => None,
            PlaybackState::Stopped => Some(ClockEvent::Stopped { time: event.time }),
            PlaybackState::Paused => Some(ClockEvent::Paused { time: event.time }),
        }
    }
}

impl Scheduled for ClockShared {
    fn process(&self, turn: &Turn) {
        if self.disposed.get() {
            return;
        }

        let (events, ticks, callback, listeners) = {
            let mut state = self.state.lock();
            let start = state.last_update;
            let end = turn.horizon;
            if end <= start && state.late.is_empty() {
                return;
            }
            state.last_update = start.max(end);

            let late = std::mem::take(&mut state.late);
            let source = &state.source;
            let mut events: Vec<ClockEvent> = late
                .iter()
                .filter_map(|e| Self::event_for(source, e))
                .collect();
            events.extend(
                source
                    .state_timeline()
                    .between(start, end)
                    .iter()
                    .filter_map(|e| Self::event_for(source, e)),
            );

            let mut tick_start = start;
            let missed_before = turn.now - turn.catch_up_threshold;
            if start < missed_before {
                let missed = source.count_ticks_between(start, turn.now);
                if missed > 0 {
                    tracing::warn!(
                        "Clock fell {:.3}s behind, dropping {} ticks",
                        turn.now - start,
                        missed
                    );
                    self.missed_ticks.fetch_add(missed, Ordering::Relaxed);
                }
                tick_start = turn.now;
            }

            let mut ticks = Vec::new();
            source.for_each_tick_between(tick_start, end, |time, tick| ticks.push((time, tick)));

            (events, ticks, state.callback.clone(), state.listeners.clone())
        };

        for event in &events {
            for listener in &listeners {
                listener(event);
            }
        }
        if let Some(callback) = callback {
            for (time, tick) in ticks {
                callback(time, tick);
            }
        }
    }

    fn prune(&self, now: f64) {
        let removed = self.state.lock().source.prune(now);
        if removed > 0 {
            tracing::trace!("Clock pruned {} events before {:.6}", removed, now);
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tactus_core::{LookAhead, ManualTime};

    fn setup(look_ahead: f64) -> (Context, Arc<ManualTime>) {
        let time = Arc::new(ManualTime::new(0.0));
        let ctx = Context::builder()
            .look_ahead(LookAhead::Fixed(look_ahead))
            .catch_up_threshold(4.0)
            .time_source(time.clone())
            .build()
            .unwrap();
        (ctx, time)
    }

    fn recording_clock(ctx: &Context, frequency: f64) -> (Clock, Arc<Mutex<Vec<(f64, u64)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let clock = Clock::new(ctx, frequency, move |time, tick| sink.lock().push((time, tick)));
        (clock, seen)
    }

    #[test]
    fn test_ticks_across_turns() {
        let (ctx, time) = setup(0.0);
        let (clock, seen) = recording_clock(&ctx, 2.0);
        clock.start_at(0.0, None).unwrap();

        for t in [0.3, 0.7, 1.1] {
            time.set_time(t);
            ctx.pump();
        }
        assert_eq!(*seen.lock(), vec![(0.0, 0), (0.5, 1), (1.0, 2)]);
        assert_eq!(clock.last_update(), 1.1);
    }

    #[test]
    fn test_look_ahead_fires_early_with_exact_times() {
        let (ctx, time) = setup(0.5);
        let (clock, seen) = recording_clock(&ctx, 1.0);
        clock.start_at(1.0, None).unwrap();

        time.set_time(0.6);
        ctx.pump();
        assert_eq!(*seen.lock(), vec![(1.0, 0)]);
    }

    #[test]
    fn test_lifecycle_events_precede_ticks() {
        let (ctx, time) = setup(0.0);
        let order = Arc::new(Mutex::new(Vec::new()));
        let clock = Clock::with_options(&ctx, TickParamOptions::default());
        {
            let order = order.clone();
            clock.set_callback(move |t, _| order.lock().push(format!("tick {t}")));
        }
        {
            let order = order.clone();
            clock.on_event(move |e| order.lock().push(format!("{e:?}")));
        }
        clock.start_at(0.5, None).unwrap();
        clock.stop_at(1.6).unwrap();

        time.set_time(2.0);
        ctx.pump();
        let order = order.lock();
        assert_eq!(order[0], "Started { time: 0.5, offset: 0.0 }");
        assert_eq!(order[1], "Stopped { time: 1.6 }");
        assert_eq!(&order[2..], ["tick 0.5", "tick 1.5"]);
    }

    #[test]
    fn test_subscribe_reports_pause() {
        let (ctx, time) = setup(0.0);
        let clock = Clock::with_options(&ctx, TickParamOptions::default());
        let rx = clock.subscribe();
        clock.start_at(0.0, None).unwrap();
        clock.pause_at(0.25).unwrap();

        time.set_time(0.5);
        ctx.pump();
        let events: Vec<ClockEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                ClockEvent::Started {
                    time: 0.0,
                    offset: 0.0
                },
                ClockEvent::Paused { time: 0.25 },
            ]
        );
    }

    #[test]
    fn test_late_transition_reported_next_turn() {
        let (ctx, time) = setup(0.0);
        let clock = Clock::with_options(&ctx, TickParamOptions::default());
        let rx = clock.subscribe();

        time.set_time(1.0);
        ctx.pump();
        clock.start_at(0.5, None).unwrap();
        time.set_time(1.2);
        ctx.pump();

        let events: Vec<ClockEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].time(), 0.5);
    }

    #[test]
    fn test_catch_up_drops_missed_ticks() {
        let (ctx, time) = setup(0.0);
        let (clock, seen) = recording_clock(&ctx, 10.0);
        clock.start_at(0.0, None).unwrap();

        time.set_time(5.0);
        ctx.pump();
        assert!(seen.lock().is_empty());
        assert_eq!(clock.missed_ticks(), 50);

        time.set_time(5.25);
        ctx.pump();
        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].1, 50);
    }

    #[test]
    fn test_catch_up_after_long_gap() {
        let (ctx, time) = setup(0.0);
        let (clock, seen) = recording_clock(&ctx, 1000.0);
        clock.start_at(0.0, None).unwrap();

        time.set_time(3600.0);
        ctx.pump();
        assert!(seen.lock().is_empty());
        assert_eq!(clock.missed_ticks(), 3_600_000);

        time.set_time(3600.0005);
        ctx.pump();
        assert_eq!(*seen.lock(), vec![(3600.0, 3_600_000)]);
    }

    #[test]
    fn test_double_start_is_single_transition() {
        let (ctx, time) = setup(0.0);
        let clock = Clock::with_options(&ctx, TickParamOptions::default());
        let rx = clock.subscribe();
        clock.start_at(0.0, None).unwrap();
        clock.start_at(0.2, None).unwrap();

        time.set_time(1.0);
        ctx.pump();
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_next_tick_time() {
        let (ctx, _) = setup(0.0);
        let clock = Clock::with_options(
            &ctx,
            TickParamOptions {
                value: 4.0,
                ..Default::default()
            },
        );
        clock.start_at(0.0, None).unwrap();
        assert_eq!(clock.next_tick_time(1.0, 1.0), 1.25);
    }

    #[test]
    fn test_frequency_change_mid_run() {
        let (ctx, time) = setup(0.0);
        let (clock, seen) = recording_clock(&ctx, 1.0);
        clock.start_at(0.0, None).unwrap();
        clock.frequency().set_value_at_time(4.0, 2.0).unwrap();

        time.set_time(3.0);
        ctx.pump();
        let times: Vec<f64> = seen.lock().iter().map(|(t, _)| *t).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0, 2.25, 2.5, 2.75]);
    }

    #[test]
    fn test_dispose_unregisters() {
        let (ctx, time) = setup(0.0);
        let (mut clock, seen) = recording_clock(&ctx, 1.0);
        clock.start_at(0.0, None).unwrap();
        clock.dispose();
        assert!(clock.is_disposed());
        assert!(matches!(clock.start_at(1.0, None), Err(Error::Disposed)));

        time.set_time(2.0);
        ctx.pump();
        assert!(seen.lock().is_empty());
        assert_eq!(ctx.participant_count(), 0);
    }

    #[test]
    fn test_dropped_clock_leaves_context() {
        let (ctx, _) = setup(0.0);
        {
            let _clock = Clock::with_options(&ctx, TickParamOptions::default());
            assert_eq!(ctx.participant_count(), 1);
        }
        ctx.pump();
        assert_eq!(ctx.participant_count(), 0);
    }
}
