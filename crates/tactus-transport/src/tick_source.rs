//! Start/stop/pause-able tick counter over a variable rate.

use crate::error::{Error, Result};
use std::iter;
use tactus_automation::{TickParam, TickParamOptions};
use tactus_core::{
    check_time, Context, PlaybackState, StateEvent, Timeline, TimelineEvent, TimelineState,
};

/// Tick count (and elapsed seconds) pinned at a time by a seek or a stop.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickOffset {
    pub time: f64,
    pub ticks: f64,
    pub seconds: f64,
}

impl TimelineEvent for TickOffset {
    fn time(&self) -> f64 {
        self.time
    }
}

/// Converts elapsed time into ticks while Started.
///
/// Ticks accumulate by integrating `frequency` while Started, freeze while
/// Paused, and reset to 0 on stop. Seeks are recorded as [`TickOffset`]s.
#[derive(Debug)]
pub struct TickSource {
    frequency: TickParam,
    state: TimelineState,
    offsets: Timeline<TickOffset>,
}

impl TickSource {
    pub fn new(ctx: &Context, frequency: f64) -> Self {
        Self::with_options(
            ctx,
            TickParamOptions {
                value: frequency,
                ..Default::default()
            },
        )
    }

    pub fn with_options(ctx: &Context, options: TickParamOptions) -> Self {
        let mut offsets = Timeline::new();
        offsets.insert(TickOffset::default());
        Self {
            frequency: TickParam::new(ctx, options),
            state: TimelineState::new(PlaybackState::Stopped),
            offsets,
        }
    }

    pub fn context(&self) -> &Context {
        self.frequency.context()
    }

    pub fn frequency(&self) -> &TickParam {
        &self.frequency
    }

    pub fn frequency_mut(&mut self) -> &mut TickParam {
        &mut self.frequency
    }

    pub fn state_timeline(&self) -> &TimelineState {
        &self.state
    }

    /// State at the context's `now()`.
    pub fn state(&self) -> PlaybackState {
        self.get_state_at_time(self.context().now())
    }

    pub fn get_state_at_time(&self, time: f64) -> PlaybackState {
        self.state.get_value_at_time(time)
    }

    /// Start at `time`, optionally seeking to `offset` ticks. No-op if already started.
    ///
    /// Returns whether a transition was recorded.
    pub fn start(&mut self, time: f64, offset: Option<f64>) -> Result<bool> {
        let time = check_time(time)?;
        if self.state.get_value_at_time(time) == PlaybackState::Started {
            return Ok(false);
        }
        self.state.set_state_at_time(PlaybackState::Started, time);
        if let Some(offset) = offset {
            self.set_ticks_at_time(offset, time)?;
        }
        Ok(true)
    }

    /// Stop at `time` and reset ticks to 0. No-op if already stopped.
    pub fn stop(&mut self, time: f64) -> Result<bool> {
        let time = check_time(time)?;
        if self.state.get_value_at_time(time) == PlaybackState::Stopped {
            return Ok(false);
        }
        self.state.set_state_at_time(PlaybackState::Stopped, time);
        self.set_ticks_at_time(0.0, time)?;
        Ok(true)
    }

    /// Freeze ticks at `time`. Only takes effect while started.
    pub fn pause(&mut self, time: f64) -> Result<bool> {
        let time = check_time(time)?;
        if self.state.get_value_at_time(time) != PlaybackState::Started {
            return Ok(false);
        }
        self.state.set_state_at_time(PlaybackState::Paused, time);
        Ok(true)
    }

    /// Drop every transition and seek at or after `time`.
    pub fn cancel(&mut self, time: f64) -> Result<()> {
        let time = check_time(time)?;
        self.state.cancel(time);
        self.offsets.cancel(time);
        Ok(())
    }

    pub fn get_ticks_at_time(&self, time: f64) -> f64 {
        self.elapsed_at(
            time,
            |offset| offset.ticks,
            |from, to| {
                self.frequency.get_ticks_at_time(to) - self.frequency.get_ticks_at_time(from)
            },
        )
    }

    pub fn get_seconds_at_time(&self, time: f64) -> f64 {
        self.elapsed_at(time, |offset| offset.seconds, |from, to| to - from)
    }

    /// Seek: the tick count at `time` becomes `ticks`.
    pub fn set_ticks_at_time(&mut self, ticks: f64, time: f64) -> Result<()> {
        let time = check_time(time)?;
        if !(ticks.is_finite() && ticks >= 0.0) {
            return Err(Error::InvalidTicks(ticks));
        }
        let seconds = self.frequency.get_duration_of_ticks(ticks, time);
        self.offsets.cancel(time);
        self.offsets.insert(TickOffset {
            time,
            ticks,
            seconds,
        });
        Ok(())
    }

    /// Seek by elapsed seconds at the current rate.
    pub fn set_seconds_at_time(&mut self, seconds: f64, time: f64) -> Result<()> {
        let seconds = check_time(seconds)?;
        let ticks = self.frequency.time_to_ticks(seconds, time);
        self.set_ticks_at_time(ticks, time)
    }

    pub fn ticks(&self) -> f64 {
        self.get_ticks_at_time(self.context().now())
    }

    pub fn set_ticks(&mut self, ticks: f64) -> Result<()> {
        let now = self.context().now();
        self.set_ticks_at_time(ticks, now)
    }

    pub fn seconds(&self) -> f64 {
        self.get_seconds_at_time(self.context().now())
    }

    pub fn set_seconds(&mut self, seconds: f64) -> Result<()> {
        let now = self.context().now();
        self.set_seconds_at_time(seconds, now)
    }

    /// Time at which the tick count reaches `tick`, assuming the source keeps
    /// running from `before`.
    pub fn get_time_of_tick(&self, tick: f64, before: f64) -> f64 {
        let current = self.get_ticks_at_time(before);
        let absolute = self.frequency.get_ticks_at_time(before) + (tick - current);
        self.frequency.get_time_of_tick(absolute)
    }

    /// Invoke `f(time, tick)` for every whole tick in `[start, end)`.
    ///
    /// Ticks only occur while Started. `time` is the exact time the tick
    /// falls on, independent of the window bounds.
    pub fn for_each_tick_between<F>(&self, start: f64, end: f64, mut f: F)
    where
        F: FnMut(f64, u64),
    {
        self.for_each_started_period(start, end, |started_at, from, to| {
            self.ticks_in_period(started_at, from, to, &mut f);
        });
    }

    /// Number of ticks [`for_each_tick_between`](Self::for_each_tick_between)
    /// would report over `[start, end)`, without enumerating them.
    pub fn count_ticks_between(&self, start: f64, end: f64) -> u64 {
        let mut count = 0u64;
        self.for_each_started_period(start, end, |started_at, from, to| {
            let anchor = self.frequency.get_ticks_at_time(started_at);
            let first = self.grid_index_at(anchor, from);
            let past = self.grid_index_at(anchor, to);
            count += (past - first).max(0.0) as u64;
        });
        count
    }

    /// Drop history no query at or after `now` needs.
    pub fn prune(&mut self, now: f64) -> usize {
        let mut removed = self.state.prune(now);
        if let Some(first) = self.state.events().first().map(|e| e.time) {
            removed += self.offsets.prune(first);
            removed += self.frequency.prune(first);
        }
        removed
    }

    /// Ticks from the grid anchored at `started_at`, within `[from, to)`.
    ///
    /// Grid times are computed from the tick index alone so adjacent
    /// windows agree on which side of a bound each tick falls.
    fn ticks_in_period<F>(&self, started_at: f64, from: f64, to: f64, f: &mut F)
    where
        F: FnMut(f64, u64),
    {
        let anchor = self.frequency.get_ticks_at_time(started_at);
        let mut index = (self.frequency.get_ticks_at_time(from) - anchor).floor().max(0.0);
        loop {
            let next = self.frequency.get_time_of_tick(anchor + index);
            if !(next < to) {
                break;
            }
            if next >= from {
                let tick = self.get_ticks_at_time(next).round().max(0.0) as u64;
                f(next, tick);
            }
            index += 1.0;
        }
    }

    /// Invoke `f(started_at, from, to)` for each Started span clipped to `[start, end)`.
    fn for_each_started_period<F>(&self, start: f64, end: f64, mut f: F)
    where
        F: FnMut(f64, f64, f64),
    {
        if end <= start {
            return;
        }
        let mut last = self.state.get(start).copied();
        for event in self.state.between(start, end) {
            if let Some(prev) = last.filter(|p| p.state == PlaybackState::Started) {
                if event.state != PlaybackState::Started {
                    f(prev.time, start.max(prev.time), event.time);
                }
            }
            last = Some(*event);
        }
        if let Some(prev) = last.filter(|p| p.state == PlaybackState::Started) {
            f(prev.time, start.max(prev.time), end);
        }
    }

    /// Index of the first grid tick at or after `time`.
    fn grid_index_at(&self, anchor: f64, time: f64) -> f64 {
        let mut index = (self.frequency.get_ticks_at_time(time) - anchor).floor().max(0.0);
        while self.frequency.get_time_of_tick(anchor + index) < time {
            index += 1.0;
        }
        index
    }

    /// Walk transitions from the last stop up to `time`, closing with a
    /// virtual pause at `time`, and accumulate what elapsed while started.
    fn elapsed_at<O, M>(&self, time: f64, from_offset: O, measure: M) -> f64
    where
        O: Fn(&TickOffset) -> f64,
        M: Fn(f64, f64) -> f64,
    {
        let events = self.state.events();
        let end = events.partition_point(|e| e.time <= time);
        let (mut last, first) = match events[..end]
            .iter()
            .rposition(|e| e.state == PlaybackState::Stopped)
        {
            Some(index) => (events[index], index),
            None => (StateEvent::new(PlaybackState::Stopped, 0.0), 0),
        };

        let mut elapsed = 0.0;
        let closing = StateEvent::new(PlaybackState::Paused, time);
        for event in events[first..end].iter().copied().chain(iter::once(closing)) {
            let mut period_start = last.time;
            if let Some(offset) = self.offsets.get(event.time) {
                if offset.time >= last.time {
                    elapsed = from_offset(offset);
                    period_start = offset.time;
                }
            }
            if last.state == PlaybackState::Started && event.state != PlaybackState::Started {
                elapsed += measure(period_start, event.time);
            }
            last = event;
        }
        elapsed
    }
}
