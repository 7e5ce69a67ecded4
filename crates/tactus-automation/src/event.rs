//! Automation events and their evaluation.

use crate::curve::{exponential_approach, exponential_ramp, linear_ramp};
use serde::{Deserialize, Serialize};
use tactus_core::TimelineEvent;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AutomationKind {
    Set,
    LinearRamp,
    ExponentialRamp,
    Target { time_constant: f64 },
}

impl AutomationKind {
    #[inline]
    pub fn is_ramp(&self) -> bool {
        matches!(self, Self::LinearRamp | Self::ExponentialRamp)
    }
}

/// One scheduled automation instruction.
///
/// Ramps arrive at `value` exactly at `time`; `Set` and `Target` take
/// effect from `time` on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutomationEvent {
    pub kind: AutomationKind,
    pub time: f64,
    pub value: f64,
    /// Cumulative ticks at `time`. Only maintained by tick-rate parameters.
    #[serde(default)]
    pub ticks: f64,
}

impl AutomationEvent {
    pub fn set(value: f64, time: f64) -> Self {
        Self::new(AutomationKind::Set, value, time)
    }

    pub fn linear_ramp(value: f64, time: f64) -> Self {
        Self::new(AutomationKind::LinearRamp, value, time)
    }

    pub fn exponential_ramp(value: f64, time: f64) -> Self {
        Self::new(AutomationKind::ExponentialRamp, value, time)
    }

    pub fn target(value: f64, time: f64, time_constant: f64) -> Self {
        Self::new(AutomationKind::Target { time_constant }, value, time)
    }

    fn new(kind: AutomationKind, value: f64, time: f64) -> Self {
        Self {
            kind,
            time,
            value,
            ticks: 0.0,
        }
    }
}

impl TimelineEvent for AutomationEvent {
    fn time(&self) -> f64 {
        self.time
    }
}

/// Value of the schedule `events` at `time`, `initial` before the first event.
///
/// Only the event at or before `time` and the first one after it are
/// consulted, except when a `Target` needs its starting value, which is
/// resolved recursively from the events preceding it.
///
/// A `Target` followed by a ramp does not follow its approach curve: the
/// ramp starts from the value the `Target` started at, as a native audio
/// parameter does. Without a following ramp the approach curve applies.
pub fn value_at(events: &[AutomationEvent], initial: f64, time: f64) -> f64 {
    let split = events.partition_point(|e| e.time <= time);
    let Some(before_index) = split.checked_sub(1) else {
        return initial;
    };
    let before = &events[before_index];
    let after = events.get(split);

    match (before.kind, after) {
        (AutomationKind::Target { time_constant }, after)
            if after.map_or(true, |a| !a.kind.is_ramp()) =>
        {
            let start = value_at(&events[..before_index], initial, before.time);
            exponential_approach(before.time, start, before.value, time_constant, time)
        }
        (_, None) => before.value,
        (kind, Some(after)) if after.kind.is_ramp() => {
            let start = match kind {
                AutomationKind::Target { .. } => {
                    value_at(&events[..before_index], initial, before.time)
                }
                _ => before.value,
            };
            match after.kind {
                AutomationKind::ExponentialRamp => {
                    exponential_ramp(before.time, start, after.time, after.value, time)
                }
                _ => linear_ramp(before.time, start, after.time, after.value, time),
            }
        }
        _ => before.value,
    }
}
