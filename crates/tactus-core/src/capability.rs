//! Capability traits implemented by composition.
//!
//! - [`Scheduled`]: processed once per driver turn by a [`Context`](crate::Context)
//! - [`Automatable`]: holds an automation timeline that can be evaluated and pruned
//! - [`Disposable`]: explicit teardown

/// Window handed to every [`Scheduled`] participant on a driver turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Turn {
    /// Audio time when the turn started.
    pub now: f64,
    /// `now` plus the current look-ahead. Participants process up to here.
    pub horizon: f64,
    /// Anything due before `now - catch_up_threshold` counts as missed.
    pub catch_up_threshold: f64,
}

/// Participant in the scheduling loop.
pub trait Scheduled: Send + Sync {
    /// Fire everything due in this participant's unprocessed window ending at `turn.horizon`.
    fn process(&self, turn: &Turn);

    /// Drop history no longer reachable from `now`.
    fn prune(&self, _now: f64) {}

    /// Disposed participants are dropped from the context.
    fn is_disposed(&self) -> bool {
        false
    }
}

/// Parameter with an evaluable automation schedule.
pub trait Automatable {
    fn value_at_time(&self, time: f64) -> f64;

    /// Returns the number of removed events.
    fn prune(&mut self, now: f64) -> usize;
}

pub trait Disposable {
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;
}
