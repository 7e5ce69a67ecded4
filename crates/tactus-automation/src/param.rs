//! Schedulable parameter.

use crate::curve::{approach_time_constant, clamp_exponential, MIN_OUTPUT};
use crate::error::{Error, Result};
use crate::event::{value_at, AutomationEvent, AutomationKind};
use crate::sink::{AutomationCommand, AutomationSink};
use tactus_core::{check_time, Automatable, Context, Disposable, Timeline};

/// Options for [`Param::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamOptions {
    /// Starting value. Scheduled as a set at time 0 when it differs from `default_value`.
    pub value: f64,
    /// Value before any automation, matching the renderer's intrinsic default.
    pub default_value: f64,
    /// Values outside `[min_value, max_value]` are accepted but logged.
    pub min_value: f64,
    pub max_value: f64,
    /// Event cap. Falls back to the context's `timeline_memory`.
    pub memory: Option<usize>,
}

impl Default for ParamOptions {
    fn default() -> Self {
        Self {
            value: 0.0,
            default_value: 0.0,
            min_value: f64::NEG_INFINITY,
            max_value: f64::INFINITY,
            memory: None,
        }
    }
}

impl ParamOptions {
    pub fn value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn range(mut self, min_value: f64, max_value: f64) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self
    }

    pub fn memory(mut self, memory: usize) -> Self {
        self.memory = Some(memory);
        self
    }
}

/// Automatable value evaluated with the same curves a native audio parameter uses.
///
/// Writes go into an automation [`Timeline`] and, when a sink is attached,
/// are mirrored to the renderer as native primitives.
///
/// # Example
///
/// ```
/// use tactus_automation::{Param, ParamOptions};
/// use tactus_core::Context;
///
/// let ctx = Context::builder().build().unwrap();
/// let mut param = Param::new(&ctx, ParamOptions::default());
///
/// param
///     .set_value_at_time(5.0, 1.0)
///     .unwrap()
///     .linear_ramp_to_value_at_time(10.0, 2.0)
///     .unwrap();
///
/// assert_eq!(param.value_at_time(1.5), 7.5);
/// ```
pub struct Param {
    ctx: Context,
    events: Timeline<AutomationEvent>,
    initial: f64,
    min_value: f64,
    max_value: f64,
    sink: Option<Box<dyn AutomationSink>>,
    auto_prune: bool,
    last_prune: f64,
    disposed: bool,
}

impl Param {
    pub fn new(ctx: &Context, options: ParamOptions) -> Self {
        let events = match options.memory.or(ctx.config().timeline_memory) {
            Some(memory) => Timeline::with_memory(memory),
            None => Timeline::new(),
        };
        let mut param = Self {
            ctx: ctx.clone(),
            events,
            initial: options.default_value,
            min_value: options.min_value,
            max_value: options.max_value,
            sink: None,
            auto_prune: true,
            last_prune: ctx.current_time(),
            disposed: false,
        };
        if options.value != options.default_value {
            param.schedule(AutomationEvent::set(options.value, 0.0));
        }
        param
    }

    /// Mirror all writes to `sink`, replaying the current schedule first.
    pub fn attach_sink(&mut self, sink: impl AutomationSink + 'static) {
        let mut sink: Box<dyn AutomationSink> = Box::new(sink);
        for event in self.events.iter() {
            sink.apply(&command_for(event));
        }
        self.sink = Some(sink);
    }

    pub fn detach_sink(&mut self) {
        self.sink = None;
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn initial_value(&self) -> f64 {
        self.initial
    }

    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn events(&self) -> &[AutomationEvent] {
        self.events.as_slice()
    }

    /// Value at the context's `now()`.
    pub fn value(&self) -> f64 {
        self.value_at_time(self.ctx.now())
    }

    /// Cancel everything from `now()` and hold `value` from there.
    pub fn set_value(&mut self, value: f64) -> Result<()> {
        let now = self.ctx.now();
        self.cancel_scheduled_values(now)?;
        self.set_value_at_time(value, now)?;
        Ok(())
    }

    pub fn value_at_time(&self, time: f64) -> f64 {
        self.events.note_query(time);
        value_at(self.events.as_slice(), self.initial, time)
    }

    pub fn set_value_at_time(&mut self, value: f64, time: f64) -> Result<&mut Self> {
        self.ensure_live()?;
        let time = check_time(time)?;
        let value = check_value(value)?;

        self.schedule(AutomationEvent::set(value, time));
        self.emit(AutomationCommand::SetValueAtTime { value, time });
        self.after_write();
        Ok(self)
    }

    /// Ramp linearly from the previous event's value, arriving at `value` at `time`.
    pub fn linear_ramp_to_value_at_time(&mut self, value: f64, time: f64) -> Result<&mut Self> {
        self.ensure_live()?;
        let time = check_time(time)?;
        let value = check_value(value)?;

        self.anchor_ramp(time);
        self.schedule(AutomationEvent::linear_ramp(value, time));
        self.emit(AutomationCommand::LinearRampToValueAtTime { value, time });
        self.after_write();
        Ok(self)
    }

    /// Ramp exponentially from the previous event's value.
    ///
    /// Both ends must be non-negative; zero is clamped to [`MIN_OUTPUT`].
    pub fn exponential_ramp_to_value_at_time(
        &mut self,
        value: f64,
        time: f64,
    ) -> Result<&mut Self> {
        self.ensure_live()?;
        let time = check_time(time)?;
        let value = check_value(value)?;
        if value < 0.0 {
            return Err(Error::NegativeExponential(value));
        }
        let start = self.ramp_start_value(time);
        if start < 0.0 {
            return Err(Error::NegativeExponential(start));
        }
        let value = clamp_exponential(value);

        self.anchor_ramp(time);
        self.schedule(AutomationEvent::exponential_ramp(value, time));
        self.emit(AutomationCommand::ExponentialRampToValueAtTime { value, time });
        self.after_write();
        Ok(self)
    }

    /// Approach `value` from `time` on with rate `1 / time_constant`.
    pub fn set_target_at_time(
        &mut self,
        value: f64,
        time: f64,
        time_constant: f64,
    ) -> Result<&mut Self> {
        self.ensure_live()?;
        let time = check_time(time)?;
        let value = check_value(value)?;
        if !(time_constant > 0.0 && time_constant.is_finite()) {
            return Err(Error::InvalidTimeConstant(time_constant));
        }

        self.schedule(AutomationEvent::target(value, time, time_constant));
        self.emit(AutomationCommand::SetTargetAtTime {
            value,
            time,
            time_constant,
        });
        self.after_write();
        Ok(self)
    }

    /// Stretch `values` (each multiplied by `scaling`) over `[time, time + duration]`.
    ///
    /// Stored as a set followed by evenly spaced linear ramps.
    pub fn set_value_curve_at_time(
        &mut self,
        values: &[f64],
        time: f64,
        duration: f64,
        scaling: f64,
    ) -> Result<&mut Self> {
        self.ensure_live()?;
        let time = check_time(time)?;
        if values.len() < 2 {
            return Err(Error::CurveTooShort(values.len()));
        }
        if !(duration > 0.0 && duration.is_finite()) {
            return Err(Error::InvalidDuration(duration));
        }
        let values = values
            .iter()
            .map(|v| check_value(v * scaling))
            .collect::<Result<Vec<_>>>()?;

        let segment = duration / (values.len() - 1) as f64;
        self.schedule(AutomationEvent::set(values[0], time));
        for (i, value) in values.iter().enumerate().skip(1) {
            self.schedule(AutomationEvent::linear_ramp(*value, time + segment * i as f64));
        }
        self.emit(AutomationCommand::SetValueCurveAtTime {
            values,
            time,
            duration,
        });
        self.after_write();
        Ok(self)
    }

    /// Remove every event at or after `time`.
    pub fn cancel_scheduled_values(&mut self, time: f64) -> Result<&mut Self> {
        self.ensure_live()?;
        let time = check_time(time)?;
        self.events.cancel(time);
        self.emit(AutomationCommand::CancelScheduledValues { time });
        Ok(self)
    }

    /// Freeze at the value the current schedule would have at `time`.
    ///
    /// A ramp that spans `time` is truncated to end there with the value it
    /// would have reached, so the trajectory up to `time` is unchanged.
    pub fn cancel_and_hold_at_time(&mut self, time: f64) -> Result<&mut Self> {
        self.ensure_live()?;
        let time = check_time(time)?;
        let value = self.value_at_time(time);

        let on_time = self.events.get(time).is_some_and(|e| e.time == time);
        let after = self.events.get_after(time).copied();

        if let Some(after) = after {
            self.events.cancel(after.time);
            self.emit(AutomationCommand::CancelScheduledValues { time: after.time });

            if !on_time {
                match after.kind {
                    AutomationKind::LinearRamp => {
                        self.schedule(AutomationEvent::linear_ramp(value, time));
                        self.emit(AutomationCommand::LinearRampToValueAtTime { value, time });
                    }
                    AutomationKind::ExponentialRamp => {
                        let value = clamp_exponential(value);
                        self.schedule(AutomationEvent::exponential_ramp(value, time));
                        self.emit(AutomationCommand::ExponentialRampToValueAtTime { value, time });
                    }
                    _ => {}
                }
            }
        }

        self.schedule(AutomationEvent::set(value, time));
        self.emit(AutomationCommand::SetValueAtTime { value, time });
        self.after_write();
        Ok(self)
    }

    /// Hold the current trajectory value at `time` so a ramp can start there.
    pub fn set_ramp_point(&mut self, time: f64) -> Result<&mut Self> {
        let time = check_time(time)?;
        let mut current = self.value_at_time(time);
        self.cancel_and_hold_at_time(time)?;
        if current == 0.0 {
            current = MIN_OUTPUT;
        }
        self.set_value_at_time(current, time)
    }

    /// Linear ramp from the value at `start_time` (default `now()`) over `ramp_time`.
    pub fn linear_ramp_to(
        &mut self,
        value: f64,
        ramp_time: f64,
        start_time: Option<f64>,
    ) -> Result<&mut Self> {
        let (start, ramp_time) = self.ramp_window(ramp_time, start_time)?;
        check_value(value)?;
        self.set_ramp_point(start)?;
        self.linear_ramp_to_value_at_time(value, start + ramp_time)
    }

    pub fn exponential_ramp_to(
        &mut self,
        value: f64,
        ramp_time: f64,
        start_time: Option<f64>,
    ) -> Result<&mut Self> {
        let (start, ramp_time) = self.ramp_window(ramp_time, start_time)?;
        if check_value(value)? < 0.0 {
            return Err(Error::NegativeExponential(value));
        }
        self.set_ramp_point(start)?;
        self.exponential_ramp_to_value_at_time(value, start + ramp_time)
    }

    /// Exponential approach that lands on `value` after `ramp_time`.
    pub fn target_ramp_to(
        &mut self,
        value: f64,
        ramp_time: f64,
        start_time: Option<f64>,
    ) -> Result<&mut Self> {
        let (start, ramp_time) = self.ramp_window(ramp_time, start_time)?;
        check_value(value)?;
        self.set_ramp_point(start)?;
        self.exponential_approach_value_at_time(value, start, ramp_time)
    }

    pub fn ramp_to(
        &mut self,
        value: f64,
        ramp_time: f64,
        start_time: Option<f64>,
    ) -> Result<&mut Self> {
        self.linear_ramp_to(value, ramp_time, start_time)
    }

    /// Target curve for 90% of `ramp_time`, then a linear finish onto `value`.
    pub fn exponential_approach_value_at_time(
        &mut self,
        value: f64,
        time: f64,
        ramp_time: f64,
    ) -> Result<&mut Self> {
        let time = check_time(time)?;
        let ramp_time = check_time(ramp_time)?;
        if ramp_time == 0.0 {
            return self.set_value_at_time(value, time);
        }
        self.set_target_at_time(value, time, approach_time_constant(ramp_time))?;
        self.cancel_and_hold_at_time(time + ramp_time * 0.9)?;
        self.linear_ramp_to_value_at_time(value, time + ramp_time)
    }

    /// Replay a mirrored command, e.g. on the renderer side of a [`ChannelSink`](crate::ChannelSink).
    pub fn apply_command(&mut self, command: &AutomationCommand) -> Result<()> {
        match command {
            AutomationCommand::SetValueAtTime { value, time } => {
                self.set_value_at_time(*value, *time)?;
            }
            AutomationCommand::LinearRampToValueAtTime { value, time } => {
                self.linear_ramp_to_value_at_time(*value, *time)?;
            }
            AutomationCommand::ExponentialRampToValueAtTime { value, time } => {
                self.exponential_ramp_to_value_at_time(*value, *time)?;
            }
            AutomationCommand::SetTargetAtTime {
                value,
                time,
                time_constant,
            } => {
                self.set_target_at_time(*value, *time, *time_constant)?;
            }
            AutomationCommand::SetValueCurveAtTime {
                values,
                time,
                duration,
            } => {
                self.set_value_curve_at_time(values, *time, *duration, 1.0)?;
            }
            AutomationCommand::CancelScheduledValues { time } => {
                self.cancel_scheduled_values(*time)?;
            }
        }
        Ok(())
    }

    /// Drop events no evaluation at or after `now` needs.
    ///
    /// Keeps the last event before `now`, plus whatever a `Target` there
    /// needs to resolve its starting value.
    pub fn prune(&mut self, now: f64) -> usize {
        let events = self.events.as_slice();
        let keep = events.partition_point(|e| e.time < now).saturating_sub(1);
        let keep = target_anchor(events, keep);
        self.events.prune_front(keep)
    }

    pub(crate) fn timeline_mut(&mut self) -> &mut Timeline<AutomationEvent> {
        &mut self.events
    }

    pub(crate) fn set_auto_prune(&mut self, enabled: bool) {
        self.auto_prune = enabled;
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    fn schedule(&mut self, event: AutomationEvent) {
        if event.value < self.min_value || event.value > self.max_value {
            tracing::warn!(
                "Automation value {} at {}s outside [{}, {}]",
                event.value,
                event.time,
                self.min_value,
                self.max_value
            );
        }
        self.events.insert_protecting(event, target_anchor);
    }

    fn emit(&mut self, command: AutomationCommand) {
        if let Some(sink) = self.sink.as_mut() {
            sink.apply(&command);
        }
    }

    fn after_write(&mut self) {
        if !self.auto_prune {
            return;
        }
        let now = self.ctx.current_time();
        if now - self.last_prune >= self.ctx.config().prune_interval {
            self.last_prune = now;
            let removed = self.prune(now);
            if removed > 0 {
                tracing::trace!("Pruned {} automation events before {:.3}s", removed, now);
            }
        }
    }

    /// Ramps need something to start from; without an earlier event, hold
    /// the current value from the current time.
    fn anchor_ramp(&mut self, end: f64) {
        if self.events.index_at_or_before(end).is_some() {
            return;
        }
        let time = self.ctx.current_time().min(end);
        let value = self.value_at_time(time);
        self.schedule(AutomationEvent::set(value, time));
        self.emit(AutomationCommand::SetValueAtTime { value, time });
    }

    /// Value a ramp ending at `end` would start from.
    fn ramp_start_value(&self, end: f64) -> f64 {
        match self.events.index_at_or_before(end) {
            Some(index) => {
                let events = &self.events.as_slice()[..=index];
                value_at(events, self.initial, events[index].time)
            }
            None => self.value_at_time(self.ctx.current_time().min(end)),
        }
    }

    fn ramp_window(&self, ramp_time: f64, start_time: Option<f64>) -> Result<(f64, f64)> {
        let start = check_time(start_time.unwrap_or_else(|| self.ctx.now()))?;
        let ramp_time = check_time(ramp_time)?;
        Ok((start, ramp_time))
    }
}

impl Automatable for Param {
    fn value_at_time(&self, time: f64) -> f64 {
        Param::value_at_time(self, time)
    }

    fn prune(&mut self, now: f64) -> usize {
        Param::prune(self, now)
    }
}

impl Disposable for Param {
    fn dispose(&mut self) {
        self.disposed = true;
        self.events.clear();
        self.sink = None;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl core::fmt::Debug for Param {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Param")
            .field("initial", &self.initial)
            .field("events", &self.events.len())
            .field("range", &(self.min_value..=self.max_value))
            .field("has_sink", &self.sink.is_some())
            .field("disposed", &self.disposed)
            .finish()
    }
}

fn check_value(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::InvalidValue(value))
    }
}

fn command_for(event: &AutomationEvent) -> AutomationCommand {
    let (value, time) = (event.value, event.time);
    match event.kind {
        AutomationKind::Set => AutomationCommand::SetValueAtTime { value, time },
        AutomationKind::LinearRamp => AutomationCommand::LinearRampToValueAtTime { value, time },
        AutomationKind::ExponentialRamp => {
            AutomationCommand::ExponentialRampToValueAtTime { value, time }
        }
        AutomationKind::Target { time_constant } => AutomationCommand::SetTargetAtTime {
            value,
            time,
            time_constant,
        },
    }
}

/// Walk `keep` back past `Target` events to the event their start value
/// resolves from.
fn target_anchor(events: &[AutomationEvent], mut keep: usize) -> usize {
    while keep > 0 && matches!(events[keep].kind, AutomationKind::Target { .. }) {
        keep -= 1;
    }
    keep
}
