//! Rate parameter that integrates into ticks.
//!
//! A [`TickParam`] is a [`Param`] whose value is a rate (ticks per second,
//! after the `multiplier`). Every stored event carries the cumulative tick
//! count at its time. Exponential ramps and targets are decomposed into a
//! bounded number of linear segments, so between two events the rate is
//! either constant or linear and the tick integral is exact (trapezoid) and
//! invertible (quadratic).

use crate::curve::{clamp_exponential, exponential_approach, exponential_ramp, linear_ramp};
use crate::error::{Error, Result};
use crate::event::{AutomationEvent, AutomationKind};
use crate::param::{Param, ParamOptions};
use crate::sink::AutomationSink;
use tactus_core::{check_time, Automatable, Context};

/// Linear segments per second when decomposing exponential ramps.
const SEGMENTS_PER_SECOND: f64 = 10.0;

/// Upper bound on the segments one exponential ramp expands into.
const MAX_RAMP_SEGMENTS: usize = 256;

/// Time constants a target approach is segmented over. The residual after
/// that is `e^-10` of the initial distance.
const TARGET_TIME_CONSTANTS: usize = 10;

/// Linear segments per time constant of a target approach.
const TARGET_SEGMENTS_PER_CONSTANT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickParamOptions {
    /// Rate in user units, e.g. beats per minute.
    pub value: f64,
    /// Converts user units into ticks per second.
    pub multiplier: f64,
    pub memory: Option<usize>,
}

impl Default for TickParamOptions {
    fn default() -> Self {
        Self {
            value: 1.0,
            multiplier: 1.0,
            memory: None,
        }
    }
}

#[derive(Debug)]
pub struct TickParam {
    param: Param,
    multiplier: f64,
}

impl TickParam {
    pub fn new(ctx: &Context, options: TickParamOptions) -> Self {
        let mut param = Param::new(
            ctx,
            ParamOptions {
                value: options.value,
                default_value: options.value,
                memory: options.memory,
                ..Default::default()
            },
        );
        // Tick integration must only drop history its owner no longer queries
        param.set_auto_prune(false);
        param
            .timeline_mut()
            .insert(AutomationEvent::set(options.value, 0.0));

        Self {
            param,
            multiplier: options.multiplier,
        }
    }

    pub fn with_rate(ctx: &Context, value: f64) -> Self {
        Self::new(
            ctx,
            TickParamOptions {
                value,
                ..Default::default()
            },
        )
    }

    pub fn attach_sink(&mut self, sink: impl AutomationSink + 'static) {
        self.param.attach_sink(sink);
    }

    pub fn context(&self) -> &Context {
        self.param.context()
    }

    pub fn events(&self) -> &[AutomationEvent] {
        self.param.events()
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Change the unit conversion, re-integrating the whole schedule.
    pub fn set_multiplier(&mut self, multiplier: f64) -> Result<()> {
        if !(multiplier > 0.0 && multiplier.is_finite()) {
            return Err(Error::InvalidValue(multiplier));
        }
        self.multiplier = multiplier;
        self.update_ticks_from(f64::NEG_INFINITY);
        Ok(())
    }

    pub fn value(&self) -> f64 {
        self.param.value()
    }

    pub fn set_value(&mut self, value: f64) -> Result<()> {
        let now = self.context().now();
        self.param.set_value(value)?;
        self.update_ticks_from(now);
        Ok(())
    }

    pub fn value_at_time(&self, time: f64) -> f64 {
        self.param.value_at_time(time)
    }

    pub fn set_value_at_time(&mut self, value: f64, time: f64) -> Result<&mut Self> {
        self.param.set_value_at_time(value, time)?;
        self.update_ticks_from(time);
        Ok(self)
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f64, time: f64) -> Result<&mut Self> {
        let from = self.context().current_time().min(time);
        self.param.linear_ramp_to_value_at_time(value, time)?;
        self.update_ticks_from(from);
        Ok(self)
    }

    /// Exponential ramp, approximated with linear segments.
    pub fn exponential_ramp_to_value_at_time(
        &mut self,
        value: f64,
        time: f64,
    ) -> Result<&mut Self> {
        let time = check_time(time)?;
        if !(value >= 0.0 && value.is_finite()) {
            return Err(Error::NegativeExponential(value));
        }
        let start = self.ramp_anchor(time)?;
        if start.value < 0.0 {
            return Err(Error::NegativeExponential(start.value));
        }
        let value = clamp_exponential(value);

        let span = time - start.time;
        let segments =
            ((span * SEGMENTS_PER_SECOND).round() as usize).clamp(1, MAX_RAMP_SEGMENTS);
        let segment = span / segments as f64;
        for i in 1..=segments {
            let t = if i == segments {
                time
            } else {
                start.time + segment * i as f64
            };
            let v = exponential_ramp(start.time, start.value, time, value, t);
            self.param.linear_ramp_to_value_at_time(v, t)?;
        }
        self.update_ticks_from(start.time);
        Ok(self)
    }

    /// Exponential approach, approximated with a fixed number of linear
    /// segments spanning ten time constants. The rate holds after that.
    pub fn set_target_at_time(
        &mut self,
        value: f64,
        time: f64,
        time_constant: f64,
    ) -> Result<&mut Self> {
        let time = check_time(time)?;
        if !value.is_finite() {
            return Err(Error::InvalidValue(value));
        }
        if !(time_constant > 0.0 && time_constant.is_finite()) {
            return Err(Error::InvalidTimeConstant(time_constant));
        }

        self.param.set_ramp_point(time)?;
        let start = self.param.value_at_time(time);
        let segment = time_constant / TARGET_SEGMENTS_PER_CONSTANT as f64;
        for i in 1..=TARGET_TIME_CONSTANTS * TARGET_SEGMENTS_PER_CONSTANT {
            let t = time + segment * i as f64;
            let v = exponential_approach(time, start, value, time_constant, t);
            self.param.linear_ramp_to_value_at_time(v, t)?;
        }
        self.update_ticks_from(time);
        Ok(self)
    }

    pub fn set_value_curve_at_time(
        &mut self,
        values: &[f64],
        time: f64,
        duration: f64,
        scaling: f64,
    ) -> Result<&mut Self> {
        self.param
            .set_value_curve_at_time(values, time, duration, scaling)?;
        self.update_ticks_from(time);
        Ok(self)
    }

    pub fn cancel_scheduled_values(&mut self, time: f64) -> Result<&mut Self> {
        self.param.cancel_scheduled_values(time)?;
        Ok(self)
    }

    pub fn cancel_and_hold_at_time(&mut self, time: f64) -> Result<&mut Self> {
        self.param.cancel_and_hold_at_time(time)?;
        self.update_ticks_from(time);
        Ok(self)
    }

    pub fn set_ramp_point(&mut self, time: f64) -> Result<&mut Self> {
        self.param.set_ramp_point(time)?;
        self.update_ticks_from(time);
        Ok(self)
    }

    pub fn linear_ramp_to(
        &mut self,
        value: f64,
        ramp_time: f64,
        start_time: Option<f64>,
    ) -> Result<&mut Self> {
        let start = check_time(start_time.unwrap_or_else(|| self.context().now()))?;
        let ramp_time = check_time(ramp_time)?;
        self.set_ramp_point(start)?;
        self.linear_ramp_to_value_at_time(value, start + ramp_time)
    }

    pub fn exponential_ramp_to(
        &mut self,
        value: f64,
        ramp_time: f64,
        start_time: Option<f64>,
    ) -> Result<&mut Self> {
        let start = check_time(start_time.unwrap_or_else(|| self.context().now()))?;
        let ramp_time = check_time(ramp_time)?;
        self.set_ramp_point(start)?;
        self.exponential_ramp_to_value_at_time(value, start + ramp_time)
    }

    pub fn ramp_to(
        &mut self,
        value: f64,
        ramp_time: f64,
        start_time: Option<f64>,
    ) -> Result<&mut Self> {
        self.linear_ramp_to(value, ramp_time, start_time)
    }

    /// Cumulative ticks at `time`.
    pub fn get_ticks_at_time(&self, time: f64) -> f64 {
        let events = self.param.events();
        let Some(index) = events.partition_point(|e| e.time <= time).checked_sub(1) else {
            return time * self.rate(self.param.initial_value());
        };
        let event = &events[index];
        let r0 = self.rate(event.value);
        let r1 = match events.get(index + 1) {
            Some(next) if next.kind == AutomationKind::LinearRamp => {
                self.rate(linear_ramp(event.time, event.value, next.time, next.value, time))
            }
            _ => r0,
        };
        event.ticks + 0.5 * (time - event.time) * (r0 + r1)
    }

    /// Time at which the cumulative tick count reaches `tick`.
    ///
    /// Returns infinity if the rate stays at zero before reaching it.
    pub fn get_time_of_tick(&self, tick: f64) -> f64 {
        let events = self.param.events();
        let Some(index) = events.partition_point(|e| e.ticks <= tick).checked_sub(1) else {
            return time_at_rate(0.0, tick, self.rate(self.param.initial_value()));
        };
        let event = &events[index];
        if event.ticks == tick {
            let first = events.partition_point(|e| e.ticks < tick);
            return events[first].time;
        }

        let r0 = self.rate(event.value);
        let remaining = tick - event.ticks;
        if let Some(next) = events
            .get(index + 1)
            .filter(|n| n.kind == AutomationKind::LinearRamp && n.time > event.time)
        {
            // Solve r0*x + slope*x^2/2 = remaining, rationalized to stay stable as slope -> 0
            let slope = (self.rate(next.value) - r0) / (next.time - event.time);
            let discriminant = r0 * r0 + 2.0 * slope * remaining;
            if discriminant >= 0.0 {
                let denominator = r0 + discriminant.sqrt();
                if denominator > 0.0 {
                    return event.time + 2.0 * remaining / denominator;
                }
            }
        }
        event.time + time_at_rate(0.0, remaining, r0)
    }

    /// Seconds needed to advance `ticks` from `time`.
    pub fn get_duration_of_ticks(&self, ticks: f64, time: f64) -> f64 {
        let current = self.get_ticks_at_time(time);
        self.get_time_of_tick(current + ticks) - time
    }

    pub fn ticks_to_time(&self, ticks: f64, when: f64) -> f64 {
        self.get_duration_of_ticks(ticks, when)
    }

    /// Ticks elapsed over `duration` seconds starting at `when`.
    pub fn time_to_ticks(&self, duration: f64, when: f64) -> f64 {
        self.get_ticks_at_time(when + duration) - self.get_ticks_at_time(when)
    }

    pub fn prune(&mut self, horizon: f64) -> usize {
        self.param.prune(horizon)
    }

    #[inline]
    fn rate(&self, value: f64) -> f64 {
        value * self.multiplier
    }

    /// Event an exponential ramp ending at `end` starts from, anchoring one if needed.
    fn ramp_anchor(&mut self, end: f64) -> Result<AutomationEvent> {
        if let Some(event) = self
            .param
            .events()
            .iter()
            .rev()
            .find(|e| e.time <= end)
            .copied()
        {
            return Ok(event);
        }
        let time = self.context().current_time().min(end);
        let value = self.param.value_at_time(time);
        self.param.set_value_at_time(value, time)?;
        Ok(AutomationEvent::set(value, time))
    }

    /// Recompute cumulative ticks of every event at or after `time`.
    fn update_ticks_from(&mut self, time: f64) {
        let initial = self.param.initial_value();
        let multiplier = self.multiplier;
        let timeline = self.param.timeline_mut();
        let index = timeline.as_slice().partition_point(|e| e.time < time);

        timeline.update_from(index, |head, event| {
            event.ticks = match head.last() {
                None => event.time * initial * multiplier,
                Some(prev) => {
                    let r0 = prev.value * multiplier;
                    let r1 = match event.kind {
                        AutomationKind::LinearRamp => event.value * multiplier,
                        _ => r0,
                    };
                    prev.ticks + 0.5 * (event.time - prev.time) * (r0 + r1)
                }
            };
        });
    }
}

impl Automatable for TickParam {
    fn value_at_time(&self, time: f64) -> f64 {
        TickParam::value_at_time(self, time)
    }

    fn prune(&mut self, now: f64) -> usize {
        TickParam::prune(self, now)
    }
}

#[inline]
fn time_at_rate(start: f64, ticks: f64, rate: f64) -> f64 {
    if rate > 0.0 {
        start + ticks / rate
    } else {
        f64::INFINITY
    }
}
