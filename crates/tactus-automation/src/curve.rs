//! Closed-form automation curves.
//!
//! Host-side evaluation and renderer-side replay both go through these, so
//! the two can never disagree.

/// Floor for exponential curves. Zero endpoints are clamped to this on both
/// the write and the read path.
pub const MIN_OUTPUT: f64 = 1e-7;

/// Clamp a value into the domain of exponential interpolation.
#[inline]
pub fn clamp_exponential(value: f64) -> f64 {
    value.max(MIN_OUTPUT)
}

/// `v(t) = v0 + (v1 - v0) * (t - t0) / (t1 - t0)`
#[inline]
pub fn linear_ramp(t0: f64, v0: f64, t1: f64, v1: f64, time: f64) -> f64 {
    if t1 <= t0 {
        return v1;
    }
    let phase = (time - t0) / (t1 - t0);
    v0 + (v1 - v0) * phase
}

/// `v(t) = v0 * (v1 / v0) ^ ((t - t0) / (t1 - t0))`
#[inline]
pub fn exponential_ramp(t0: f64, v0: f64, t1: f64, v1: f64, time: f64) -> f64 {
    if t1 <= t0 {
        return clamp_exponential(v1);
    }
    let v0 = clamp_exponential(v0);
    let v1 = clamp_exponential(v1);
    let phase = (time - t0) / (t1 - t0);
    v0 * (v1 / v0).powf(phase)
}

/// `v(t) = v1 + (v0 - v1) * e^(-(t - t0) / tau)`
#[inline]
pub fn exponential_approach(t0: f64, v0: f64, v1: f64, time_constant: f64, time: f64) -> f64 {
    v1 + (v0 - v1) * (-(time - t0) / time_constant).exp()
}

/// Time constant such that a target curve is within 0.5% of its goal after `ramp_time`.
#[inline]
pub fn approach_time_constant(ramp_time: f64) -> f64 {
    (ramp_time + 1.0).ln() / 200f64.ln()
}
