//! Tolerance levels for float comparisons.

/// Closed-form curve math evaluated the same way on both sides.
pub const CURVE_EPSILON: f64 = 1e-12;

/// Values reached through tick integration or exponential segments.
pub const TICK_EPSILON: f64 = 1e-9;

/// Comparisons against hand-computed constants such as `1 - e^-1`.
pub const LOOSE_EPSILON: f64 = 1e-6;
