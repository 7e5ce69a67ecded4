//! Error types for tactus-core.

use thiserror::Error;

/// Error type for tactus-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid time: {0}. Must be finite and non-negative")]
    InvalidTime(f64),

    #[error("Event at {time} is earlier than the last scheduled time {last}")]
    NonMonotonicInsert { time: f64, last: f64 },

    #[error("Context has been disposed")]
    Disposed,

    #[error("Failed to spawn driver thread: {0}")]
    DriverSpawn(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Reject NaN, infinite and negative times.
#[inline]
pub fn check_time(time: f64) -> Result<f64> {
    if time.is_finite() && time >= 0.0 {
        Ok(time)
    } else {
        Err(Error::InvalidTime(time))
    }
}
