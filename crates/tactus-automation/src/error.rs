//! Error types for tactus-automation.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] tactus_core::Error),

    #[error("Exponential automation needs non-negative values, got {0}")]
    NegativeExponential(f64),

    #[error("Invalid time constant: {0}. Must be positive and finite")]
    InvalidTimeConstant(f64),

    #[error("Value curve needs at least 2 values, got {0}")]
    CurveTooShort(usize),

    #[error("Invalid duration: {0}. Must be positive and finite")]
    InvalidDuration(f64),

    #[error("Invalid value: {0}")]
    InvalidValue(f64),

    #[error("Parameter has been disposed")]
    Disposed,
}

pub type Result<T> = core::result::Result<T, Error>;
