//! Error types for tactus-transport.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] tactus_core::Error),

    #[error(transparent)]
    Automation(#[from] tactus_automation::Error),

    #[error("Invalid tick count: {0}")]
    InvalidTicks(f64),

    #[error("Clock has been disposed")]
    Disposed,
}

pub type Result<T> = core::result::Result<T, Error>;
