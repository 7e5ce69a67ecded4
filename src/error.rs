//! Centralized error type for the tactus umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] tactus_core::Error),

    #[cfg(feature = "automation")]
    #[error("Automation: {0}")]
    Automation(#[from] tactus_automation::Error),

    #[cfg(feature = "transport")]
    #[error("Transport: {0}")]
    Transport(#[from] tactus_transport::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
