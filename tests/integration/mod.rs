//! Integration test modules for Tactus
//!
//! - automation: `Param` curves, cancel-and-hold, renderer mirroring
//! - clock: tick delivery through the context loop
//! - scheduling: context turns, timeouts, engine lifecycle

pub mod automation;
pub mod clock;
pub mod scheduling;
