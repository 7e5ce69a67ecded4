//! # Tactus - Look-ahead Scheduling Core
//!
//! Sample-accurate scheduling for audio applications: events are stored on
//! timelines keyed by audio time and fired slightly ahead of when they must
//! sound, so a renderer can apply them exactly on time.
//!
//! ## Architecture
//!
//! Tactus is an umbrella crate that coordinates:
//! - **tactus-core** - Timelines, playback state, context, periodic drivers
//! - **tactus-automation** - Automation curves, `Param`, `TickParam`, renderer sinks
//! - **tactus-transport** - `TickSource` and the look-ahead `Clock`
//!
//! ## Quick Start
//!
//! ```no_run
//! use tactus::prelude::*;
//!
//! let engine = TactusEngine::builder().build()?;
//!
//! let clock = engine.clock(4.0, |time, tick| {
//!     // schedule a note on the renderer at `time`
//!     let _ = (time, tick);
//! });
//! clock.start()?;
//!
//! let mut gain = engine.param(ParamOptions::default().value(0.0));
//! gain.linear_ramp_to(1.0, 0.5, None)?;
//! # Ok::<(), tactus::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Automation and transport
//! - `automation` - `Param`, `TickParam` and automation sinks
//! - `transport` - `TickSource` and `Clock` (implies `automation`)

/// Re-export of tactus-core for direct access
pub use tactus_core as core;

// Core types
pub use tactus_core::{
    check_time,
    // Lock-free primitives
    AtomicDouble,
    AtomicFlag,

    // Capabilities
    Automatable,
    // Context and drivers
    CancelToken,
    Context,
    ContextBuilder,
    ContextConfig,
    Disposable,
    LagCompensator,
    LookAhead,
    ManualTime,
    PeriodicDriver,

    // Timelines
    PlaybackState,
    Scheduled,
    StateEvent,
    ThreadDriver,
    TimeSource,
    Timeline,
    TimelineEvent,
    TimelineState,
    TimeoutId,
    Turn,
    WallClock,
};

// Automation subsystem
#[cfg(feature = "automation")]
pub use tactus_automation as automation;

#[cfg(feature = "automation")]
pub use tactus_automation::{
    AutomationCommand, AutomationEvent, AutomationKind, AutomationSink, ChannelSink, Param,
    ParamOptions, TickParam, TickParamOptions, MIN_OUTPUT,
};

// Transport subsystem
#[cfg(feature = "transport")]
pub use tactus_transport as transport;

#[cfg(feature = "transport")]
pub use tactus_transport::{Clock, ClockEvent, TickOffset, TickSource};

mod builder;
mod engine;
mod error;

pub use builder::TactusEngineBuilder;
pub use engine::TactusEngine;
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    // Main engine
    pub use crate::{TactusEngine, TactusEngineBuilder};

    // Context and time
    pub use crate::core::{
        Context, ContextConfig, Disposable, LookAhead, ManualTime, PlaybackState, TimeSource,
    };

    // Automation
    #[cfg(feature = "automation")]
    pub use crate::automation::{ChannelSink, Param, ParamOptions, TickParam};

    // Transport
    #[cfg(feature = "transport")]
    pub use crate::transport::{Clock, ClockEvent, TickSource};
}
