//! Scheduling kernel: timelines, playback state, and the driver context.
//!
//! # Primary API
//!
//! - [`Timeline`]: sorted event store with point/range queries and bounded memory
//! - [`TimelineState`]: Started/Stopped/Paused transitions over time
//! - [`Context`] / [`ContextBuilder`]: audio time, look-ahead and the scheduling loop
//! - [`PeriodicDriver`] / [`ThreadDriver`]: who calls [`Context::pump`]
//! - [`Scheduled`], [`Automatable`], [`Disposable`]: capability traits
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tactus_core::{Context, LookAhead, ManualTime};
//!
//! let time = Arc::new(ManualTime::new(0.0));
//! let ctx = Context::builder()
//!     .look_ahead(LookAhead::Fixed(0.1))
//!     .time_source(time.clone())
//!     .build()
//!     .unwrap();
//!
//! time.set_time(1.0);
//! ctx.pump();
//! assert_eq!(ctx.now(), 1.1);
//! ```

pub mod error;
pub use error::{check_time, Error, Result};

pub mod capability;
pub use capability::{Automatable, Disposable, Scheduled, Turn};

pub mod config;
pub use config::{ContextConfig, LookAhead};

mod context;
pub use context::{
    CancelToken, Context, ContextBuilder, DriverCallback, LagCompensator, ManualTime,
    PeriodicDriver, ThreadDriver, TimeSource, TimeoutId, WallClock,
};

pub(crate) mod lockfree;
pub use lockfree::{AtomicDouble, AtomicFlag};

pub mod timeline;
pub use timeline::{PlaybackState, StateEvent, Timeline, TimelineEvent, TimelineState};
