//! Tick sources and lookahead clocks for Tactus.
//!
//! - [`TickSource`]: tick counter over a variable rate with start/stop/pause
//! - [`Clock`]: tick source driven by the context loop, firing ahead of time
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use tactus_core::{Context, LookAhead, ManualTime};
//! use tactus_transport::Clock;
//!
//! let time = Arc::new(ManualTime::new(0.0));
//! let ctx = Context::builder()
//!     .look_ahead(LookAhead::Fixed(0.1))
//!     .time_source(time.clone())
//!     .build()
//!     .unwrap();
//!
//! let ticks = Arc::new(Mutex::new(Vec::new()));
//! let seen = ticks.clone();
//! let clock = Clock::new(&ctx, 4.0, move |time, tick| seen.lock().unwrap().push((time, tick)));
//! clock.start_at(0.0, None).unwrap();
//!
//! time.set_time(0.5);
//! ctx.pump();
//! assert_eq!(ticks.lock().unwrap().len(), 3);
//! ```

mod clock;
mod error;
mod tick_source;

pub use clock::{Clock, ClockEvent, ClockListener, TickCallback};
pub use error::{Error, Result};
pub use tick_source::{TickOffset, TickSource};
