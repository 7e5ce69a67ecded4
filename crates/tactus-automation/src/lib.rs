//! Parameter automation for Tactus.
//!
//! - [`Param`]: automation timeline evaluated with native-parameter curve math
//! - [`TickParam`]: rate parameter integrated into cumulative ticks
//! - [`AutomationSink`] / [`ChannelSink`]: mirror writes onto a renderer
//!
//! # Example
//!
//! ```
//! use tactus_automation::{ChannelSink, Param, ParamOptions};
//! use tactus_core::Context;
//!
//! let ctx = Context::builder().build().unwrap();
//! let (sink, rx) = ChannelSink::unbounded();
//!
//! let mut cutoff = Param::new(&ctx, ParamOptions::default().value(440.0));
//! cutoff.attach_sink(sink);
//! cutoff.exponential_ramp_to_value_at_time(880.0, 2.0).unwrap();
//!
//! // Renderer side
//! let mut native = Param::new(&ctx, ParamOptions::default());
//! for command in rx.try_iter() {
//!     native.apply_command(&command).unwrap();
//! }
//! assert_eq!(native.value_at_time(1.0), cutoff.value_at_time(1.0));
//! ```

pub mod curve;
mod error;
mod event;
mod param;
mod sink;
mod tick_param;

pub use curve::MIN_OUTPUT;
pub use error::{Error, Result};
pub use event::{value_at, AutomationEvent, AutomationKind};
pub use param::{Param, ParamOptions};
pub use sink::{AutomationCommand, AutomationSink, ChannelSink};
pub use tick_param::{TickParam, TickParamOptions};
