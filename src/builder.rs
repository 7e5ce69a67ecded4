//! Builder for configuring and constructing a `TactusEngine`.

use crate::{Result, TactusEngine};
use std::sync::Arc;
use tactus_core::{Context, ContextBuilder, ContextConfig, LookAhead, ThreadDriver, TimeSource};

/// The driver thread starts on `build()` unless `.manual()` is set, in which
/// case the caller pumps the engine itself (offline rendering, tests).
///
/// # Example
///
/// ```
/// use tactus::prelude::*;
///
/// let engine = TactusEngine::builder()
///     .look_ahead(LookAhead::Fixed(0.1))
///     .manual()
///     .build()
///     .unwrap();
///
/// assert!(!engine.is_running());
/// ```
pub struct TactusEngineBuilder {
    context: ContextBuilder,
    driver_name: String,
    manual: bool,
}

impl Default for TactusEngineBuilder {
    fn default() -> Self {
        Self {
            context: Context::builder(),
            driver_name: "tactus-driver".to_string(),
            manual: false,
        }
    }
}

impl TactusEngineBuilder {
    /// Replace the whole context configuration.
    pub fn config(mut self, config: ContextConfig) -> Self {
        self.context = self.context.config(config);
        self
    }

    /// Default: `LookAhead::Auto`
    pub fn look_ahead(mut self, look_ahead: LookAhead) -> Self {
        self.context = self.context.look_ahead(look_ahead);
        self
    }

    /// Driver period in seconds. Default: 0.03
    pub fn update_interval(mut self, seconds: f64) -> Self {
        self.context = self.context.update_interval(seconds);
        self
    }

    /// Default: 0.5
    pub fn catch_up_threshold(mut self, seconds: f64) -> Self {
        self.context = self.context.catch_up_threshold(seconds);
        self
    }

    /// Audio time source. Default: wall clock.
    pub fn time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.context = self.context.time_source(time_source);
        self
    }

    /// Name of the driver thread.
    pub fn driver_name(mut self, name: impl Into<String>) -> Self {
        self.driver_name = name.into();
        self
    }

    /// Don't start a driver thread; call `TactusEngine::pump` instead.
    pub fn manual(mut self) -> Self {
        self.manual = true;
        self
    }

    pub fn build(self) -> Result<TactusEngine> {
        let context = self.context.build()?;
        let driver = ThreadDriver::new(self.driver_name);
        let mut engine = TactusEngine::from_parts(context, driver);
        if !self.manual {
            engine.start()?;
        }
        Ok(engine)
    }
}
