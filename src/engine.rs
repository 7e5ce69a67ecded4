//! TactusEngine: a scoped context plus the driver that pumps it.

use crate::{Result, TactusEngineBuilder};
use tactus_core::{CancelToken, Context, Disposable, ThreadDriver, TimeoutId};

#[cfg(feature = "automation")]
use tactus_automation::{Param, ParamOptions, TickParam, TickParamOptions};

#[cfg(feature = "transport")]
use tactus_transport::{Clock, TickSource};

/// Owns a [`Context`] and, while running, the driver thread pumping it.
///
/// Dropping the engine stops the driver and disposes the context, so every
/// clock and timeout created through it goes quiet.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tactus::prelude::*;
///
/// let time = Arc::new(ManualTime::new(0.0));
/// let engine = TactusEngine::builder()
///     .look_ahead(LookAhead::Fixed(0.0))
///     .time_source(time.clone())
///     .manual()
///     .build()
///     .unwrap();
///
/// let clock = engine.clock(2.0, |time, tick| println!("tick {tick} at {time}"));
/// clock.start_at(0.0, None).unwrap();
///
/// time.set_time(1.1);
/// engine.pump();
/// assert_eq!(clock.get_ticks_at_time(1.0), 2.0);
/// ```
pub struct TactusEngine {
    context: Context,
    driver: ThreadDriver,
    token: Option<CancelToken>,
}

impl TactusEngine {
    pub fn builder() -> TactusEngineBuilder {
        TactusEngineBuilder::default()
    }

    pub(crate) fn from_parts(context: Context, driver: ThreadDriver) -> Self {
        Self {
            context,
            driver,
            token: None,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn current_time(&self) -> f64 {
        self.context.current_time()
    }

    /// Current time plus look-ahead.
    pub fn now(&self) -> f64 {
        self.context.now()
    }

    pub fn look_ahead(&self) -> f64 {
        self.context.look_ahead()
    }

    pub fn is_running(&self) -> bool {
        self.token.is_some()
    }

    /// Start the driver thread. No-op if already running.
    pub fn start(&mut self) -> Result<()> {
        if self.token.is_some() {
            return Ok(());
        }
        let token = self.context.run(&self.driver)?;
        tracing::debug!("Engine driver started");
        self.token = Some(token);
        Ok(())
    }

    /// Stop and join the driver thread.
    pub fn stop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
            tracing::debug!("Engine driver stopped");
        }
    }

    /// Run one scheduling turn on the calling thread.
    pub fn pump(&self) {
        self.context.pump();
    }

    pub fn set_timeout<F>(&self, callback: F, delay: f64) -> Result<TimeoutId>
    where
        F: FnOnce() + Send + 'static,
    {
        Ok(self.context.set_timeout(callback, delay)?)
    }

    pub fn clear_timeout(&self, id: TimeoutId) -> bool {
        self.context.clear_timeout(id)
    }

    #[cfg(feature = "automation")]
    pub fn param(&self, options: ParamOptions) -> Param {
        Param::new(&self.context, options)
    }

    #[cfg(feature = "automation")]
    pub fn tick_param(&self, options: TickParamOptions) -> TickParam {
        TickParam::new(&self.context, options)
    }

    #[cfg(feature = "transport")]
    pub fn tick_source(&self, frequency: f64) -> TickSource {
        TickSource::new(&self.context, frequency)
    }

    /// Clock registered with this engine's loop.
    #[cfg(feature = "transport")]
    pub fn clock<F>(&self, frequency: f64, callback: F) -> Clock
    where
        F: Fn(f64, u64) + Send + Sync + 'static,
    {
        Clock::new(&self.context, frequency, callback)
    }
}

impl Drop for TactusEngine {
    fn drop(&mut self) {
        self.stop();
        self.context.dispose();
    }
}

impl core::fmt::Debug for TactusEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TactusEngine")
            .field("context", &self.context)
            .field("running", &self.is_running())
            .finish()
    }
}
