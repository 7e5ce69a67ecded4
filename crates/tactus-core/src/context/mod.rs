//! Explicit scheduling context.
//!
//! A [`Context`] ties together the authoritative audio time, the look-ahead
//! derived from driver lag, and every [`Scheduled`] participant. It is passed
//! to constructors explicitly; cloning yields another handle to the same
//! context.
//!
//! Each [`Context::pump`] is one serialized driver turn:
//!
//! 1. read the current audio time and measure the interval since the last turn
//! 2. update the smoothed lag and derive the look-ahead
//! 3. let every live participant process up to `now + look_ahead`
//! 4. fire due timeouts
//! 5. prune participant history every `prune_interval`

mod driver;
mod lag;
mod time_source;
mod timeout;

pub use driver::{CancelToken, DriverCallback, PeriodicDriver, ThreadDriver};
pub use lag::LagCompensator;
pub use time_source::{ManualTime, TimeSource, WallClock};
pub use timeout::TimeoutId;

use crate::capability::{Disposable, Scheduled, Turn};
use crate::config::{ContextConfig, LookAhead};
use crate::error::{check_time, Error, Result};
use crate::lockfree::{AtomicDouble, AtomicFlag};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use timeout::TimeoutQueue;

struct ContextInner {
    time_source: Arc<dyn TimeSource>,
    config: ContextConfig,
    lag: Mutex<LagCompensator>,
    look_ahead: AtomicDouble,
    participants: Mutex<Vec<Weak<dyn Scheduled>>>,
    timeouts: Mutex<TimeoutQueue>,
    last_prune: AtomicDouble,
    turn: Mutex<()>,
    disposed: AtomicFlag,
}

/// Handle to a scheduling context.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Create a context reading time from `time_source`.
    pub fn new(time_source: Arc<dyn TimeSource>, config: ContextConfig) -> Result<Self> {
        config.validate()?;
        let lag = LagCompensator::new(&config);
        let look_ahead = lag.look_ahead();
        let start = time_source.current_time();

        tracing::debug!(
            "Context created (look_ahead: {:?}, update_interval: {}s)",
            config.look_ahead,
            config.update_interval
        );

        Ok(Self {
            inner: Arc::new(ContextInner {
                time_source,
                config,
                lag: Mutex::new(lag),
                look_ahead: AtomicDouble::new(look_ahead),
                participants: Mutex::new(Vec::new()),
                timeouts: Mutex::new(TimeoutQueue::default()),
                last_prune: AtomicDouble::new(start),
                turn: Mutex::new(()),
                disposed: AtomicFlag::new(false),
            }),
        })
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    pub fn config(&self) -> &ContextConfig {
        &self.inner.config
    }

    /// Authoritative audio time.
    #[inline]
    pub fn current_time(&self) -> f64 {
        self.inner.time_source.current_time()
    }

    /// Audio time plus look-ahead: the earliest time a newly scheduled event can still honor.
    #[inline]
    pub fn now(&self) -> f64 {
        self.current_time() + self.look_ahead()
    }

    #[inline]
    pub fn look_ahead(&self) -> f64 {
        self.inner.look_ahead.get()
    }

    pub fn set_look_ahead(&self, look_ahead: LookAhead) -> Result<()> {
        if let LookAhead::Fixed(seconds) = look_ahead {
            check_time(seconds)?;
        }
        let mut lag = self.inner.lag.lock();
        lag.set_mode(look_ahead);
        self.inner.look_ahead.set(lag.look_ahead());
        Ok(())
    }

    /// Smoothed driver invocation interval in seconds.
    pub fn lag(&self) -> f64 {
        self.inner.lag.lock().smoothed()
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs_f64(self.inner.config.update_interval)
    }

    /// Register a participant. The context only holds a weak reference.
    pub fn register(&self, participant: Weak<dyn Scheduled>) {
        if self.is_disposed() {
            return;
        }
        self.inner.participants.lock().push(participant);
    }

    pub fn participant_count(&self) -> usize {
        let mut participants = self.inner.participants.lock();
        participants.retain(|p| p.upgrade().is_some_and(|p| !p.is_disposed()));
        participants.len()
    }

    /// Run `callback` once the loop's horizon reaches `now() + delay`.
    pub fn set_timeout<F>(&self, callback: F, delay: f64) -> Result<TimeoutId>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_disposed() {
            return Err(Error::Disposed);
        }
        let delay = check_time(delay)?;
        let time = self.now() + delay;
        Ok(self.inner.timeouts.lock().schedule(time, Box::new(callback)))
    }

    /// Cancel a pending timeout. Returns `false` if it already fired or never existed.
    pub fn clear_timeout(&self, id: TimeoutId) -> bool {
        self.inner.timeouts.lock().clear(id)
    }

    pub fn pending_timeouts(&self) -> usize {
        self.inner.timeouts.lock().len()
    }

    /// Run one driver turn.
    pub fn pump(&self) {
        if self.is_disposed() {
            return;
        }
        let _turn = self.inner.turn.lock();

        let now = self.current_time();
        let look_ahead = {
            let mut lag = self.inner.lag.lock();
            lag.observe(now)
        };
        self.inner.look_ahead.set(look_ahead);

        let turn = Turn {
            now,
            horizon: now + look_ahead,
            catch_up_threshold: self.inner.config.catch_up_threshold,
        };
        tracing::trace!("Driver turn at {:.6} (horizon {:.6})", now, turn.horizon);

        let participants = self.live_participants();
        for participant in &participants {
            participant.process(&turn);
        }

        // Fire outside the lock so callbacks may schedule new timeouts
        let due = self.inner.timeouts.lock().take_due(turn.horizon);
        for timeout in due {
            timeout.fire();
        }

        if now - self.inner.last_prune.get() >= self.inner.config.prune_interval {
            self.inner.last_prune.set(now);
            for participant in &participants {
                participant.prune(now);
            }
        }
    }

    /// Attach this context to a periodic driver.
    ///
    /// The driver holds only a weak reference; dropping every context handle
    /// turns further invocations into no-ops.
    pub fn run(&self, driver: &dyn PeriodicDriver) -> Result<CancelToken> {
        if self.is_disposed() {
            return Err(Error::Disposed);
        }
        let weak = Arc::downgrade(&self.inner);
        driver.request_periodic_callback(
            self.update_interval(),
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Context { inner }.pump();
                }
            }),
        )
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    fn live_participants(&self) -> Vec<Arc<dyn Scheduled>> {
        let mut participants = self.inner.participants.lock();
        let mut live = Vec::with_capacity(participants.len());
        participants.retain(|weak| match weak.upgrade() {
            Some(p) if !p.is_disposed() => {
                live.push(p);
                true
            }
            _ => false,
        });
        live
    }
}

impl Disposable for Context {
    fn dispose(&mut self) {
        if self.inner.disposed.swap(true) {
            return;
        }
        self.inner.participants.lock().clear();
        self.inner.timeouts.lock().clear_all();
        tracing::debug!("Context disposed");
    }

    fn is_disposed(&self) -> bool {
        Context::is_disposed(self)
    }
}

impl core::fmt::Debug for Context {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Context")
            .field("current_time", &self.current_time())
            .field("look_ahead", &self.look_ahead())
            .field("config", &self.inner.config)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Fluent builder for [`Context`].
#[derive(Default)]
pub struct ContextBuilder {
    config: ContextConfig,
    time_source: Option<Arc<dyn TimeSource>>,
}

impl ContextBuilder {
    pub fn config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    pub fn look_ahead(mut self, look_ahead: LookAhead) -> Self {
        self.config.look_ahead = look_ahead;
        self
    }

    pub fn update_interval(mut self, seconds: f64) -> Self {
        self.config.update_interval = seconds;
        self
    }

    pub fn smoothing(mut self, smoothing: f64) -> Self {
        self.config.smoothing = smoothing;
        self
    }

    pub fn catch_up_threshold(mut self, seconds: f64) -> Self {
        self.config.catch_up_threshold = seconds;
        self
    }

    pub fn prune_interval(mut self, seconds: f64) -> Self {
        self.config.prune_interval = seconds;
        self
    }

    pub fn timeline_memory(mut self, memory: usize) -> Self {
        self.config.timeline_memory = Some(memory);
        self
    }

    /// Defaults to a [`WallClock`].
    pub fn time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = Some(time_source);
        self
    }

    pub fn build(self) -> Result<Context> {
        let time_source = self
            .time_source
            .unwrap_or_else(|| Arc::new(WallClock::new()));
        Context::new(time_source, self.config)
    }
}
