//! Periodic drivers for the scheduling loop.
//!
//! The loop only needs "call me back roughly every N seconds"; how that
//! happens (a sleeping thread, a timer wheel, a host callback) is behind
//! [`PeriodicDriver`].

use crate::error::Result;
use crate::lockfree::AtomicFlag;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

pub type DriverCallback = Box<dyn FnMut() + Send + 'static>;

pub trait PeriodicDriver {
    /// Invoke `callback` about every `interval` until the token is cancelled or dropped.
    fn request_periodic_callback(
        &self,
        interval: Duration,
        callback: DriverCallback,
    ) -> Result<CancelToken>;
}

/// Stops a periodic callback. Dropping the token cancels it.
pub struct CancelToken {
    cancelled: Arc<AtomicFlag>,
    handle: Option<JoinHandle<()>>,
}

impl CancelToken {
    pub fn new(cancelled: Arc<AtomicFlag>, handle: Option<JoinHandle<()>>) -> Self {
        Self { cancelled, handle }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    /// Cancel and wait for the driver to stop.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.cancelled.set(true);
        if let Some(handle) = self.handle.take() {
            // Joining from the driver thread itself would never return
            if handle.thread().id() != std::thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for CancelToken {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl core::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.cancelled.get())
            .finish()
    }
}

/// Background thread that sleeps between invocations.
#[derive(Debug, Clone)]
pub struct ThreadDriver {
    name: String,
}

impl ThreadDriver {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ThreadDriver {
    fn default() -> Self {
        Self::new("tactus-driver")
    }
}

impl PeriodicDriver for ThreadDriver {
    fn request_periodic_callback(
        &self,
        interval: Duration,
        mut callback: DriverCallback,
    ) -> Result<CancelToken> {
        let cancelled = Arc::new(AtomicFlag::new(false));
        let flag = Arc::clone(&cancelled);

        let handle = std::thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                tracing::debug!("Driver thread started ({:?} interval)", interval);
                while !flag.get() {
                    callback();
                    std::thread::sleep(interval);
                }
                tracing::debug!("Driver thread stopped");
            })?;

        Ok(CancelToken::new(cancelled, Some(handle)))
    }
}
