//! Scheduling context configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// How far ahead of the audio clock the scheduling loop commits events.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum LookAhead {
    /// Follow the smoothed driver invocation period.
    #[default]
    Auto,
    /// Fixed horizon in seconds. Bypasses smoothing.
    Fixed(f64),
}

/// Configuration for a scheduling [`Context`](crate::Context).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub look_ahead: LookAhead,
    /// Polling period hint for the periodic driver, in seconds.
    pub update_interval: f64,
    /// Weight of the previous smoothed interval (`0.97` keeps 97%).
    pub smoothing: f64,
    /// Ticks further than this in the past are dropped instead of rapid-fired.
    pub catch_up_threshold: f64,
    /// Coarse period for timeline pruning, in seconds.
    pub prune_interval: f64,
    /// Default event cap for automation timelines.
    pub timeline_memory: Option<usize>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            look_ahead: LookAhead::Auto,
            update_interval: 0.03,
            smoothing: 0.97,
            catch_up_threshold: 0.5,
            prune_interval: 1.0,
            timeline_memory: None,
        }
    }
}

impl ContextConfig {
    pub fn validate(&self) -> Result<()> {
        if let LookAhead::Fixed(seconds) = self.look_ahead {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "look_ahead {} must be finite and non-negative",
                    seconds
                )));
            }
        }
        if !(self.update_interval > 0.0 && self.update_interval <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "update_interval {} out of range (0-1 s]",
                self.update_interval
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(Error::InvalidConfig(format!(
                "smoothing {} out of range [0-1)",
                self.smoothing
            )));
        }
        if !(self.catch_up_threshold > 0.0 && self.catch_up_threshold.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "catch_up_threshold {} must be positive",
                self.catch_up_threshold
            )));
        }
        if !(self.prune_interval > 0.0 && self.prune_interval.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "prune_interval {} must be positive",
                self.prune_interval
            )));
        }
        if let Some(memory) = self.timeline_memory {
            if memory < 2 {
                return Err(Error::InvalidConfig(format!(
                    "timeline_memory {} must keep at least 2 events",
                    memory
                )));
            }
        }
        Ok(())
    }
}
