//! Driver lag measurement and look-ahead derivation.

use crate::config::{ContextConfig, LookAhead};

/// Exponentially smoothed driver invocation period.
///
/// With [`LookAhead::Auto`] the look-ahead follows the smoothed period so
/// events due before the next expected invocation are committed now.
#[derive(Debug, Clone)]
pub struct LagCompensator {
    mode: LookAhead,
    smoothing: f64,
    threshold: f64,
    smoothed: f64,
    last_invocation: Option<f64>,
}

impl LagCompensator {
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            mode: config.look_ahead,
            smoothing: config.smoothing,
            threshold: config.catch_up_threshold,
            smoothed: config.update_interval,
            last_invocation: None,
        }
    }

    /// Record an invocation at `now` and return the look-ahead to use.
    pub fn observe(&mut self, now: f64) -> f64 {
        if let Some(last) = self.last_invocation {
            let interval = now - last;
            if interval > self.threshold {
                // Backgrounded or stalled; don't let one outlier blow up the horizon
                tracing::warn!(
                    "Driver invoked {:.3}s after the previous turn (threshold {:.3}s)",
                    interval,
                    self.threshold
                );
            } else if interval > 0.0 {
                self.smoothed = self.smoothing * self.smoothed + (1.0 - self.smoothing) * interval;
            }
        }
        self.last_invocation = Some(now);
        self.look_ahead()
    }

    pub fn look_ahead(&self) -> f64 {
        match self.mode {
            LookAhead::Auto => self.smoothed,
            LookAhead::Fixed(seconds) => seconds,
        }
    }

    /// Smoothed invocation interval in seconds.
    pub fn smoothed(&self) -> f64 {
        self.smoothed
    }

    pub fn mode(&self) -> LookAhead {
        self.mode
    }

    pub fn set_mode(&mut self, mode: LookAhead) {
        self.mode = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_auto_tracks_smoothed_interval() {
        let config = ContextConfig {
            update_interval: 0.02,
            ..Default::default()
        };
        let mut lag = LagCompensator::new(&config);

        assert_relative_eq!(lag.observe(0.0), 0.02);
        // 0.97 * 0.02 + 0.03 * 0.05
        assert_relative_eq!(lag.observe(0.05), 0.0209, epsilon = 1e-12);
    }

    #[test]
    fn test_converges_to_steady_interval() {
        let mut lag = LagCompensator::new(&ContextConfig::default());
        let mut now = 0.0;
        for _ in 0..1000 {
            now += 0.01;
            lag.observe(now);
        }
        assert_relative_eq!(lag.smoothed(), 0.01, epsilon = 1e-6);
    }

    #[test]
    fn test_outliers_above_threshold_are_ignored() {
        let mut lag = LagCompensator::new(&ContextConfig::default());
        lag.observe(0.0);
        let before = lag.smoothed();
        lag.observe(10.0);
        assert_eq!(lag.smoothed(), before);
    }

    #[test]
    fn test_fixed_bypasses_smoothing() {
        let config = ContextConfig {
            look_ahead: LookAhead::Fixed(0.1),
            ..Default::default()
        };
        let mut lag = LagCompensator::new(&config);
        lag.observe(0.0);
        assert_eq!(lag.observe(0.01), 0.1);

        lag.set_mode(LookAhead::Auto);
        assert!(lag.look_ahead() < 0.1);
    }
}
