//! Test helpers and fixtures for Tactus integration tests
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `CURVE_EPSILON` (1e-12): closed-form automation values
//! - `TICK_EPSILON` (1e-9): integrated tick positions
//! - `LOOSE_EPSILON` (1e-6): hand-computed reference constants

#![allow(dead_code)]

pub mod tolerances;

use std::sync::{Arc, Mutex};
use tactus::prelude::*;

/// Route library logs to the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Engine pumped by hand on a manual time source starting at 0.
pub fn manual_engine(look_ahead: f64) -> (TactusEngine, Arc<ManualTime>) {
    let time = Arc::new(ManualTime::new(0.0));
    let engine = TactusEngine::builder()
        .look_ahead(LookAhead::Fixed(look_ahead))
        .time_source(time.clone())
        .manual()
        .build()
        .expect("Failed to create test engine");
    (engine, time)
}

/// Advance audio time to each instant in turn, pumping once per instant.
pub fn pump_at(engine: &TactusEngine, time: &ManualTime, instants: &[f64]) {
    for &t in instants {
        time.set_time(t);
        engine.pump();
    }
}

/// Pump every `step` seconds from the current time through `end`.
pub fn pump_until(engine: &TactusEngine, time: &ManualTime, end: f64, step: f64) {
    let mut t = engine.current_time();
    while t < end {
        t = (t + step).min(end);
        time.set_time(t);
        engine.pump();
    }
}

/// Shared log of `(time, tick)` callback invocations.
#[derive(Clone, Default)]
pub struct TickLog(Arc<Mutex<Vec<(f64, u64)>>>);

impl TickLog {
    pub fn record(&self) -> impl Fn(f64, u64) + Send + Sync + 'static {
        let log = self.0.clone();
        move |time, tick| log.lock().unwrap().push((time, tick))
    }

    pub fn ticks(&self) -> Vec<(f64, u64)> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}
