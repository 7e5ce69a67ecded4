//! Scheduling loop integration tests
//!
//! Look-ahead derivation, one-shot timeouts and engine lifecycle.

use crate::helpers::*;
use approx::assert_relative_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tactus::prelude::*;

fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let hit = count.clone();
    (count, move || {
        hit.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn test_fixed_look_ahead_sets_horizon() {
    let (engine, time) = manual_engine(0.1);
    pump_at(&engine, &time, &[1.0]);

    assert_relative_eq!(engine.current_time(), 1.0);
    assert_relative_eq!(engine.now(), 1.1);
}

#[test]
fn test_auto_look_ahead_tracks_driver_period() {
    let time = Arc::new(ManualTime::new(0.0));
    let engine = TactusEngine::builder()
        .look_ahead(LookAhead::Auto)
        .update_interval(0.03)
        .time_source(time.clone())
        .manual()
        .build()
        .unwrap();

    for i in 1..=400 {
        time.set_time(i as f64 * 0.05);
        engine.pump();
    }
    assert_relative_eq!(engine.look_ahead(), 0.05, epsilon = 1e-4);
}

#[test]
fn test_stalled_driver_does_not_inflate_look_ahead() {
    let time = Arc::new(ManualTime::new(0.0));
    let engine = TactusEngine::builder()
        .look_ahead(LookAhead::Auto)
        .time_source(time.clone())
        .manual()
        .build()
        .unwrap();

    for i in 1..=10 {
        time.set_time(i as f64 * 0.03);
        engine.pump();
    }
    let before = engine.look_ahead();
    time.advance(30.0);
    engine.pump();
    assert_eq!(engine.look_ahead(), before);
}

#[test]
fn test_timeout_fires_once_when_horizon_passes() {
    let (engine, time) = manual_engine(0.1);
    let (count, callback) = counter();
    engine.set_timeout(callback, 0.5).unwrap();

    pump_at(&engine, &time, &[0.3]);
    assert_eq!(count.load(Ordering::SeqCst), 0);

    pump_at(&engine, &time, &[0.7, 1.0, 2.0]);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cleared_timeout_never_fires() {
    let (engine, time) = manual_engine(0.0);
    let (count, callback) = counter();
    let id = engine.set_timeout(callback, 0.2).unwrap();

    assert!(engine.clear_timeout(id));
    assert!(!engine.clear_timeout(id));
    pump_at(&engine, &time, &[1.0]);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_timeout_may_schedule_another() {
    let (engine, time) = manual_engine(0.0);
    let (count, second) = counter();
    let ctx = engine.context().clone();
    engine
        .set_timeout(
            move || {
                ctx.set_timeout(second, 0.1).unwrap();
            },
            0.1,
        )
        .unwrap();

    pump_at(&engine, &time, &[0.15]);
    assert_eq!(count.load(Ordering::SeqCst), 0);
    pump_at(&engine, &time, &[0.3]);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_dropping_engine_disposes_context() {
    let (engine, _time) = manual_engine(0.0);
    let ctx = engine.context().clone();
    let clock = engine.clock(1.0, |_, _| {});
    assert_eq!(ctx.participant_count(), 1);

    drop(engine);
    assert!(ctx.is_disposed());
    assert_eq!(ctx.participant_count(), 0);
    assert!(ctx.set_timeout(|| {}, 0.0).is_err());
    drop(clock);
}

#[test]
fn test_driver_thread_pumps_wall_clock() {
    init_tracing();
    let engine = TactusEngine::builder()
        .update_interval(0.005)
        .driver_name("tactus-test-driver")
        .build()
        .unwrap();
    assert!(engine.is_running());

    let (count, callback) = counter();
    engine.set_timeout(callback, 0.0).unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    while count.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stop_and_restart_driver() {
    let mut engine = TactusEngine::builder()
        .update_interval(0.005)
        .build()
        .unwrap();
    engine.stop();
    assert!(!engine.is_running());
    engine.start().unwrap();
    engine.start().unwrap();
    assert!(engine.is_running());
}
