//! Clock integration tests
//!
//! Tick delivery through the engine's loop: exact tick times regardless of
//! when turns happen, lifecycle ordering, and the catch-up bound.

use crate::helpers::tolerances::*;
use crate::helpers::*;
use approx::assert_relative_eq;
use proptest::prelude::*;
use tactus::prelude::*;

#[test]
fn test_ticks_carry_exact_times_not_turn_times() {
    let (engine, time) = manual_engine(0.0);
    let log = TickLog::default();
    let clock = engine.clock(2.0, log.record());
    clock.start_at(0.0, None).unwrap();

    pump_at(&engine, &time, &[0.3, 0.7, 1.1]);

    let ticks = log.ticks();
    assert_eq!(ticks.len(), 3);
    for ((t, n), (expected_t, expected_n)) in ticks.iter().zip([(0.0, 0), (0.5, 1), (1.0, 2)]) {
        assert_relative_eq!(*t, expected_t, epsilon = CURVE_EPSILON);
        assert_eq!(*n, expected_n);
    }
}

#[test]
fn test_stop_inside_window_suppresses_later_ticks() {
    let (engine, time) = manual_engine(0.0);
    let log = TickLog::default();
    let clock = engine.clock(10.0, log.record());
    let events = clock.subscribe();
    clock.start_at(0.0, None).unwrap();
    clock.stop_at(0.35).unwrap();

    pump_at(&engine, &time, &[0.4, 0.8, 1.0]);

    assert_eq!(log.len(), 4);
    let events: Vec<ClockEvent> = events.try_iter().collect();
    assert_eq!(events.last(), Some(&ClockEvent::Stopped { time: 0.35 }));
    assert_eq!(clock.get_state_at_time(0.5), PlaybackState::Stopped);
}

#[test]
fn test_repeated_start_is_idempotent() {
    let (engine, time) = manual_engine(0.0);
    let once = TickLog::default();
    let twice = TickLog::default();
    let a = engine.clock(4.0, once.record());
    let b = engine.clock(4.0, twice.record());
    a.start_at(0.0, None).unwrap();
    b.start_at(0.0, None).unwrap();
    b.start_at(0.0, None).unwrap();
    b.start_at(0.6, None).unwrap();

    pump_until(&engine, &time, 2.0, 0.1);
    assert_eq!(once.ticks(), twice.ticks());
}

#[test]
fn test_pause_and_resume_continue_count() {
    let (engine, time) = manual_engine(0.0);
    let log = TickLog::default();
    let clock = engine.clock(1.0, log.record());
    clock.start_at(0.0, None).unwrap();
    clock.pause_at(1.5).unwrap();
    clock.start_at(3.0, None).unwrap();

    pump_until(&engine, &time, 4.4, 0.4);

    let numbers: Vec<u64> = log.ticks().iter().map(|(_, n)| *n).collect();
    let times: Vec<f64> = log.ticks().iter().map(|(t, _)| *t).collect();
    assert_eq!(numbers, vec![0, 1, 2, 3]);
    assert_eq!(times, vec![0.0, 1.0, 3.0, 4.0]);
}

#[test]
fn test_catch_up_bounds_callbacks() {
    init_tracing();
    let (engine, time) = manual_engine(0.0);
    let log = TickLog::default();
    let clock = engine.clock(1000.0, log.record());
    clock.start_at(0.0, None).unwrap();

    pump_at(&engine, &time, &[60.0]);
    assert!(log.len() <= 1);
    assert!(clock.missed_ticks() >= 59_000);

    pump_at(&engine, &time, &[60.01]);
    assert!(log.len() <= 11);
}

#[test]
fn test_tempo_automation_moves_tick_times() {
    let (engine, time) = manual_engine(0.0);
    let log = TickLog::default();
    let clock = engine.clock(1.0, log.record());
    clock
        .frequency()
        .linear_ramp_to_value_at_time(3.0, 2.0)
        .unwrap();
    clock.start_at(0.0, None).unwrap();

    pump_until(&engine, &time, 3.0, 0.1);

    let ticks = log.ticks();
    // ticks(t) = t + t^2 / 2 over the ramp
    assert_relative_eq!(ticks[1].0, 3f64.sqrt() - 1.0, epsilon = TICK_EPSILON);
    for (time, tick) in &ticks {
        assert_relative_eq!(
            clock.get_ticks_at_time(*time),
            *tick as f64,
            epsilon = TICK_EPSILON
        );
    }
}

#[test]
fn test_seek_while_running() {
    let (engine, time) = manual_engine(0.0);
    let log = TickLog::default();
    let clock = engine.clock(2.0, log.record());
    clock.start_at(0.0, None).unwrap();
    clock.set_ticks_at_time(100.0, 1.0).unwrap();

    pump_until(&engine, &time, 1.6, 0.1);
    let numbers: Vec<u64> = log.ticks().iter().map(|(_, n)| *n).collect();
    assert_eq!(numbers, vec![0, 1, 100, 101]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_irregular_turns_deliver_every_tick_once(
        steps in prop::collection::vec(0.001f64..0.2, 1..80),
        rate in 1.0f64..30.0,
    ) {
        let (engine, time) = manual_engine(0.0);
        let log = TickLog::default();
        let clock = engine.clock(rate, log.record());
        clock.start_at(0.0, None).unwrap();

        let mut now = 0.0;
        for step in &steps {
            now += step;
            time.set_time(now);
            engine.pump();
        }

        let ticks = log.ticks();
        let numbers: Vec<u64> = ticks.iter().map(|(_, n)| *n).collect();
        let expected: Vec<u64> = (0..numbers.len() as u64).collect();
        prop_assert_eq!(numbers, expected);
        prop_assert!(ticks.iter().all(|(t, _)| *t < clock.last_update()));
        prop_assert!(ticks.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
