//! Automation integration tests
//!
//! Curve evaluation through the engine and host/renderer agreement over a
//! command channel.

use crate::helpers::tolerances::*;
use crate::helpers::*;
use approx::assert_relative_eq;
use tactus::prelude::*;
use tactus::{AutomationCommand, MIN_OUTPUT};

#[test]
fn test_set_then_linear_ramp() {
    let (engine, _time) = manual_engine(0.0);
    let mut param = engine.param(ParamOptions::default().value(5.0));
    param
        .set_value_at_time(5.0, 1.0)
        .unwrap()
        .linear_ramp_to_value_at_time(10.0, 2.0)
        .unwrap();

    assert_eq!(param.value_at_time(1.5), 7.5);
    assert_eq!(param.value_at_time(0.5), 5.0);
    assert_eq!(param.value_at_time(3.0), 10.0);
}

#[test]
fn test_target_approaches_asymptotically() {
    let (engine, _time) = manual_engine(0.0);
    let mut param = engine.param(ParamOptions::default());
    param.set_target_at_time(1.0, 0.0, 0.5).unwrap();

    assert_relative_eq!(
        param.value_at_time(0.5),
        1.0 - (-1.0f64).exp(),
        epsilon = LOOSE_EPSILON
    );
    let late = param.value_at_time(8.0);
    assert!(late < 1.0);
    assert_relative_eq!(late, 1.0, epsilon = LOOSE_EPSILON);
}

#[test]
fn test_cancel_and_hold_freezes_ramp() {
    let (engine, _time) = manual_engine(0.0);
    let mut param = engine.param(ParamOptions::default());
    param.linear_ramp_to_value_at_time(10.0, 2.0).unwrap();
    param.cancel_and_hold_at_time(1.0).unwrap();

    assert_eq!(param.value_at_time(1.5), 5.0);
    assert_eq!(param.value_at_time(4.0), 5.0);
    assert_eq!(param.value_at_time(0.5), 2.5);
}

#[test]
fn test_exponential_ramp_to_zero_is_clamped() {
    let (engine, _time) = manual_engine(0.0);
    let mut param = engine.param(ParamOptions::default().value(1.0));
    param.exponential_ramp_to_value_at_time(0.0, 1.0).unwrap();

    assert_eq!(param.value_at_time(1.0), MIN_OUTPUT);
    assert!(param.value_at_time(0.5) > 0.0);
    assert!(param.exponential_ramp_to_value_at_time(-1.0, 2.0).is_err());
}

#[test]
fn test_renderer_replay_matches_host() {
    let (engine, _time) = manual_engine(0.0);
    let options = ParamOptions::default().value(200.0);
    let (sink, rx) = ChannelSink::unbounded();

    let mut host = engine.param(options);
    host.attach_sink(sink);
    host.exponential_ramp_to_value_at_time(800.0, 1.0)
        .unwrap()
        .set_target_at_time(100.0, 1.5, 0.2)
        .unwrap()
        .linear_ramp_to_value_at_time(400.0, 3.0)
        .unwrap();
    host.set_value_curve_at_time(&[400.0, 50.0, 600.0], 3.5, 1.0, 1.0)
        .unwrap();
    host.cancel_and_hold_at_time(4.2).unwrap();

    let commands: Vec<AutomationCommand> = rx.try_iter().collect();
    assert!(commands
        .iter()
        .any(|c| matches!(c, AutomationCommand::CancelScheduledValues { .. })));

    let mut renderer = engine.param(options);
    for command in &commands {
        renderer.apply_command(command).unwrap();
    }

    for i in 0..=60 {
        let t = i as f64 * 0.1;
        assert_relative_eq!(
            renderer.value_at_time(t),
            host.value_at_time(t),
            epsilon = CURVE_EPSILON,
            max_relative = CURVE_EPSILON
        );
    }
}

#[test]
fn test_prune_keeps_values_from_now_on() {
    let (engine, _time) = manual_engine(0.0);
    let mut param = engine.param(ParamOptions::default());
    for i in 0..20 {
        let t = i as f64;
        param
            .set_value_at_time(t, t)
            .unwrap()
            .linear_ramp_to_value_at_time(t + 0.5, t + 0.5)
            .unwrap();
    }
    param.set_target_at_time(3.0, 20.5, 0.3).unwrap();

    let probes: Vec<f64> = (0..40).map(|i| 10.0 + i as f64 * 0.3).collect();
    let before: Vec<f64> = probes.iter().map(|&t| param.value_at_time(t)).collect();

    assert!(param.prune(10.0) > 0);
    for (&t, &expected) in probes.iter().zip(&before) {
        assert_eq!(param.value_at_time(t), expected);
    }
}

#[test]
fn test_tick_param_counts_through_tempo_ramp() {
    let (engine, _time) = manual_engine(0.0);
    let mut rate = engine.tick_param(tactus::TickParamOptions {
        value: 2.0,
        ..Default::default()
    });
    rate.linear_ramp_to_value_at_time(4.0, 2.0).unwrap();

    // Trapezoid: 2 * (2 + 4) / 2
    assert_relative_eq!(rate.get_ticks_at_time(2.0), 6.0, epsilon = TICK_EPSILON);
    assert_relative_eq!(rate.get_time_of_tick(6.0), 2.0, epsilon = TICK_EPSILON);
    assert_relative_eq!(rate.get_ticks_at_time(3.0), 10.0, epsilon = TICK_EPSILON);
}
