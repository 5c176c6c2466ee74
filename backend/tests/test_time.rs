//! Tests for TimeManager
//!
//! The clock only moves when a tick closes, by the scaled Δt of that tick.

use satlink_core::core::time::{MAX_SPEED_MULTIPLIER, MIN_SPEED_MULTIPLIER};
use satlink_core::TimeManager;

#[test]
fn test_time_manager_new() {
    let time = TimeManager::new();
    assert_eq!(time.current_tick(), 0);
    assert_eq!(time.now_ms(), 0);
    assert_eq!(time.speed_multiplier(), 1.0);
}

#[test]
fn test_advance_accumulates_time() {
    let mut time = TimeManager::new();

    time.advance(16);
    time.advance(17);
    time.advance(0);

    assert_eq!(time.current_tick(), 3);
    assert_eq!(time.now_ms(), 33);
}

#[test]
fn test_begin_tick_reports_tick_start() {
    let mut time = TimeManager::new();
    time.advance(500);

    let ctx = time.begin_tick(100);

    assert_eq!(ctx.tick, 1);
    assert_eq!(ctx.now_ms, 500);
    assert_eq!(ctx.dt_ms, 100);
    // begin_tick does not move the clock
    assert_eq!(time.now_ms(), 500);
}

#[test]
fn test_speed_multiplier_scales_delta() {
    let mut time = TimeManager::new();
    assert!(time.set_speed_multiplier(4.0));

    let ctx = time.begin_tick(250);
    assert_eq!(ctx.dt_ms, 1000);

    time.advance(ctx.dt_ms);
    assert_eq!(time.now_ms(), 1000);
}

#[test]
fn test_speed_multiplier_bounds() {
    let mut time = TimeManager::new();

    assert!(time.set_speed_multiplier(MIN_SPEED_MULTIPLIER));
    assert!(time.set_speed_multiplier(MAX_SPEED_MULTIPLIER));

    assert!(!time.set_speed_multiplier(0.0));
    assert!(!time.set_speed_multiplier(-1.0));
    assert!(!time.set_speed_multiplier(20.5));
    assert!(!time.set_speed_multiplier(f64::NAN));
    assert!(!time.set_speed_multiplier(f64::INFINITY));

    // rejected values keep the last accepted one
    assert_eq!(time.speed_multiplier(), MAX_SPEED_MULTIPLIER);
}

#[test]
fn test_fractional_multiplier_rounds() {
    let time = TimeManager::with_speed_multiplier(0.5);
    assert_eq!(time.scaled_delta(15), 8);
    assert_eq!(time.scaled_delta(16), 8);
}

#[test]
#[should_panic(expected = "speed multiplier must be within")]
fn test_with_speed_multiplier_rejects_out_of_range() {
    TimeManager::with_speed_multiplier(50.0);
}
