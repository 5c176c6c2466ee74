//! Time management for the simulation
//!
//! The simulation operates in discrete ticks over a virtual clock measured in
//! milliseconds. Each tick advances the clock by an externally supplied Δt,
//! scaled by a live speed multiplier. Nothing here reads the wall clock.

use crate::models::event::{Event, EventKind};
use serde::{Deserialize, Serialize};

/// Smallest accepted speed multiplier
pub const MIN_SPEED_MULTIPLIER: f64 = 0.1;

/// Largest accepted speed multiplier
pub const MAX_SPEED_MULTIPLIER: f64 = 20.0;

/// Manages the virtual clock and tick counter
///
/// # Example
/// ```
/// use satlink_core::TimeManager;
///
/// let mut time = TimeManager::new();
/// assert_eq!(time.current_tick(), 0);
/// assert_eq!(time.now_ms(), 0);
///
/// let dt = time.scaled_delta(1000);
/// time.advance(dt);
/// assert_eq!(time.current_tick(), 1);
/// assert_eq!(time.now_ms(), 1000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeManager {
    /// Ticks executed since simulation start
    current_tick: usize,
    /// Virtual time at the start of the current tick (ms)
    now_ms: u64,
    /// Multiplier applied to every externally supplied Δt
    speed_multiplier: f64,
}

impl TimeManager {
    /// Create a clock at t = 0 running at normal speed
    pub fn new() -> Self {
        Self {
            current_tick: 0,
            now_ms: 0,
            speed_multiplier: 1.0,
        }
    }

    /// Create a clock with an initial speed multiplier
    ///
    /// # Panics
    /// Panics if the multiplier is outside the accepted range. Callers holding
    /// unchecked input should go through [`TimeManager::set_speed_multiplier`].
    pub fn with_speed_multiplier(speed_multiplier: f64) -> Self {
        assert!(
            is_valid_speed_multiplier(speed_multiplier),
            "speed multiplier must be within [{}, {}]",
            MIN_SPEED_MULTIPLIER,
            MAX_SPEED_MULTIPLIER
        );
        Self {
            speed_multiplier,
            ..Self::new()
        }
    }

    /// Virtual time at the start of the current tick (ms)
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Number of ticks executed so far
    pub fn current_tick(&self) -> usize {
        self.current_tick
    }

    /// Current speed multiplier
    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    /// Change the speed multiplier
    ///
    /// Returns `false` and keeps the previous value when the input is not a
    /// finite number inside `[MIN_SPEED_MULTIPLIER, MAX_SPEED_MULTIPLIER]`.
    pub fn set_speed_multiplier(&mut self, multiplier: f64) -> bool {
        if !is_valid_speed_multiplier(multiplier) {
            return false;
        }
        self.speed_multiplier = multiplier;
        true
    }

    /// Apply the speed multiplier to a raw Δt
    ///
    /// # Example
    /// ```
    /// use satlink_core::TimeManager;
    ///
    /// let mut time = TimeManager::new();
    /// time.set_speed_multiplier(2.5);
    /// assert_eq!(time.scaled_delta(100), 250);
    /// ```
    pub fn scaled_delta(&self, raw_delta_ms: u64) -> u64 {
        (raw_delta_ms as f64 * self.speed_multiplier).round() as u64
    }

    /// Context for the tick about to run with a raw Δt
    pub fn begin_tick(&self, raw_delta_ms: u64) -> TickContext {
        TickContext::new(self.current_tick, self.now_ms, self.scaled_delta(raw_delta_ms))
    }

    /// Close the current tick and move the clock forward by `delta_ms`
    pub fn advance(&mut self, delta_ms: u64) {
        self.current_tick += 1;
        self.now_ms = self.now_ms.saturating_add(delta_ms);
    }
}

/// Clock reading shared by every phase of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickContext {
    pub tick: usize,
    /// Virtual time at the start of the tick (ms)
    pub now_ms: u64,
    /// Scaled length of the tick (ms)
    pub dt_ms: u64,
}

impl TickContext {
    pub fn new(tick: usize, now_ms: u64, dt_ms: u64) -> Self {
        Self { tick, now_ms, dt_ms }
    }

    /// Stamp an event with this tick's time
    pub fn event(&self, kind: EventKind) -> Event {
        Event::new(self.now_ms, self.tick, kind)
    }
}

impl Default for TimeManager {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid_speed_multiplier(multiplier: f64) -> bool {
    multiplier.is_finite() && (MIN_SPEED_MULTIPLIER..=MAX_SPEED_MULTIPLIER).contains(&multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "speed multiplier must be within")]
    fn test_invalid_initial_multiplier_panics() {
        TimeManager::with_speed_multiplier(0.0);
    }

    #[test]
    fn test_rejected_multiplier_keeps_previous() {
        let mut time = TimeManager::with_speed_multiplier(3.0);
        assert!(!time.set_speed_multiplier(f64::NAN));
        assert!(!time.set_speed_multiplier(-1.0));
        assert!(!time.set_speed_multiplier(500.0));
        assert_eq!(time.speed_multiplier(), 3.0);
    }
}
