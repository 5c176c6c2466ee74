//! Satellite mission profiles
//!
//! Spawned satellites get their backlog, speed band and priority from their
//! kind; altitude comes from the Kuiper constellation shells and 40 % of them
//! orbit retrograde.

use crate::models::geometry::EARTH_RADIUS_KM;
use crate::models::satellite::{SatelliteConfig, SatelliteKind, PRIORITY_HIGH, PRIORITY_LOW};
use crate::rng::RandomSource;
use std::f64::consts::TAU;

/// Orbital shells above the surface (km)
pub const KUIPER_ALTITUDES_KM: [f64; 3] = [590.0, 610.0, 630.0];

/// Share of spawned satellites on retrograde orbits
pub const RETROGRADE_SHARE: f64 = 0.4;

/// Spawn parameters of one satellite kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindProfile {
    pub backlog_mb: i64,
    /// Angular speed band (rad/s)
    pub min_speed: f64,
    pub max_speed: f64,
    pub priority: u8,
}

impl KindProfile {
    /// Profile for `kind`; custom satellites spawn like commercial ones
    pub fn for_kind(kind: SatelliteKind) -> Self {
        match kind {
            SatelliteKind::Military => KindProfile {
                backlog_mb: 70_000,
                min_speed: 0.12,
                max_speed: 0.24,
                priority: PRIORITY_HIGH,
            },
            SatelliteKind::Commercial | SatelliteKind::Custom => KindProfile {
                backlog_mb: 30_000,
                min_speed: 0.06,
                max_speed: 0.36,
                priority: PRIORITY_LOW,
            },
        }
    }
}

/// Random satellite of the given kind
///
/// Draws, in order: shell, initial angle, speed, direction.
pub fn spawn_satellite(kind: SatelliteKind, name: impl Into<String>, rng: &mut dyn RandomSource) -> SatelliteConfig {
    let profile = KindProfile::for_kind(kind);
    let altitude = KUIPER_ALTITUDES_KM[rng.index(KUIPER_ALTITUDES_KM.len())];
    let angle = rng.uniform(0.0, TAU);
    let speed = rng.uniform(profile.min_speed, profile.max_speed);
    let direction = if rng.chance(RETROGRADE_SHARE) { -1.0 } else { 1.0 };

    SatelliteConfig::new(name, EARTH_RADIUS_KM + altitude, direction * speed, profile.backlog_mb)
        .with_kind(kind)
        .with_priority(profile.priority)
        .with_angle(angle)
}
