//! Scenario setup
//!
//! Turns a handful of counts (commercial and military satellites, stations,
//! run length) into concrete entity definitions. Stations are dropped onto
//! the Earth's surface at random angles, never closer than
//! [`MIN_STATION_SEPARATION_KM`] to one another; a station that cannot find
//! room within [`PLACEMENT_ATTEMPTS`] tries is skipped with a warning.
//!
//! # Example
//!
//! ```rust
//! use satlink_core::rng::RngManager;
//! use satlink_core::scenario::{build_scenario, SetupParams};
//!
//! let setup = SetupParams::default();
//! let plan = build_scenario(&setup, &mut RngManager::new(1));
//! assert_eq!(plan.satellites.len(), 10);
//! assert!(plan.stations.len() <= 3);
//! ```

pub mod kinds;

pub use kinds::{spawn_satellite, KindProfile, KUIPER_ALTITUDES_KM, RETROGRADE_SHARE};

use crate::config::ConfigError;
use crate::models::geometry::{Position, EARTH_RADIUS_KM};
use crate::models::{SatelliteConfig, SatelliteKind, StationConfig};
use crate::rng::RandomSource;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use thiserror::Error;
use tracing::warn;

/// Minimum surface distance between two stations (km)
pub const MIN_STATION_SEPARATION_KM: f64 = 750.0;

/// Random placement tries per station
pub const PLACEMENT_ATTEMPTS: usize = 100;

/// Station placement rejected
#[derive(Debug, Error, PartialEq)]
pub enum PlacementError {
    #[error("station '{name}' would be {distance_km:.0} km from another station (minimum {min_km} km)")]
    TooClose {
        name: String,
        distance_km: f64,
        min_km: f64,
    },

    #[error("no free spot for station '{name}' after {attempts} attempts")]
    NoFreeSpot { name: String, attempts: usize },
}

/// Counts requested by the setup collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupParams {
    pub commercial_satellites: usize,
    pub military_satellites: usize,
    pub stations: usize,
    pub duration_ms: u64,
}

impl Default for SetupParams {
    fn default() -> Self {
        Self {
            commercial_satellites: 5,
            military_satellites: 5,
            stations: 3,
            duration_ms: 30_000,
        }
    }
}

impl SetupParams {
    /// Parse raw text inputs, falling back to the default per field
    ///
    /// `duration_s` is in seconds. Every rejected field is logged and
    /// returned.
    ///
    /// # Example
    /// ```
    /// use satlink_core::scenario::SetupParams;
    ///
    /// let (setup, errors) = SetupParams::from_inputs("8", "two", "4", "60");
    /// assert_eq!(setup.commercial_satellites, 8);
    /// assert_eq!(setup.military_satellites, 5);
    /// assert_eq!(setup.duration_ms, 60_000);
    /// assert_eq!(errors.len(), 1);
    /// ```
    pub fn from_inputs(commercial: &str, military: &str, stations: &str, duration_s: &str) -> (Self, Vec<ConfigError>) {
        let defaults = Self::default();
        let mut errors = Vec::new();

        let mut count = |key: &str, raw: &str, default: usize| match raw.trim().parse::<usize>() {
            Ok(value) => value,
            Err(_) => {
                errors.push(ConfigError::Unparseable {
                    key: key.to_string(),
                    raw: raw.to_string(),
                });
                default
            }
        };
        let commercial_satellites = count("commercial_satellites", commercial, defaults.commercial_satellites);
        let military_satellites = count("military_satellites", military, defaults.military_satellites);
        let stations = count("stations", stations, defaults.stations);

        let duration_ms = match duration_s.trim().parse::<f64>() {
            Ok(secs) if secs.is_finite() && secs > 0.0 => (secs * 1000.0).round() as u64,
            Ok(secs) => {
                errors.push(ConfigError::OutOfRange {
                    key: "duration".to_string(),
                    value: secs.to_string(),
                    allowed: "(0, +inf)",
                });
                defaults.duration_ms
            }
            Err(_) => {
                errors.push(ConfigError::Unparseable {
                    key: "duration".to_string(),
                    raw: duration_s.to_string(),
                });
                defaults.duration_ms
            }
        };

        for err in &errors {
            warn!(error = %err, "setup input rejected, using default");
        }

        (
            Self {
                commercial_satellites,
                military_satellites,
                stations,
                duration_ms,
            },
            errors,
        )
    }
}

/// Entity definitions produced from [`SetupParams`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPlan {
    pub satellites: Vec<SatelliteConfig>,
    pub stations: Vec<StationConfig>,
}

/// Reject a station position too close to an existing one
pub fn check_clearance(name: &str, candidate: &Position, existing: &[Position]) -> Result<(), PlacementError> {
    match existing
        .iter()
        .map(|p| p.distance_to(candidate))
        .find(|d| *d < MIN_STATION_SEPARATION_KM)
    {
        Some(distance_km) => Err(PlacementError::TooClose {
            name: name.to_string(),
            distance_km,
            min_km: MIN_STATION_SEPARATION_KM,
        }),
        None => Ok(()),
    }
}

/// Surface station at a chosen angle, subject to the separation rule
pub fn station_at(name: &str, surface_angle: f64, existing: &[Position]) -> Result<StationConfig, PlacementError> {
    let config = StationConfig::on_surface(name, surface_angle);
    check_clearance(name, &config.position, existing)?;
    Ok(config)
}

/// Surface station at a random free angle
///
/// Each attempt draws one sample. Returns `NoFreeSpot` after
/// [`PLACEMENT_ATTEMPTS`] collisions.
pub fn random_station(name: &str, existing: &[Position], rng: &mut dyn RandomSource) -> Result<StationConfig, PlacementError> {
    for _ in 0..PLACEMENT_ATTEMPTS {
        let angle = rng.uniform(0.0, TAU);
        if let Ok(config) = station_at(name, angle, existing) {
            return Ok(config);
        }
    }
    Err(PlacementError::NoFreeSpot {
        name: name.to_string(),
        attempts: PLACEMENT_ATTEMPTS,
    })
}

/// Generate every station and satellite of a scenario
///
/// Stations are placed first, then commercial satellites, then military
/// ones. Stations that find no room are left out with a warning.
pub fn build_scenario(setup: &SetupParams, rng: &mut dyn RandomSource) -> ScenarioPlan {
    let mut plan = ScenarioPlan::default();
    let mut positions: Vec<Position> = Vec::new();

    for n in 1..=setup.stations {
        let name = format!("GS-{}", n);
        match random_station(&name, &positions, rng) {
            Ok(config) => {
                positions.push(config.position);
                plan.stations.push(config);
            }
            Err(err) => warn!(error = %err, "station not placed"),
        }
    }

    for n in 1..=setup.commercial_satellites {
        plan.satellites
            .push(spawn_satellite(SatelliteKind::Commercial, format!("COM-{}", n), rng));
    }
    for n in 1..=setup.military_satellites {
        plan.satellites
            .push(spawn_satellite(SatelliteKind::Military, format!("MIL-{}", n), rng));
    }

    plan
}

/// Upper bound on how many stations fit on the surface at the separation
/// distance
pub fn max_station_count() -> usize {
    (TAU * EARTH_RADIUS_KM / MIN_STATION_SEPARATION_KM).floor() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RngManager, ScriptedSource};

    #[test]
    fn test_clearance_rejects_neighbour() {
        let existing = vec![Position::from_polar(EARTH_RADIUS_KM, 0.0)];
        // ~637 km of arc away
        let result = station_at("B", 0.1, &existing);
        assert!(matches!(result, Err(PlacementError::TooClose { .. })));
        assert!(station_at("B", 0.2, &existing).is_ok());
    }

    #[test]
    fn test_random_station_gives_up() {
        let existing = vec![Position::from_polar(EARTH_RADIUS_KM, 0.0)];
        // every draw lands on the occupied spot
        let mut rng = ScriptedSource::new(vec![0.0]);
        assert_eq!(
            random_station("B", &existing, &mut rng),
            Err(PlacementError::NoFreeSpot {
                name: "B".to_string(),
                attempts: PLACEMENT_ATTEMPTS
            })
        );
    }

    #[test]
    fn test_crowded_surface_skips_stations() {
        let setup = SetupParams {
            stations: max_station_count() + 20,
            commercial_satellites: 0,
            military_satellites: 0,
            duration_ms: 1000,
        };
        let plan = build_scenario(&setup, &mut RngManager::new(3));
        assert!(plan.stations.len() <= max_station_count());
        assert!(!plan.stations.is_empty());
    }

    #[test]
    fn test_build_is_deterministic() {
        let setup = SetupParams::default();
        let a = build_scenario(&setup, &mut RngManager::new(99));
        let b = build_scenario(&setup, &mut RngManager::new(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_negative_duration_falls_back() {
        let (setup, errors) = SetupParams::from_inputs("1", "1", "1", "-5");
        assert_eq!(setup.duration_ms, 30_000);
        assert!(matches!(errors[0], ConfigError::OutOfRange { .. }));
    }
}
