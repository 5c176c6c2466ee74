//! Tunable simulation parameters
//!
//! [`SimulationParams`] holds every probability, duration, rate and policy
//! the engine consults. Values arrive either as a serde document (scenario
//! file, FFI) or one at a time as raw text from a live control surface
//! through [`SimulationParams::set_param`].
//!
//! Bad input never aborts a run: the previous value is kept, a warning is
//! logged and a [`ConfigError`] is returned for the caller's information.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Rejected parameter update
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("unknown parameter '{0}'")]
    UnknownKey(String),

    #[error("parameter '{key}': cannot parse '{raw}'")]
    Unparseable { key: String, raw: String },

    #[error("parameter '{key}': {value} is outside {allowed}")]
    OutOfRange {
        key: String,
        value: String,
        allowed: &'static str,
    },
}

/// What happens to a station's wait queue when it goes offline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StationQueuePolicy {
    /// Waiting satellites stay queued and are admitted once the station is back
    #[default]
    Preserve,
    /// The queue is emptied; satellites request again on the next tick
    Clear,
}

/// Order in which new connection requests are served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPolicyKind {
    /// Higher priority classes first system-wide, nearest first within a class
    #[default]
    PriorityClasses,
    /// Nearest satellite first regardless of priority
    NearestFirst,
}

/// Engine parameters
///
/// # Example
/// ```
/// use satlink_core::config::{ConfigError, SimulationParams};
///
/// let mut params = SimulationParams::default();
/// params.set_param("jamming_probability", "0.25").unwrap();
/// assert_eq!(params.jamming_probability, 0.25);
///
/// // Bad input keeps the previous value
/// let err = params.set_param("jamming_probability", "lots");
/// assert!(matches!(err, Err(ConfigError::Unparseable { .. })));
/// assert_eq!(params.jamming_probability, 0.25);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Per-tick chance an operational satellite is damaged
    pub satellite_damage_probability: f64,
    /// Time a damaged satellite degrades before it is destroyed (ms)
    pub satellite_repair_duration_ms: u64,
    /// Per-tick chance a station is damaged
    pub station_damage_probability: f64,
    /// Time a damaged station needs to come back (ms)
    pub station_repair_duration_ms: u64,
    /// Fraction of stored data discarded when a station is repaired
    pub station_data_loss_fraction: f64,
    pub jamming_probability: f64,
    /// Fraction of the intended amount still delivered on a jammed tick
    pub jamming_retained_fraction: f64,
    pub transmission_error_probability: f64,
    /// Fraction of the intended amount delivered on an erroneous tick
    pub error_retained_fraction: f64,
    pub base_rate_mb_per_s: i64,
    pub burst_rate_mb_per_s: i64,
    pub burst_duration_ms: u64,
    /// Default cap on data per contact for satellites that do not set one
    pub per_contact_limit_mb: i64,
    pub queue_policy: StationQueuePolicy,
    pub allocation_policy: AllocationPolicyKind,
    /// Stop automatically once this much virtual time has elapsed
    pub duration_ms: Option<u64>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            satellite_damage_probability: 0.0003,
            satellite_repair_duration_ms: 5000,
            station_damage_probability: 0.001,
            station_repair_duration_ms: 5000,
            station_data_loss_fraction: 0.5,
            jamming_probability: 0.01,
            jamming_retained_fraction: 0.0,
            transmission_error_probability: 0.05,
            error_retained_fraction: 0.5,
            base_rate_mb_per_s: 500,
            burst_rate_mb_per_s: 1000,
            burst_duration_ms: 3000,
            per_contact_limit_mb: 10_000,
            queue_policy: StationQueuePolicy::Preserve,
            allocation_policy: AllocationPolicyKind::PriorityClasses,
            duration_ms: None,
        }
    }
}

const UNIT_INTERVAL: &str = "[0, 1]";
const NON_NEGATIVE: &str = "[0, +inf)";
const POSITIVE: &str = "(0, +inf)";

impl SimulationParams {
    /// Parameters with every stochastic effect disabled
    pub fn deterministic() -> Self {
        Self {
            satellite_damage_probability: 0.0,
            station_damage_probability: 0.0,
            jamming_probability: 0.0,
            transmission_error_probability: 0.0,
            ..Self::default()
        }
    }

    /// Update one parameter from raw text
    ///
    /// On error the previous value is kept and a warning is logged.
    pub fn set_param(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        let result = self.apply(key, raw.trim());
        if let Err(err) = &result {
            warn!(key, raw, error = %err, "rejected parameter update, keeping previous value");
        }
        result
    }

    fn apply(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        match key {
            "satellite_damage_probability" => {
                self.satellite_damage_probability = parse_fraction(key, raw)?
            }
            "satellite_repair_duration_ms" => self.satellite_repair_duration_ms = parse(key, raw)?,
            "station_damage_probability" => {
                self.station_damage_probability = parse_fraction(key, raw)?
            }
            "station_repair_duration_ms" => self.station_repair_duration_ms = parse(key, raw)?,
            "station_data_loss_fraction" => {
                self.station_data_loss_fraction = parse_fraction(key, raw)?
            }
            "jamming_probability" => self.jamming_probability = parse_fraction(key, raw)?,
            "jamming_retained_fraction" => {
                self.jamming_retained_fraction = parse_fraction(key, raw)?
            }
            "transmission_error_probability" => {
                self.transmission_error_probability = parse_fraction(key, raw)?
            }
            "error_retained_fraction" => self.error_retained_fraction = parse_fraction(key, raw)?,
            "base_rate_mb_per_s" => self.base_rate_mb_per_s = parse_at_least(key, raw, 0, NON_NEGATIVE)?,
            "burst_rate_mb_per_s" => {
                self.burst_rate_mb_per_s = parse_at_least(key, raw, 0, NON_NEGATIVE)?
            }
            "burst_duration_ms" => self.burst_duration_ms = parse(key, raw)?,
            "per_contact_limit_mb" => {
                self.per_contact_limit_mb = parse_at_least(key, raw, 1, POSITIVE)?
            }
            "queue_policy" => {
                self.queue_policy = match raw {
                    "preserve" => StationQueuePolicy::Preserve,
                    "clear" => StationQueuePolicy::Clear,
                    _ => return Err(unparseable(key, raw)),
                }
            }
            "allocation_policy" => {
                self.allocation_policy = match raw {
                    "priority_classes" => AllocationPolicyKind::PriorityClasses,
                    "nearest_first" => AllocationPolicyKind::NearestFirst,
                    _ => return Err(unparseable(key, raw)),
                }
            }
            "duration_ms" => {
                self.duration_ms = match raw {
                    "" | "none" => None,
                    _ => Some(parse_at_least::<u64>(key, raw, 1, POSITIVE)?),
                }
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Reset every out-of-range value to its default
    ///
    /// Used on documents that bypassed [`SimulationParams::set_param`], such
    /// as deserialized scenario files. Returns one error per reset field.
    pub fn sanitize(&mut self) -> Vec<ConfigError> {
        let defaults = Self::default();
        let mut errors = Vec::new();

        let mut check_fraction = |key: &str, value: &mut f64, default: f64| {
            if !(value.is_finite() && (0.0..=1.0).contains(&*value)) {
                errors.push(ConfigError::OutOfRange {
                    key: key.to_string(),
                    value: value.to_string(),
                    allowed: UNIT_INTERVAL,
                });
                *value = default;
            }
        };
        check_fraction(
            "satellite_damage_probability",
            &mut self.satellite_damage_probability,
            defaults.satellite_damage_probability,
        );
        check_fraction(
            "station_damage_probability",
            &mut self.station_damage_probability,
            defaults.station_damage_probability,
        );
        check_fraction(
            "station_data_loss_fraction",
            &mut self.station_data_loss_fraction,
            defaults.station_data_loss_fraction,
        );
        check_fraction(
            "jamming_probability",
            &mut self.jamming_probability,
            defaults.jamming_probability,
        );
        check_fraction(
            "jamming_retained_fraction",
            &mut self.jamming_retained_fraction,
            defaults.jamming_retained_fraction,
        );
        check_fraction(
            "transmission_error_probability",
            &mut self.transmission_error_probability,
            defaults.transmission_error_probability,
        );
        check_fraction(
            "error_retained_fraction",
            &mut self.error_retained_fraction,
            defaults.error_retained_fraction,
        );

        if self.base_rate_mb_per_s < 0 {
            errors.push(out_of_range("base_rate_mb_per_s", self.base_rate_mb_per_s, NON_NEGATIVE));
            self.base_rate_mb_per_s = defaults.base_rate_mb_per_s;
        }
        if self.burst_rate_mb_per_s < 0 {
            errors.push(out_of_range("burst_rate_mb_per_s", self.burst_rate_mb_per_s, NON_NEGATIVE));
            self.burst_rate_mb_per_s = defaults.burst_rate_mb_per_s;
        }
        if self.per_contact_limit_mb <= 0 {
            errors.push(out_of_range("per_contact_limit_mb", self.per_contact_limit_mb, POSITIVE));
            self.per_contact_limit_mb = defaults.per_contact_limit_mb;
        }
        if self.duration_ms == Some(0) {
            errors.push(out_of_range("duration_ms", 0, POSITIVE));
            self.duration_ms = defaults.duration_ms;
        }

        for err in &errors {
            warn!(error = %err, "invalid parameter replaced by default");
        }
        errors
    }
}

fn unparseable(key: &str, raw: &str) -> ConfigError {
    ConfigError::Unparseable {
        key: key.to_string(),
        raw: raw.to_string(),
    }
}

fn out_of_range(key: &str, value: impl ToString, allowed: &'static str) -> ConfigError {
    ConfigError::OutOfRange {
        key: key.to_string(),
        value: value.to_string(),
        allowed,
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| unparseable(key, raw))
}

fn parse_fraction(key: &str, raw: &str) -> Result<f64, ConfigError> {
    let value: f64 = parse(key, raw)?;
    if value.is_nan() {
        return Err(unparseable(key, raw));
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(out_of_range(key, value, UNIT_INTERVAL));
    }
    Ok(value)
}

fn parse_at_least<T>(key: &str, raw: &str, min: T, allowed: &'static str) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + ToString,
{
    let value: T = parse(key, raw)?;
    if value < min {
        return Err(out_of_range(key, value, allowed));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_key() {
        let mut params = SimulationParams::default();
        assert_eq!(
            params.set_param("warp_factor", "9"),
            Err(ConfigError::UnknownKey("warp_factor".to_string()))
        );
    }

    #[test]
    fn test_nan_is_rejected() {
        let mut params = SimulationParams::default();
        assert!(params.set_param("jamming_probability", "NaN").is_err());
        assert_eq!(params.jamming_probability, 0.01);
    }

    #[test]
    fn test_policy_keys() {
        let mut params = SimulationParams::default();
        params.set_param("queue_policy", "clear").unwrap();
        params.set_param("allocation_policy", "nearest_first").unwrap();
        assert_eq!(params.queue_policy, StationQueuePolicy::Clear);
        assert_eq!(params.allocation_policy, AllocationPolicyKind::NearestFirst);
    }

    #[test]
    fn test_duration_none_and_zero() {
        let mut params = SimulationParams::default();
        params.set_param("duration_ms", "30000").unwrap();
        assert_eq!(params.duration_ms, Some(30_000));
        assert!(params.set_param("duration_ms", "0").is_err());
        assert_eq!(params.duration_ms, Some(30_000));
        params.set_param("duration_ms", "none").unwrap();
        assert_eq!(params.duration_ms, None);
    }

    #[test]
    fn test_sanitize_resets_each_bad_field() {
        let mut params = SimulationParams {
            jamming_probability: 4.0,
            error_retained_fraction: f64::NAN,
            per_contact_limit_mb: 0,
            ..SimulationParams::default()
        };
        let errors = params.sanitize();
        assert_eq!(errors.len(), 3);
        assert_eq!(params, SimulationParams::default());
    }
}
