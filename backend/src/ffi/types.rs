//! Type conversion utilities for FFI boundary
//!
//! Converts between Rust types and PyO3-compatible types (PyDict, PyList, etc.)

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::config::SimulationParams;
use crate::models::geometry::{CommArc, Position};
use crate::models::{Event, SatelliteConfig, SatelliteKind, StationConfig, Subject};
use crate::orchestrator::{OrchestratorConfig, TickResult};

// ========================================================================
// PyDict Extraction Helpers
// ========================================================================

/// Extract a required field from a Python dict with a clear error message.
///
/// # Example
/// ```ignore
/// let seed: u64 = extract_required(&py_dict, "rng_seed")?;
/// ```
fn extract_required<T>(dict: &Bound<'_, PyDict>, key: &str) -> PyResult<T>
where
    T: for<'py> FromPyObject<'py>,
{
    dict.get_item(key)?
        .ok_or_else(|| PyValueError::new_err(format!("Missing required field '{}'", key)))?
        .extract()
}

/// Extract an optional field; errors only on type mismatch.
fn extract_optional<T>(dict: &Bound<'_, PyDict>, key: &str) -> PyResult<Option<T>>
where
    T: for<'py> FromPyObject<'py>,
{
    match dict.get_item(key)? {
        Some(value) if !value.is_none() => Ok(Some(value.extract()?)),
        _ => Ok(None),
    }
}

fn extract_with_default<T>(dict: &Bound<'_, PyDict>, key: &str, default: T) -> PyResult<T>
where
    T: for<'py> FromPyObject<'py>,
{
    Ok(extract_optional(dict, key)?.unwrap_or(default))
}

fn extract_list<'py>(dict: &Bound<'py, PyDict>, key: &str) -> PyResult<Option<Bound<'py, PyList>>> {
    match dict.get_item(key)? {
        Some(value) => Ok(Some(value.downcast_into()?)),
        None => Ok(None),
    }
}

// ========================================================================
// Configuration Parsers
// ========================================================================

/// Convert Python dict to OrchestratorConfig
///
/// Parameters under `params` go through the same validation as live
/// updates: an invalid value is rejected with `ValueError` here rather than
/// silently defaulted, since the caller can still fix it.
pub fn parse_orchestrator_config(py_config: &Bound<'_, PyDict>) -> PyResult<OrchestratorConfig> {
    let rng_seed: u64 = extract_required(py_config, "rng_seed")?;
    let speed_multiplier: f64 = extract_with_default(py_config, "speed_multiplier", 1.0)?;

    let mut params = SimulationParams::default();
    if let Some(py_params) = py_config.get_item("params")? {
        let params_dict: Bound<'_, PyDict> = py_params.downcast_into()?;
        for (key, value) in params_dict.iter() {
            let key: String = key.extract()?;
            let raw = if value.is_none() {
                String::new()
            } else {
                value.str()?.to_string()
            };
            params
                .set_param(&key, &raw)
                .map_err(|e| PyValueError::new_err(e.to_string()))?;
        }
    }

    let mut satellites = Vec::new();
    if let Some(list) = extract_list(py_config, "satellites")? {
        for item in list.iter() {
            satellites.push(parse_satellite_config(&item.downcast_into()?)?);
        }
    }

    let mut stations = Vec::new();
    if let Some(list) = extract_list(py_config, "stations")? {
        for item in list.iter() {
            stations.push(parse_station_config(&item.downcast_into()?)?);
        }
    }

    Ok(OrchestratorConfig {
        rng_seed,
        params,
        speed_multiplier,
        satellites,
        stations,
    })
}

fn parse_kind(raw: &str) -> PyResult<SatelliteKind> {
    match raw {
        "commercial" | "Commercial" => Ok(SatelliteKind::Commercial),
        "military" | "Military" => Ok(SatelliteKind::Military),
        "custom" | "Custom" => Ok(SatelliteKind::Custom),
        other => Err(PyValueError::new_err(format!(
            "Invalid satellite kind: '{}'. Must be 'commercial', 'military' or 'custom'",
            other
        ))),
    }
}

/// Satellite dict: `name`, `orbit_radius_km`, `angular_speed`, `backlog_mb`
/// required; `kind`, `priority`, `initial_angle`, `per_contact_limit_mb`
/// optional.
pub fn parse_satellite_config(py_sat: &Bound<'_, PyDict>) -> PyResult<SatelliteConfig> {
    let name: String = extract_required(py_sat, "name")?;
    let orbit_radius_km: f64 = extract_required(py_sat, "orbit_radius_km")?;
    let angular_speed: f64 = extract_required(py_sat, "angular_speed")?;
    let backlog_mb: i64 = extract_required(py_sat, "backlog_mb")?;

    let mut config = SatelliteConfig::new(name, orbit_radius_km, angular_speed, backlog_mb)
        .with_priority(extract_with_default(py_sat, "priority", 0u8)?)
        .with_angle(extract_with_default(py_sat, "initial_angle", 0.0)?);
    if let Some(kind) = extract_optional::<String>(py_sat, "kind")? {
        config = config.with_kind(parse_kind(&kind)?);
    }
    if let Some(limit) = extract_optional::<i64>(py_sat, "per_contact_limit_mb")? {
        config = config.with_contact_limit(limit);
    }

    config.validate().map_err(PyValueError::new_err)?;
    Ok(config)
}

/// Station dict: `name` plus either `surface_angle` (surface station) or
/// `x`/`y` (omnidirectional point). Optional: `capacity`,
/// `comm_radius_km`, `arc_width_deg`, `maintenance` (list of
/// `(start_ms, end_ms)`), `max_received_mb`.
pub fn parse_station_config(py_station: &Bound<'_, PyDict>) -> PyResult<StationConfig> {
    let name: String = extract_required(py_station, "name")?;

    let mut config = match extract_optional::<f64>(py_station, "surface_angle")? {
        Some(angle) => StationConfig::on_surface(name, angle),
        None => {
            let x: f64 = extract_required(py_station, "x")?;
            let y: f64 = extract_required(py_station, "y")?;
            StationConfig::at(name, Position::new(x, y))
        }
    };

    if let Some(capacity) = extract_optional::<usize>(py_station, "capacity")? {
        config = config.with_capacity(capacity);
    }
    if let Some(radius) = extract_optional::<f64>(py_station, "comm_radius_km")? {
        config = config.with_comm_radius(radius);
    }
    if let Some(width) = extract_optional::<f64>(py_station, "arc_width_deg")? {
        // arc faces away from the Earth's centre
        let outward = config.position.y.atan2(config.position.x);
        config = config.with_arc(CommArc::from_width_degrees(outward, width));
    }
    if let Some(windows) = extract_optional::<Vec<(u64, u64)>>(py_station, "maintenance")? {
        for (start, end) in windows {
            config = config.with_maintenance(start, end);
        }
    }
    if py_station.contains("max_received_mb")? {
        config = config.with_max_received(extract_optional(py_station, "max_received_mb")?);
    }

    config.validate().map_err(PyValueError::new_err)?;
    Ok(config)
}

// ========================================================================
// Result Converters
// ========================================================================

/// Convert TickResult to Python dict
pub fn tick_result_to_py(py: Python, result: &TickResult) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("tick", result.tick)?;
    dict.set_item("time_ms", result.time_ms)?;
    dict.set_item("dt_ms", result.dt_ms)?;
    dict.set_item("connections", result.connections)?;
    dict.set_item("queued", result.queued)?;
    dict.set_item("disconnections", result.disconnections)?;
    dict.set_item("delivered_mb", result.delivered_mb)?;
    let destroyed: Vec<u32> = result.destroyed.iter().map(|id| id.0).collect();
    dict.set_item("destroyed", destroyed)?;
    dict.set_item("events_logged", result.events_logged)?;
    dict.set_item("stopped", result.stopped)?;
    Ok(dict.unbind())
}

/// Convert an event to the flat dict shape used by the event panel
pub fn event_to_py(py: Python, event: &Event) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("time_ms", event.time_ms)?;
    dict.set_item("tick", event.tick)?;
    dict.set_item("category", event.category().as_str())?;

    let satellites: Vec<u32> = event
        .subjects()
        .iter()
        .filter_map(|s| match s {
            Subject::Satellite(id) => Some(id.0),
            Subject::Station(_) => None,
        })
        .collect();
    let stations: Vec<u32> = event
        .subjects()
        .iter()
        .filter_map(|s| match s {
            Subject::Station(id) => Some(id.0),
            Subject::Satellite(_) => None,
        })
        .collect();
    dict.set_item("satellites", satellites)?;
    dict.set_item("stations", stations)?;
    dict.set_item("message", event.message())?;
    Ok(dict.unbind())
}
