//! PyO3 wrapper for Orchestrator
//!
//! This module provides the Python interface used by the rendering and
//! control collaborators.

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use super::types::{event_to_py, parse_orchestrator_config, parse_satellite_config, parse_station_config, tick_result_to_py};
use crate::core::{SatelliteId, StationId};
use crate::orchestrator::Orchestrator as RustOrchestrator;

/// Python wrapper for Rust Orchestrator
///
/// # Example (from Python)
///
/// ```python
/// from satlink_core import Simulation
///
/// sim = Simulation({
///     "rng_seed": 7,
///     "params": {"jamming_probability": 0.0},
///     "satellites": [
///         {"name": "SAT-1", "orbit_radius_km": 6961.0, "angular_speed": 0.1, "backlog_mb": 30000},
///     ],
///     "stations": [{"name": "GS-1", "surface_angle": 0.0}],
/// })
/// result = sim.tick(16)
/// print(sim.snapshot_json())
/// ```
#[pyclass(name = "Simulation", unsendable)]
pub struct PySimulation {
    inner: RustOrchestrator,
}

fn runtime_error(context: &str, err: impl std::fmt::Display) -> PyErr {
    PyRuntimeError::new_err(format!("{}: {}", context, err))
}

#[pymethods]
impl PySimulation {
    /// Create a simulation from a configuration dict
    ///
    /// Raises ValueError for malformed entities or parameters.
    #[new]
    fn new(config: &Bound<'_, PyDict>) -> PyResult<Self> {
        let rust_config = parse_orchestrator_config(config)?;
        let inner = RustOrchestrator::new(rust_config).map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(PySimulation { inner })
    }

    /// Execute one tick of `dt_ms` raw milliseconds (scaled by the speed
    /// multiplier) and return its summary dict
    fn tick(&mut self, py: Python, dt_ms: u64) -> PyResult<Py<PyDict>> {
        let result = self
            .inner
            .tick(dt_ms)
            .map_err(|e| runtime_error("Tick execution failed", e))?;
        tick_result_to_py(py, &result)
    }

    fn current_tick(&self) -> usize {
        self.inner.current_tick()
    }

    fn now_ms(&self) -> u64 {
        self.inner.now_ms()
    }

    fn is_stopped(&self) -> bool {
        self.inner.is_stopped()
    }

    // ========================================================================
    // State Query Methods
    // ========================================================================

    /// Post-tick roster as JSON
    fn snapshot_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner.snapshot()).map_err(|e| runtime_error("Snapshot serialization failed", e))
    }

    /// Events logged since `cursor` (an index into the full log)
    ///
    /// Pass the previous `len(events)` total to poll incrementally.
    fn events_since(&self, py: Python, cursor: usize) -> PyResult<Py<PyList>> {
        let list = PyList::empty_bound(py);
        for event in self.inner.event_log().since(cursor) {
            list.append(event_to_py(py, event)?)?;
        }
        Ok(list.unbind())
    }

    fn event_count(&self) -> usize {
        self.inner.event_log().len()
    }

    // ========================================================================
    // Live Control
    // ========================================================================

    /// Update a parameter from text; raises ValueError and keeps the old
    /// value when rejected
    fn set_param(&mut self, key: &str, value: &str) -> PyResult<()> {
        self.inner
            .set_param(key, value)
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn set_speed_multiplier(&mut self, multiplier: f64) -> PyResult<()> {
        self.inner
            .set_speed_multiplier(multiplier)
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn adjust_comm_radius(&mut self, station: u32, radius_km: f64) -> PyResult<f64> {
        self.inner
            .adjust_comm_radius(StationId(station), radius_km)
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn add_satellite(&mut self, config: &Bound<'_, PyDict>) -> PyResult<u32> {
        let config = parse_satellite_config(config)?;
        self.inner
            .add_satellite(&config)
            .map(|id| id.0)
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn remove_satellite(&mut self, satellite: u32) -> PyResult<()> {
        self.inner
            .remove_satellite(SatelliteId(satellite))
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn add_station(&mut self, config: &Bound<'_, PyDict>) -> PyResult<u32> {
        let config = parse_station_config(config)?;
        self.inner
            .add_station(&config)
            .map(|id| id.0)
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Place a surface station at a random free angle; None if no room
    fn place_random_station(&mut self, name: &str) -> Option<u32> {
        self.inner.place_random_station(name).map(|id| id.0)
    }

    // ========================================================================
    // Stopping
    // ========================================================================

    /// Stop at the end of the next tick
    fn request_stop(&mut self) {
        self.inner.request_stop();
    }

    /// Stop now and return the final report as JSON
    fn stop(&mut self) -> PyResult<String> {
        self.inner
            .stop()
            .to_json()
            .map_err(|e| runtime_error("Report serialization failed", e))
    }

    /// Final report as JSON, or None while the run is live
    fn report_json(&self) -> PyResult<Option<String>> {
        self.inner
            .report()
            .map(|r| r.to_json())
            .transpose()
            .map_err(|e| runtime_error("Report serialization failed", e))
    }
}
