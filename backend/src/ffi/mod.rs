//! Python bindings (enabled with the `pyo3` feature)

pub mod orchestrator;
pub mod types;
