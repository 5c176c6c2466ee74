//! Satellite Link Simulator Core - Rust Engine
//!
//! Discrete-time simulation of satellites draining their data backlog
//! through capacity-limited ground stations, with deterministic execution.
//!
//! # Architecture
//!
//! - **core**: Identifiers and time management
//! - **models**: Domain types (Satellite, GroundStation, EntityRegistry, Event)
//! - **availability**: Station maintenance windows, damage and repair
//! - **lifecycle**: Satellite motion, damage and destruction
//! - **allocation**: Connection requests, wait queues, signal loss
//! - **transfer**: Per-tick data movement with burst, jamming and errors
//! - **outage**: Time satellites spend cut off with data still on board
//! - **scenario**: Generating entities from setup counts
//! - **orchestrator**: Main simulation loop, snapshots and final report
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. All data values are i64 (MB); all time values are u64 (ms)
//! 2. All randomness is deterministic (seeded RNG)
//! 3. A satellite holds at most one link; a station never exceeds capacity
//! 4. FFI boundary is minimal and safe

// Module declarations
pub mod allocation;
pub mod availability;
pub mod config;
pub mod core;
pub mod lifecycle;
pub mod models;
pub mod orchestrator;
pub mod outage;
pub mod rng;
pub mod scenario;
pub mod transfer;

// Re-exports for convenience
pub use config::{AllocationPolicyKind, ConfigError, SimulationParams, StationQueuePolicy};
pub use core::{ContactId, SatelliteId, StationId, TickContext, TimeManager};
pub use models::{
    EntityRegistry, Event, EventKind, EventLog, GroundStation, Satellite, SatelliteConfig, SatelliteKind,
    StationConfig,
};
pub use orchestrator::{
    Orchestrator, OrchestratorConfig, RunState, SimulationError, SimulationReport, SimulationSnapshot, StopReason,
    TickResult,
};
pub use rng::{RandomSource, RngManager};
pub use scenario::SetupParams;

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn satlink_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::orchestrator::PySimulation>()?;
    Ok(())
}
