//! Orchestrator - main simulation loop
//!
//! Drives every component once per tick, owns the event log and produces
//! the end-of-run report.
//!
//! See `engine.rs` for the tick loop.

pub mod engine;
pub mod report;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use engine::{Orchestrator, OrchestratorConfig, RunState, SimulationError, TickResult};
pub use report::{
    compute_config_fingerprint, DestroyedSatellite, SatelliteSummary, SimulationReport, StationSummary, StopReason,
};
pub use snapshot::{SatelliteSnapshot, SimulationSnapshot, StationSnapshot};
