//! End-of-run report
//!
//! Built once, when the run stops, from the registry as it stood after the
//! stop sequence flushed outages, damage timers and links. Report generators
//! (text, PDF, charts) consume it verbatim.
//!
//! Every report carries a fresh run id and a fingerprint of the
//! configuration, so two reports can be matched to the same inputs.

use crate::core::{SatelliteId, StationId};
use crate::models::geometry::Position;
use crate::models::{DamageRecord, EventRecord, SatelliteKind, SatelliteStatus};
use crate::orchestrator::SimulationError;
use crate::outage::{OutageRecord, OutageStats};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// Report Structures
// ============================================================================

/// Why the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Stop requested and honoured at a tick boundary
    Requested,
    /// Configured duration elapsed
    DurationElapsed,
    /// Stopped directly between ticks
    Manual,
    /// Host shut the simulation down
    Terminated,
}

/// Destruction roster entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestroyedSatellite {
    pub satellite: SatelliteId,
    pub name: String,
    pub kind: SatelliteKind,
    pub destroyed_at_ms: u64,
    pub position: Position,
}

/// Data delivered to one station and its damage timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSummary {
    pub station: StationId,
    pub name: String,
    pub received_data_mb: i64,
    pub damage_history: Vec<DamageRecord>,
}

/// Final state of a satellite still in the registry at stop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteSummary {
    pub satellite: SatelliteId,
    pub name: String,
    pub kind: SatelliteKind,
    pub status: SatelliteStatus,
    pub initial_backlog_mb: i64,
    pub remaining_backlog_mb: i64,
}

/// End-of-run aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub run_id: String,
    pub config_fingerprint: String,
    pub stop_reason: StopReason,
    pub ticks: usize,
    pub ended_at_ms: u64,
    pub total_delivered_mb: i64,
    pub stations: Vec<StationSummary>,
    pub satellites: Vec<SatelliteSummary>,
    pub destroyed: Vec<DestroyedSatellite>,
    pub outages: Vec<OutageRecord>,
    pub outage_stats: OutageStats,
    pub events: Vec<EventRecord>,
}

impl SimulationReport {
    pub fn station(&self, id: StationId) -> Option<&StationSummary> {
        self.stations.iter().find(|s| s.station == id)
    }

    pub fn to_json(&self) -> Result<String, SimulationError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SimulationError::Serialization(format!("report serialization failed: {}", e)))
    }
}

// ============================================================================
// Config Fingerprint
// ============================================================================

/// Deterministic SHA-256 of a configuration
///
/// Object keys are sorted before hashing so that map ordering never changes
/// the result.
pub fn compute_config_fingerprint<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config)
        .map_err(|e| SimulationError::Serialization(format!("config serialization failed: {}", e)))?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value))
        .map_err(|e| SimulationError::Serialization(format!("config serialization failed: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
