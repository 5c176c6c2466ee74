//! Snapshot - read-only view of the simulation between ticks
//!
//! A snapshot is a plain serde value: rendering collaborators can hold on to
//! it, ship it across an FFI boundary or dump it as JSON without touching the
//! live engine.

use crate::core::{SatelliteId, StationId};
use crate::models::geometry::{CommArc, Position};
use crate::models::{
    GroundStation, Link, MaintenanceWindow, QueueEntry, Satellite, SatelliteKind, SatelliteStatus, StationStatus,
};
use crate::orchestrator::engine::RunState;
use serde::{Deserialize, Serialize};

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Complete post-tick roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// Ticks executed so far
    pub tick: usize,
    /// Virtual time (ms)
    pub time_ms: u64,
    pub speed_multiplier: f64,
    pub run_state: RunState,
    pub satellites: Vec<SatelliteSnapshot>,
    pub stations: Vec<StationSnapshot>,
}

/// Satellite state snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteSnapshot {
    pub id: SatelliteId,
    pub name: String,
    pub kind: SatelliteKind,
    pub priority: u8,
    pub status: SatelliteStatus,
    pub orbit_radius_km: f64,
    pub angle: f64,
    pub position: Position,
    pub data_backlog_mb: i64,
    pub data_sent_this_contact_mb: i64,
    pub per_contact_limit_mb: i64,
    pub link: Option<Link>,
}

impl From<&Satellite> for SatelliteSnapshot {
    fn from(sat: &Satellite) -> Self {
        SatelliteSnapshot {
            id: sat.id(),
            name: sat.name().to_string(),
            kind: sat.kind(),
            priority: sat.priority(),
            status: sat.status(),
            orbit_radius_km: sat.orbit_radius_km(),
            angle: sat.angle(),
            position: sat.position(),
            data_backlog_mb: sat.data_backlog(),
            data_sent_this_contact_mb: sat.data_sent_this_contact(),
            per_contact_limit_mb: sat.per_contact_limit(),
            link: sat.link(),
        }
    }
}

/// Station state snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSnapshot {
    pub id: StationId,
    pub name: String,
    pub status: StationStatus,
    pub position: Position,
    pub comm_radius_km: f64,
    pub arc: Option<CommArc>,
    pub capacity: usize,
    pub connected: Vec<SatelliteId>,
    pub queue: Vec<QueueEntry>,
    pub maintenance: Vec<MaintenanceWindow>,
    pub received_data_mb: i64,
    pub max_received_mb: Option<i64>,
}

impl From<&GroundStation> for StationSnapshot {
    fn from(station: &GroundStation) -> Self {
        StationSnapshot {
            id: station.id(),
            name: station.name().to_string(),
            status: station.status(),
            position: station.position(),
            comm_radius_km: station.comm_radius_km(),
            arc: station.arc(),
            capacity: station.capacity(),
            connected: station.connected().iter().copied().collect(),
            queue: station.queue().to_vec(),
            maintenance: station.maintenance_windows().to_vec(),
            received_data_mb: station.received_data(),
            max_received_mb: station.max_received(),
        }
    }
}

impl SimulationSnapshot {
    pub fn satellite(&self, id: SatelliteId) -> Option<&SatelliteSnapshot> {
        self.satellites.iter().find(|s| s.id == id)
    }

    pub fn station(&self, id: StationId) -> Option<&StationSnapshot> {
        self.stations.iter().find(|s| s.id == id)
    }

    /// Links currently held, as (satellite, station) pairs
    pub fn links(&self) -> Vec<(SatelliteId, StationId)> {
        self.satellites
            .iter()
            .filter_map(|s| s.link.map(|l| (s.id, l.station)))
            .collect()
    }
}
