//! Ground station model
//!
//! A station has a fixed position, a communication radius, an optional
//! directional arc and a fixed number of link slots. Satellites that find the
//! station full wait in a priority-ordered queue.
//!
//! CRITICAL: All data volumes are i64 (megabytes)

use crate::core::{SatelliteId, StationId};
use crate::models::geometry::{CommArc, Position, EARTH_RADIUS_KM};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default simultaneous links per station
pub const DEFAULT_CAPACITY: usize = 5;

/// Default communication radius (km)
pub const DEFAULT_COMM_RADIUS_KM: f64 = 4500.0;

/// Operator adjustment bounds for the communication radius (km)
pub const MIN_COMM_RADIUS_KM: f64 = 940.0;
pub const MAX_COMM_RADIUS_KM: f64 = 7500.0;

/// Default total width of a surface station's visibility arc (degrees)
pub const DEFAULT_ARC_WIDTH_DEG: f64 = 210.0;

/// Default storage ceiling for received data (MB)
pub const DEFAULT_MAX_RECEIVED_MB: i64 = 500_000;

/// Operating status
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StationStatus {
    Online,
    OfflineMaintenance,
    Damaged { since_ms: u64 },
}

impl StationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StationStatus::Online => "online",
            StationStatus::OfflineMaintenance => "maintenance",
            StationStatus::Damaged { .. } => "damaged",
        }
    }
}

/// Scheduled outage `[start_ms, end_ms)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl MaintenanceWindow {
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        Self { start_ms, end_ms }
    }

    pub fn contains(&self, now_ms: u64) -> bool {
        self.start_ms <= now_ms && now_ms < self.end_ms
    }
}

/// One damage episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageRecord {
    pub started_at_ms: u64,
    /// `None` while the station is still damaged
    pub repaired_at_ms: Option<u64>,
    pub data_lost_mb: i64,
}

/// Waiting satellite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub satellite: SatelliteId,
    pub priority: u8,
    pub enqueued_at_ms: u64,
}

/// Definition of one ground station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    pub name: String,
    pub position: Position,
    #[serde(default = "default_comm_radius")]
    pub comm_radius_km: f64,
    /// `None` means omnidirectional
    #[serde(default)]
    pub arc: Option<CommArc>,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub maintenance: Vec<MaintenanceWindow>,
    #[serde(default)]
    pub max_received_mb: Option<i64>,
}

fn default_comm_radius() -> f64 {
    DEFAULT_COMM_RADIUS_KM
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl StationConfig {
    /// Station on the Earth's surface at `surface_angle`, facing outward
    ///
    /// # Example
    /// ```
    /// use satlink_core::models::StationConfig;
    ///
    /// let config = StationConfig::on_surface("Svalbard", 1.2)
    ///     .with_capacity(2)
    ///     .with_maintenance(100, 200);
    /// assert_eq!(config.capacity, 2);
    /// assert!(config.arc.is_some());
    /// ```
    pub fn on_surface(name: impl Into<String>, surface_angle: f64) -> Self {
        Self {
            name: name.into(),
            position: Position::from_polar(EARTH_RADIUS_KM, surface_angle),
            comm_radius_km: DEFAULT_COMM_RADIUS_KM,
            arc: Some(CommArc::from_width_degrees(surface_angle, DEFAULT_ARC_WIDTH_DEG)),
            capacity: DEFAULT_CAPACITY,
            maintenance: Vec::new(),
            max_received_mb: Some(DEFAULT_MAX_RECEIVED_MB),
        }
    }

    /// Omnidirectional station at an arbitrary point
    pub fn at(name: impl Into<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            position,
            comm_radius_km: DEFAULT_COMM_RADIUS_KM,
            arc: None,
            capacity: DEFAULT_CAPACITY,
            maintenance: Vec::new(),
            max_received_mb: None,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_comm_radius(mut self, radius_km: f64) -> Self {
        self.comm_radius_km = radius_km;
        self
    }

    pub fn with_arc(mut self, arc: CommArc) -> Self {
        self.arc = Some(arc);
        self
    }

    pub fn omnidirectional(mut self) -> Self {
        self.arc = None;
        self
    }

    pub fn with_maintenance(mut self, start_ms: u64, end_ms: u64) -> Self {
        self.maintenance.push(MaintenanceWindow::new(start_ms, end_ms));
        self
    }

    pub fn with_max_received(mut self, max_mb: Option<i64>) -> Self {
        self.max_received_mb = max_mb;
        self
    }

    /// Reason the definition cannot be simulated, if any
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err(format!("station '{}': capacity must be at least 1", self.name));
        }
        if !self.comm_radius_km.is_finite() || self.comm_radius_km <= 0.0 {
            return Err(format!("station '{}': comm radius must be positive", self.name));
        }
        if let Some(window) = self.maintenance.iter().find(|w| w.start_ms >= w.end_ms) {
            return Err(format!(
                "station '{}': maintenance window [{}, {}) is empty or inverted",
                self.name, window.start_ms, window.end_ms
            ));
        }
        if matches!(self.max_received_mb, Some(max) if max < 0) {
            return Err(format!("station '{}': negative storage ceiling", self.name));
        }
        Ok(())
    }
}

/// Ground station state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundStation {
    id: StationId,
    name: String,
    position: Position,
    comm_radius_km: f64,
    arc: Option<CommArc>,
    capacity: usize,
    connected: BTreeSet<SatelliteId>,
    queue: Vec<QueueEntry>,
    status: StationStatus,
    maintenance: Vec<MaintenanceWindow>,
    received_data: i64,
    max_received: Option<i64>,
    damage_history: Vec<DamageRecord>,
}

impl GroundStation {
    pub fn new(id: StationId, config: &StationConfig) -> Self {
        Self {
            id,
            name: config.name.clone(),
            position: config.position,
            comm_radius_km: config.comm_radius_km,
            arc: config.arc,
            capacity: config.capacity,
            connected: BTreeSet::new(),
            queue: Vec::new(),
            status: StationStatus::Online,
            maintenance: config.maintenance.clone(),
            received_data: 0,
            max_received: config.max_received_mb,
            damage_history: Vec::new(),
        }
    }

    pub fn id(&self) -> StationId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn comm_radius_km(&self) -> f64 {
        self.comm_radius_km
    }

    pub fn arc(&self) -> Option<CommArc> {
        self.arc
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn status(&self) -> StationStatus {
        self.status
    }

    pub fn is_online(&self) -> bool {
        matches!(self.status, StationStatus::Online)
    }

    pub fn connected(&self) -> &BTreeSet<SatelliteId> {
        &self.connected
    }

    pub fn has_free_slot(&self) -> bool {
        self.connected.len() < self.capacity
    }

    pub fn queue(&self) -> &[QueueEntry] {
        &self.queue
    }

    pub fn is_queued(&self, satellite: SatelliteId) -> bool {
        self.queue.iter().any(|e| e.satellite == satellite)
    }

    pub fn maintenance_windows(&self) -> &[MaintenanceWindow] {
        &self.maintenance
    }

    pub fn in_maintenance_window(&self, now_ms: u64) -> bool {
        self.maintenance.iter().any(|w| w.contains(now_ms))
    }

    pub fn received_data(&self) -> i64 {
        self.received_data
    }

    pub fn max_received(&self) -> Option<i64> {
        self.max_received
    }

    pub fn damage_history(&self) -> &[DamageRecord] {
        &self.damage_history
    }

    pub fn distance_to(&self, point: &Position) -> f64 {
        self.position.distance_to(point)
    }

    /// Range and arc test, ignoring status
    pub fn covers(&self, point: &Position) -> bool {
        if self.distance_to(point) > self.comm_radius_km {
            return false;
        }
        match self.arc {
            Some(arc) => arc.contains(self.position.bearing_to(point)),
            None => true,
        }
    }

    /// Set the communication radius, clamped to the operator bounds
    ///
    /// Returns the radius actually applied.
    pub fn adjust_comm_radius(&mut self, radius_km: f64) -> f64 {
        let applied = if radius_km.is_finite() {
            radius_km.clamp(MIN_COMM_RADIUS_KM, MAX_COMM_RADIUS_KM)
        } else {
            self.comm_radius_km
        };
        self.comm_radius_km = applied;
        applied
    }

    /// Insert into the wait queue in priority order
    ///
    /// The entry goes after every entry of equal or higher priority, keeping
    /// FIFO order within a priority class. Returns `false` if already queued.
    pub fn enqueue(&mut self, satellite: SatelliteId, priority: u8, now_ms: u64) -> bool {
        if self.is_queued(satellite) {
            return false;
        }
        let at = self
            .queue
            .iter()
            .position(|e| e.priority < priority)
            .unwrap_or(self.queue.len());
        self.queue.insert(
            at,
            QueueEntry {
                satellite,
                priority,
                enqueued_at_ms: now_ms,
            },
        );
        true
    }

    pub fn dequeue(&mut self, satellite: SatelliteId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|e| e.satellite != satellite);
        self.queue.len() != before
    }

    pub fn clear_queue(&mut self) -> Vec<SatelliteId> {
        self.queue.drain(..).map(|e| e.satellite).collect()
    }

    /// Store received data, capped at the storage ceiling
    ///
    /// Returns the amount actually stored.
    pub fn store(&mut self, amount: i64) -> i64 {
        let room = match self.max_received {
            Some(max) => (max - self.received_data).max(0),
            None => i64::MAX - self.received_data,
        };
        let stored = amount.min(room);
        self.received_data += stored;
        stored
    }

    pub(crate) fn set_status(&mut self, status: StationStatus) {
        self.status = status;
    }

    pub(crate) fn add_connected(&mut self, satellite: SatelliteId) {
        self.connected.insert(satellite);
    }

    pub(crate) fn remove_connected(&mut self, satellite: SatelliteId) -> bool {
        self.connected.remove(&satellite)
    }

    pub(crate) fn open_damage(&mut self, now_ms: u64) {
        self.damage_history.push(DamageRecord {
            started_at_ms: now_ms,
            repaired_at_ms: None,
            data_lost_mb: 0,
        });
    }

    /// Close the open damage record and discard `loss_fraction` of stored data
    ///
    /// Returns the amount discarded.
    pub(crate) fn close_damage(&mut self, now_ms: u64, loss_fraction: f64) -> i64 {
        let lost = (self.received_data as f64 * loss_fraction) as i64;
        self.received_data -= lost;
        if let Some(record) = self
            .damage_history
            .iter_mut()
            .rev()
            .find(|r| r.repaired_at_ms.is_none())
        {
            record.repaired_at_ms = Some(now_ms);
            record.data_lost_mb = lost;
        }
        lost
    }
}
