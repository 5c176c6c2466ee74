//! Satellite model
//!
//! A satellite circles the Earth at a fixed radius and carries a finite data
//! backlog that it drains through ground station contacts.
//!
//! CRITICAL: All data volumes are i64 (megabytes)

use crate::core::{ContactId, SatelliteId, StationId};
use crate::models::geometry::{wrap_angle, Position};
use serde::{Deserialize, Serialize};

/// Priority of an ordinary satellite
pub const PRIORITY_LOW: u8 = 0;

/// Priority of a mission-critical satellite
pub const PRIORITY_HIGH: u8 = 1;

/// Mission profile a satellite was spawned from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SatelliteKind {
    Commercial,
    Military,
    #[default]
    Custom,
}

impl SatelliteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SatelliteKind::Commercial => "commercial",
            SatelliteKind::Military => "military",
            SatelliteKind::Custom => "custom",
        }
    }
}

/// Satellite health
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SatelliteStatus {
    /// Moving, rolling for damage, eligible for links
    Operational,
    /// Inert since `since_ms`; will be destroyed after the repair duration
    Degrading { since_ms: u64 },
    /// Terminal
    Destroyed { at_ms: u64 },
}

impl SatelliteStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SatelliteStatus::Operational => "operational",
            SatelliteStatus::Degrading { .. } => "degrading",
            SatelliteStatus::Destroyed { .. } => "destroyed",
        }
    }
}

/// Active link held by a satellite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub station: StationId,
    pub contact: ContactId,
    pub started_at_ms: u64,
}

/// Definition of one satellite
///
/// `per_contact_limit_mb` falls back to the simulation-wide default when
/// absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteConfig {
    pub name: String,
    #[serde(default)]
    pub kind: SatelliteKind,
    #[serde(default)]
    pub priority: u8,
    /// Distance from the Earth's centre (km)
    pub orbit_radius_km: f64,
    /// Initial angular position (rad)
    #[serde(default)]
    pub initial_angle: f64,
    /// rad/s, negative for retrograde orbits
    pub angular_speed: f64,
    pub backlog_mb: i64,
    #[serde(default)]
    pub per_contact_limit_mb: Option<i64>,
}

impl SatelliteConfig {
    pub fn new(name: impl Into<String>, orbit_radius_km: f64, angular_speed: f64, backlog_mb: i64) -> Self {
        Self {
            name: name.into(),
            kind: SatelliteKind::Custom,
            priority: PRIORITY_LOW,
            orbit_radius_km,
            initial_angle: 0.0,
            angular_speed,
            backlog_mb,
            per_contact_limit_mb: None,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.initial_angle = angle;
        self
    }

    pub fn with_kind(mut self, kind: SatelliteKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_contact_limit(mut self, limit_mb: i64) -> Self {
        self.per_contact_limit_mb = Some(limit_mb);
        self
    }

    /// Reason the definition cannot be simulated, if any
    pub fn validate(&self) -> Result<(), String> {
        if !self.orbit_radius_km.is_finite() || self.orbit_radius_km <= 0.0 {
            return Err(format!(
                "satellite '{}': orbit radius must be positive, got {}",
                self.name, self.orbit_radius_km
            ));
        }
        if !self.angular_speed.is_finite() || !self.initial_angle.is_finite() {
            return Err(format!("satellite '{}': non-finite orbit parameters", self.name));
        }
        if self.backlog_mb < 0 {
            return Err(format!("satellite '{}': negative backlog", self.name));
        }
        if matches!(self.per_contact_limit_mb, Some(limit) if limit <= 0) {
            return Err(format!("satellite '{}': per-contact limit must be positive", self.name));
        }
        Ok(())
    }
}

/// Satellite state
///
/// # Example
/// ```
/// use satlink_core::core::SatelliteId;
/// use satlink_core::models::{Satellite, SatelliteConfig};
///
/// let config = SatelliteConfig::new("SAT-A", 7000.0, 0.1, 30_000);
/// let mut sat = Satellite::new(SatelliteId(0), &config, 10_000);
/// sat.advance(1000);
/// assert!((sat.angle() - 0.1).abs() < 1e-12);
/// assert!(sat.needs_link());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Satellite {
    id: SatelliteId,
    name: String,
    kind: SatelliteKind,
    priority: u8,
    orbit_radius_km: f64,
    angle: f64,
    angular_speed: f64,
    position: Position,
    initial_backlog: i64,
    data_backlog: i64,
    data_sent_this_contact: i64,
    /// Sub-MB remainder owed to the current contact, in thousandths of a MB
    #[serde(default)]
    pending_milli_mb: i64,
    per_contact_limit: i64,
    status: SatelliteStatus,
    link: Option<Link>,
}

impl Satellite {
    pub fn new(id: SatelliteId, config: &SatelliteConfig, default_contact_limit: i64) -> Self {
        let angle = wrap_angle(config.initial_angle);
        Self {
            id,
            name: config.name.clone(),
            kind: config.kind,
            priority: config.priority,
            orbit_radius_km: config.orbit_radius_km,
            angle,
            angular_speed: config.angular_speed,
            position: Position::from_polar(config.orbit_radius_km, angle),
            initial_backlog: config.backlog_mb,
            data_backlog: config.backlog_mb,
            data_sent_this_contact: 0,
            pending_milli_mb: 0,
            per_contact_limit: config.per_contact_limit_mb.unwrap_or(default_contact_limit),
            status: SatelliteStatus::Operational,
            link: None,
        }
    }

    pub fn id(&self) -> SatelliteId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SatelliteKind {
        self.kind
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn orbit_radius_km(&self) -> f64 {
        self.orbit_radius_km
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn angular_speed(&self) -> f64 {
        self.angular_speed
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn initial_backlog(&self) -> i64 {
        self.initial_backlog
    }

    pub fn data_backlog(&self) -> i64 {
        self.data_backlog
    }

    pub fn data_sent_this_contact(&self) -> i64 {
        self.data_sent_this_contact
    }

    pub fn pending_milli_mb(&self) -> i64 {
        self.pending_milli_mb
    }

    pub fn per_contact_limit(&self) -> i64 {
        self.per_contact_limit
    }

    pub fn status(&self) -> SatelliteStatus {
        self.status
    }

    pub fn link(&self) -> Option<Link> {
        self.link
    }

    pub fn is_operational(&self) -> bool {
        matches!(self.status, SatelliteStatus::Operational)
    }

    /// Operational, has data left, and holds no link
    pub fn needs_link(&self) -> bool {
        self.is_operational() && self.data_backlog > 0 && self.link.is_none()
    }

    /// Data this contact may still carry before the per-contact limit
    pub fn contact_allowance(&self) -> i64 {
        (self.per_contact_limit - self.data_sent_this_contact).max(0)
    }

    /// Move along the orbit by `dt_ms` of virtual time (no-op unless Operational)
    pub fn advance(&mut self, dt_ms: u64) {
        if !self.is_operational() {
            return;
        }
        let dt_s = dt_ms as f64 / 1000.0;
        self.angle = wrap_angle(self.angle + self.angular_speed * dt_s);
        self.position = Position::from_polar(self.orbit_radius_km, self.angle);
    }

    /// Commit a transferred amount
    ///
    /// # Panics
    /// Panics on a negative amount.
    pub fn record_transfer(&mut self, amount: i64) {
        assert!(amount >= 0, "transfer amount must be non-negative");
        self.data_backlog -= amount;
        self.data_sent_this_contact += amount;
    }

    /// Remainder below 1 MB that the next tick of this contact picks up
    pub(crate) fn carry_over(&mut self, milli_mb: i64) {
        self.pending_milli_mb = milli_mb.max(0);
    }

    /// Operational -> Degrading
    ///
    /// # Panics
    /// Panics if the satellite still holds a link or is not Operational.
    pub(crate) fn begin_degrading(&mut self, now_ms: u64) {
        assert!(self.link.is_none(), "degrading satellite must not hold a link");
        assert!(self.is_operational(), "only operational satellites can degrade");
        self.status = SatelliteStatus::Degrading { since_ms: now_ms };
    }

    /// Degrading -> Destroyed
    pub(crate) fn mark_destroyed(&mut self, now_ms: u64) {
        assert!(
            matches!(self.status, SatelliteStatus::Degrading { .. }),
            "only degrading satellites can be destroyed"
        );
        self.status = SatelliteStatus::Destroyed { at_ms: now_ms };
    }

    /// Attach a new contact; resets the per-contact counter and carry
    pub(crate) fn attach(&mut self, link: Link) {
        self.link = Some(link);
        self.data_sent_this_contact = 0;
        self.pending_milli_mb = 0;
    }

    pub(crate) fn detach(&mut self) -> Option<Link> {
        self.pending_milli_mb = 0;
        self.link.take()
    }
}
