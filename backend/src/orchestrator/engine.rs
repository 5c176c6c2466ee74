//! Orchestrator Engine
//!
//! Main simulation loop integrating all components:
//! - Station availability (maintenance windows, damage, repair)
//! - Connection allocation (queue admission, new requests, signal loss)
//! - Satellite lifecycle (orbital motion, damage, destruction)
//! - Data transfer (burst windows, jamming, transmission errors)
//! - Outage tracking
//! - Event logging (complete simulation history)
//!
//! # Architecture
//!
//! ```text
//! For each tick t (Δt = raw Δt × speed multiplier):
//! 0. Remove satellites destroyed in an earlier tick
//! 1. Update station availability
//! 2. Admit queued satellites into free slots
//! 3. Advance satellites; release links that lost line of sight
//! 4. Serve new connection requests
//! 5. Transfer data
//! 6. Reconcile outages
//! 7. Log events, verify invariants, advance the clock, honour stop requests
//! ```
//!
//! # Example
//!
//! ```rust
//! use satlink_core::config::SimulationParams;
//! use satlink_core::models::{SatelliteConfig, StationConfig};
//! use satlink_core::orchestrator::{Orchestrator, OrchestratorConfig};
//!
//! let config = OrchestratorConfig {
//!     rng_seed: 12345,
//!     params: SimulationParams::deterministic(),
//!     speed_multiplier: 1.0,
//!     satellites: vec![SatelliteConfig::new("SAT-1", 6961.0, 0.0, 2_000)],
//!     stations: vec![StationConfig::on_surface("GS-1", 0.0)],
//! };
//!
//! let mut orchestrator = Orchestrator::new(config).unwrap();
//! for _ in 0..5 {
//!     orchestrator.tick(1000).unwrap();
//! }
//! let report = orchestrator.stop();
//! assert_eq!(report.total_delivered_mb, 2_000);
//! ```

use crate::allocation::{self, AllocationPolicy};
use crate::availability;
use crate::config::{ConfigError, SimulationParams};
use crate::core::{SatelliteId, StationId, TickContext, TimeManager};
use crate::lifecycle;
use crate::models::geometry::Position;
use crate::models::{
    DisconnectReason, EntityRegistry, Event, EventCategory, EventKind, EventLog, LinkError, OutageClosure,
    SatelliteConfig, SatelliteStatus, StationConfig, StationStatus,
};
use crate::orchestrator::report::{
    compute_config_fingerprint, DestroyedSatellite, SatelliteSummary, SimulationReport, StationSummary, StopReason,
};
use crate::orchestrator::snapshot::{SatelliteSnapshot, SimulationSnapshot, StationSnapshot};
use crate::outage::OutageTracker;
use crate::rng::{RandomSource, RngManager};
use crate::scenario::{self, PlacementError, SetupParams};
use crate::transfer::TransferEngine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ============================================================================
// Configuration Types
// ============================================================================

/// Complete orchestrator configuration
///
/// Everything needed to reproduce a run: the seed, the engine parameters and
/// the initial entities. Its fingerprint is stamped on the final report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// RNG seed for deterministic simulation
    pub rng_seed: u64,

    #[serde(default)]
    pub params: SimulationParams,

    /// Initial multiplier applied to every raw Δt
    #[serde(default = "default_speed_multiplier")]
    pub speed_multiplier: f64,

    #[serde(default)]
    pub satellites: Vec<SatelliteConfig>,

    #[serde(default)]
    pub stations: Vec<StationConfig>,
}

fn default_speed_multiplier() -> f64 {
    1.0
}

impl OrchestratorConfig {
    /// Empty scenario with default parameters
    pub fn new(rng_seed: u64) -> Self {
        Self {
            rng_seed,
            params: SimulationParams::default(),
            speed_multiplier: 1.0,
            satellites: Vec::new(),
            stations: Vec::new(),
        }
    }

    /// Scenario generated from setup counts
    ///
    /// The setup draws come from `seed`; the run itself uses a seed derived
    /// from the same stream, recorded in `rng_seed`.
    pub fn from_setup(setup: &SetupParams, params: SimulationParams, seed: u64) -> Self {
        let mut rng = RngManager::new(seed);
        let plan = scenario::build_scenario(setup, &mut rng);
        Self {
            rng_seed: rng.next(),
            params: SimulationParams {
                duration_ms: Some(setup.duration_ms),
                ..params
            },
            speed_multiplier: 1.0,
            satellites: plan.satellites,
            stations: plan.stations,
        }
    }
}

// ============================================================================
// Results and Errors
// ============================================================================

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Built, no tick executed yet
    Ready,
    Running,
    /// Stop sequence done; the registry is empty and the report is final
    Stopped,
}

/// Result of a single tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickResult {
    /// Tick number
    pub tick: usize,
    /// Virtual time at the start of the tick (ms)
    pub time_ms: u64,
    /// Scaled Δt actually simulated (ms)
    pub dt_ms: u64,
    pub connections: usize,
    pub queued: usize,
    pub disconnections: usize,
    pub delivered_mb: i64,
    pub destroyed: Vec<SatelliteId>,
    pub events_logged: usize,
    /// The run stopped at the end of this tick
    pub stopped: bool,
}

/// Simulation error types
#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("satellite not found: {0}")]
    SatelliteNotFound(SatelliteId),

    #[error("station not found: {0}")]
    StationNotFound(StationId),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("simulation already stopped")]
    Stopped,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Main simulation orchestrator
pub struct Orchestrator {
    run_id: Uuid,
    config_fingerprint: String,
    params: SimulationParams,
    registry: EntityRegistry,
    time: TimeManager,
    rng: Box<dyn RandomSource>,
    policy: Box<dyn AllocationPolicy>,
    transfer: TransferEngine,
    outages: OutageTracker,
    events: EventLog,
    destroyed: Vec<DestroyedSatellite>,
    run_state: RunState,
    stop_requested: bool,
    report: Option<SimulationReport>,
}

impl Orchestrator {
    /// Build an orchestrator seeded from `config.rng_seed`
    pub fn new(config: OrchestratorConfig) -> Result<Self, SimulationError> {
        let rng = Box::new(RngManager::new(config.rng_seed));
        Self::with_random_source(config, rng)
    }

    /// Build an orchestrator drawing every stochastic decision from `rng`
    ///
    /// # Errors
    /// `InvalidConfig` for any structurally invalid satellite or station.
    /// Out-of-range parameters are not errors: they are reset to their
    /// defaults with a warning.
    pub fn with_random_source(config: OrchestratorConfig, rng: Box<dyn RandomSource>) -> Result<Self, SimulationError> {
        for sat in &config.satellites {
            sat.validate().map_err(SimulationError::InvalidConfig)?;
        }
        for station in &config.stations {
            station.validate().map_err(SimulationError::InvalidConfig)?;
        }

        let config_fingerprint = compute_config_fingerprint(&config)?;

        let mut params = config.params.clone();
        params.sanitize();

        let mut time = TimeManager::new();
        if !time.set_speed_multiplier(config.speed_multiplier) {
            warn!(
                speed_multiplier = config.speed_multiplier,
                "invalid initial speed multiplier, using 1.0"
            );
        }

        let mut registry = EntityRegistry::new();
        for station in &config.stations {
            registry.add_station(station);
        }
        for sat in &config.satellites {
            registry.add_satellite(sat, params.per_contact_limit_mb);
        }

        let policy = allocation::policy_for(params.allocation_policy);
        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            satellites = registry.num_satellites(),
            stations = registry.num_stations(),
            policy = policy.name(),
            "simulation created"
        );

        Ok(Self {
            run_id,
            config_fingerprint,
            params,
            registry,
            time,
            rng,
            policy,
            transfer: TransferEngine::new(),
            outages: OutageTracker::new(),
            events: EventLog::new(),
            destroyed: Vec::new(),
            run_state: RunState::Ready,
            stop_requested: false,
            report: None,
        })
    }

    /// Generate a scenario from setup counts and build it
    pub fn from_setup(setup: &SetupParams, params: SimulationParams, seed: u64) -> Result<Self, SimulationError> {
        Self::new(OrchestratorConfig::from_setup(setup, params, seed))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config_fingerprint(&self) -> &str {
        &self.config_fingerprint
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn event_log(&self) -> &EventLog {
        &self.events
    }

    pub fn outages(&self) -> &OutageTracker {
        &self.outages
    }

    pub fn transfer_engine(&self) -> &TransferEngine {
        &self.transfer
    }

    pub fn destroyed(&self) -> &[DestroyedSatellite] {
        &self.destroyed
    }

    pub fn current_tick(&self) -> usize {
        self.time.current_tick()
    }

    pub fn now_ms(&self) -> u64 {
        self.time.now_ms()
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.time.speed_multiplier()
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_stopped(&self) -> bool {
        self.run_state == RunState::Stopped
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Final report, once the run has stopped
    pub fn report(&self) -> Option<&SimulationReport> {
        self.report.as_ref()
    }

    /// Post-tick roster for rendering
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            tick: self.time.current_tick(),
            time_ms: self.time.now_ms(),
            speed_multiplier: self.time.speed_multiplier(),
            run_state: self.run_state,
            satellites: self.registry.satellites().map(SatelliteSnapshot::from).collect(),
            stations: self.registry.stations().map(StationSnapshot::from).collect(),
        }
    }

    // ========================================================================
    // Live control
    // ========================================================================

    /// Update one parameter from raw text
    ///
    /// Accepts every [`SimulationParams`] key plus `speed_multiplier`. On error
    /// the previous value is kept.
    pub fn set_param(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        if key == "speed_multiplier" {
            let value = raw.trim().parse::<f64>().map_err(|_| {
                let err = ConfigError::Unparseable {
                    key: key.to_string(),
                    raw: raw.to_string(),
                };
                warn!(error = %err, "rejected parameter update, keeping previous value");
                err
            })?;
            return self.set_speed_multiplier(value);
        }

        self.params.set_param(key, raw)?;
        if key == "allocation_policy" {
            self.policy = allocation::policy_for(self.params.allocation_policy);
            info!(policy = self.policy.name(), "allocation policy changed");
        }
        Ok(())
    }

    /// Change the live speed multiplier
    pub fn set_speed_multiplier(&mut self, multiplier: f64) -> Result<(), ConfigError> {
        if self.time.set_speed_multiplier(multiplier) {
            debug!(multiplier, "speed multiplier changed");
            return Ok(());
        }
        let err = ConfigError::OutOfRange {
            key: "speed_multiplier".to_string(),
            value: multiplier.to_string(),
            allowed: "[0.1, 20]",
        };
        warn!(error = %err, "rejected speed multiplier, keeping previous value");
        Err(err)
    }

    /// Ask the run to stop at the end of the next tick
    pub fn request_stop(&mut self) {
        if self.run_state != RunState::Stopped {
            info!(tick = self.time.current_tick(), "stop requested");
            self.stop_requested = true;
        }
    }

    // ========================================================================
    // Entity management
    // ========================================================================

    /// Add a satellite, at setup or mid-run
    pub fn add_satellite(&mut self, config: &SatelliteConfig) -> Result<SatelliteId, SimulationError> {
        self.ensure_not_stopped()?;
        config.validate().map_err(SimulationError::InvalidConfig)?;
        let id = self.registry.add_satellite(config, self.params.per_contact_limit_mb);
        debug!(satellite = %id, name = %config.name, "satellite added");
        Ok(id)
    }

    /// Remove a satellite, closing its link and any open outage
    pub fn remove_satellite(&mut self, id: SatelliteId) -> Result<(), SimulationError> {
        self.ensure_not_stopped()?;
        if self.registry.satellite(id).is_none() {
            return Err(SimulationError::SatelliteNotFound(id));
        }
        let ctx = self.boundary_context();
        let mut events = Vec::new();
        if let Some((_, Some(link))) = self.registry.remove_satellite(id) {
            events.push(ctx.event(EventKind::Disconnected {
                satellite: id,
                station: link.station,
                reason: DisconnectReason::Removed,
            }));
        }
        self.outages
            .close(id, OutageClosure::SatelliteRemoved, ctx, &mut events);
        self.events.extend(events);
        debug!(satellite = %id, "satellite removed");
        Ok(())
    }

    /// Add a station from a full definition
    pub fn add_station(&mut self, config: &StationConfig) -> Result<StationId, SimulationError> {
        self.ensure_not_stopped()?;
        config.validate().map_err(SimulationError::InvalidConfig)?;
        Ok(self.registry.add_station(config))
    }

    /// Place a surface station at a chosen angle
    ///
    /// # Errors
    /// `Placement` if the spot is closer than the minimum separation to an
    /// existing station.
    pub fn place_station_at(&mut self, name: &str, surface_angle: f64) -> Result<StationId, SimulationError> {
        self.ensure_not_stopped()?;
        let config = scenario::station_at(name, surface_angle, &self.station_positions())?;
        Ok(self.registry.add_station(&config))
    }

    /// Place a surface station at a random free angle
    ///
    /// Returns `None` (and logs a warning) when no free spot was found.
    pub fn place_random_station(&mut self, name: &str) -> Option<StationId> {
        if self.run_state == RunState::Stopped {
            return None;
        }
        let existing = self.station_positions();
        match scenario::random_station(name, &existing, self.rng.as_mut()) {
            Ok(config) => Some(self.registry.add_station(&config)),
            Err(err) => {
                warn!(error = %err, "station not placed");
                None
            }
        }
    }

    /// Operator adjustment of a station's comm radius
    ///
    /// Returns the clamped radius actually applied.
    pub fn adjust_comm_radius(&mut self, station: StationId, radius_km: f64) -> Result<f64, SimulationError> {
        let st = self
            .registry
            .station_mut(station)
            .ok_or(SimulationError::StationNotFound(station))?;
        let applied = st.adjust_comm_radius(radius_km);
        if applied != radius_km {
            warn!(station = %station, requested = radius_km, applied, "comm radius clamped");
        }
        Ok(applied)
    }

    // ========================================================================
    // Tick loop
    // ========================================================================

    /// Execute one simulation tick of `raw_dt_ms` (before speed scaling)
    ///
    /// # Panics
    /// Panics if a registry invariant is broken at the end of the tick.
    pub fn tick(&mut self, raw_dt_ms: u64) -> Result<TickResult, SimulationError> {
        self.ensure_not_stopped()?;
        if self.run_state == RunState::Ready {
            info!(run_id = %self.run_id, "simulation started");
            self.run_state = RunState::Running;
        }

        let ctx = self.time.begin_tick(raw_dt_ms);
        let mut events: Vec<Event> = Vec::new();

        // STEP 0: CLEANUP
        let removed = lifecycle::cleanup_destroyed(&mut self.registry);
        if !removed.is_empty() {
            debug!(count = removed.len(), "destroyed satellites removed");
        }

        // STEP 1: STATION AVAILABILITY
        availability::update_stations(
            &mut self.registry,
            self.rng.as_mut(),
            &self.params,
            ctx,
            &mut events,
        );

        // STEP 2: QUEUE ADMISSION
        let admitted = allocation::process_queues(&mut self.registry, ctx, &mut events);

        // STEP 3: SATELLITE LIFECYCLE + SIGNAL LOSS
        let lifecycle = lifecycle::update_satellites(
            &mut self.registry,
            self.rng.as_mut(),
            &self.params,
            ctx,
            &mut events,
        );
        for id in &lifecycle.destroyed {
            if let Some(sat) = self.registry.satellite(*id) {
                self.destroyed.push(DestroyedSatellite {
                    satellite: *id,
                    name: sat.name().to_string(),
                    kind: sat.kind(),
                    destroyed_at_ms: ctx.now_ms,
                    position: sat.position(),
                });
            }
        }
        allocation::release_out_of_range(&mut self.registry, ctx, &mut events);

        // STEP 4: NEW REQUESTS
        let matched = allocation::match_new_requests(&mut self.registry, self.policy.as_ref(), ctx, &mut events);

        // STEP 5: DATA TRANSFER
        self.transfer.observe(&events);
        let transfer = self.transfer.step(
            &mut self.registry,
            self.rng.as_mut(),
            &self.params,
            ctx,
            &mut events,
        );

        // STEP 6: OUTAGES
        let outage_events = self.outages.reconcile(&self.registry, ctx, &events);
        events.extend(outage_events);

        // STEP 7: LOG, VERIFY, ADVANCE
        let disconnections = events
            .iter()
            .filter(|e| e.category() == EventCategory::Disconnect)
            .count();
        let events_logged = events.len();
        self.events.extend(events);

        if let Err(violation) = self.registry.verify_invariants() {
            panic!("invariant violated at tick {}: {}", ctx.tick, violation);
        }

        self.time.advance(ctx.dt_ms);

        let stop_reason = if self.stop_requested {
            Some(StopReason::Requested)
        } else {
            match self.params.duration_ms {
                Some(limit) if self.time.now_ms() >= limit => Some(StopReason::DurationElapsed),
                _ => None,
            }
        };
        if let Some(reason) = stop_reason {
            self.finish(reason);
        }

        Ok(TickResult {
            tick: ctx.tick,
            time_ms: ctx.now_ms,
            dt_ms: ctx.dt_ms,
            connections: admitted.connected.len() + matched.connected.len(),
            queued: matched.queued.len(),
            disconnections,
            delivered_mb: transfer.delivered_mb,
            destroyed: lifecycle.destroyed,
            events_logged,
            stopped: stop_reason.is_some(),
        })
    }

    /// Tick until the run stops or `max_ticks` have executed
    pub fn run(&mut self, max_ticks: usize, raw_dt_ms: u64) -> Result<Vec<TickResult>, SimulationError> {
        let mut results = Vec::new();
        for _ in 0..max_ticks {
            let result = self.tick(raw_dt_ms)?;
            let stopped = result.stopped;
            results.push(result);
            if stopped {
                break;
            }
        }
        Ok(results)
    }

    // ========================================================================
    // Stop
    // ========================================================================

    /// Stop now (between ticks) and return the final report
    ///
    /// Calling it again returns the same report.
    pub fn stop(&mut self) -> SimulationReport {
        if self.report.is_none() {
            self.finish(StopReason::Manual);
        }
        self.report.clone().unwrap_or_else(|| self.build_report(StopReason::Manual))
    }

    /// Shut the simulation down for good
    pub fn terminate(mut self) -> SimulationReport {
        if self.report.is_none() {
            self.finish(StopReason::Terminated);
        }
        match self.report.take() {
            Some(report) => report,
            None => self.build_report(StopReason::Terminated),
        }
    }

    /// Flush open state into the log, build the report and clear the registry
    fn finish(&mut self, reason: StopReason) {
        let ctx = self.boundary_context();

        let mut events = self.outages.flush(ctx);

        for station in self.registry.stations() {
            if let StationStatus::Damaged { since_ms } = station.status() {
                events.push(ctx.event(EventKind::StationDamageUnresolved {
                    station: station.id(),
                    since_ms,
                }));
            }
        }
        for sat in self.registry.satellites() {
            if let SatelliteStatus::Degrading { since_ms } = sat.status() {
                events.push(ctx.event(EventKind::SatelliteDamageUnresolved {
                    satellite: sat.id(),
                    since_ms,
                }));
            }
        }

        for sat_id in self.registry.satellite_ids() {
            if let Ok(link) = self.registry.disconnect(sat_id) {
                events.push(ctx.event(EventKind::Disconnected {
                    satellite: sat_id,
                    station: link.station,
                    reason: DisconnectReason::SimulationStopped,
                }));
            }
        }

        self.events.extend(events);
        let report = self.build_report(reason);
        self.registry.clear();
        self.run_state = RunState::Stopped;
        self.stop_requested = false;
        info!(
            run_id = %self.run_id,
            ?reason,
            ticks = report.ticks,
            delivered_mb = report.total_delivered_mb,
            "simulation stopped"
        );
        self.report = Some(report);
    }

    fn build_report(&self, reason: StopReason) -> SimulationReport {
        let stations: Vec<StationSummary> = self
            .registry
            .stations()
            .map(|st| StationSummary {
                station: st.id(),
                name: st.name().to_string(),
                received_data_mb: st.received_data(),
                damage_history: st.damage_history().to_vec(),
            })
            .collect();

        SimulationReport {
            run_id: self.run_id.to_string(),
            config_fingerprint: self.config_fingerprint.clone(),
            stop_reason: reason,
            ticks: self.time.current_tick(),
            ended_at_ms: self.time.now_ms(),
            total_delivered_mb: stations.iter().map(|s| s.received_data_mb).sum(),
            stations,
            satellites: self
                .registry
                .satellites()
                .map(|sat| SatelliteSummary {
                    satellite: sat.id(),
                    name: sat.name().to_string(),
                    kind: sat.kind(),
                    status: sat.status(),
                    initial_backlog_mb: sat.initial_backlog(),
                    remaining_backlog_mb: sat.data_backlog(),
                })
                .collect(),
            destroyed: self.destroyed.clone(),
            outages: self.outages.records().to_vec(),
            outage_stats: self.outages.stats(),
            events: self.events.records(),
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn ensure_not_stopped(&self) -> Result<(), SimulationError> {
        if self.run_state == RunState::Stopped {
            return Err(SimulationError::Stopped);
        }
        Ok(())
    }

    /// Context for work done between ticks
    fn boundary_context(&self) -> TickContext {
        TickContext::new(self.time.current_tick(), self.time.now_ms(), 0)
    }

    fn station_positions(&self) -> Vec<Position> {
        self.registry.stations().map(|s| s.position()).collect()
    }
}
