//! Station availability
//!
//! Runs first in every tick and decides each station's operating status:
//!
//! - **Maintenance** is schedule driven: a station is `OfflineMaintenance`
//!   while the tick start falls inside one of its `[start, end)` windows.
//! - **Damage** is stochastic: a station that is not already damaged rolls
//!   `station_damage_probability` every tick, maintenance included. A damaged
//!   station repairs after `station_repair_duration_ms` and discards
//!   `station_data_loss_fraction` of its stored data.
//!
//! Leaving `Online` disconnects every linked satellite in the same tick. The
//! wait queue is kept or emptied according to [`StationQueuePolicy`].
//!
//! # Example
//!
//! ```rust
//! use satlink_core::availability::update_stations;
//! use satlink_core::config::SimulationParams;
//! use satlink_core::core::TickContext;
//! use satlink_core::models::{EntityRegistry, StationConfig, StationStatus};
//! use satlink_core::rng::ScriptedSource;
//!
//! let mut registry = EntityRegistry::new();
//! let id = registry.add_station(&StationConfig::on_surface("GS", 0.0).with_maintenance(100, 200));
//! let params = SimulationParams::deterministic();
//! let mut rng = ScriptedSource::never();
//! let mut events = Vec::new();
//!
//! update_stations(&mut registry, &mut rng, &params, TickContext::new(1, 100, 100), &mut events);
//! assert_eq!(registry.station(id).unwrap().status(), StationStatus::OfflineMaintenance);
//! ```

use crate::config::{SimulationParams, StationQueuePolicy};
use crate::core::{StationId, TickContext};
use crate::models::{DisconnectReason, EntityRegistry, Event, EventKind, StationStatus};
use crate::rng::RandomSource;
use tracing::{debug, info};

/// Status changes made during one availability pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvailabilityOutcome {
    pub damaged: Vec<StationId>,
    pub repaired: Vec<StationId>,
    pub entered_maintenance: Vec<StationId>,
    pub left_maintenance: Vec<StationId>,
    /// Links torn down because their station left Online
    pub links_dropped: usize,
}

/// Advance every station's state machine by one tick
///
/// Stations are visited in ascending id order. Exactly one random sample is
/// drawn per station that is not already damaged.
pub fn update_stations(
    registry: &mut EntityRegistry,
    rng: &mut dyn RandomSource,
    params: &SimulationParams,
    ctx: TickContext,
    events: &mut Vec<Event>,
) -> AvailabilityOutcome {
    let mut outcome = AvailabilityOutcome::default();

    for station_id in registry.station_ids() {
        let Some(station) = registry.station(station_id) else {
            continue;
        };
        let status = station.status();
        let in_window = station.in_maintenance_window(ctx.now_ms);

        match status {
            StationStatus::Damaged { since_ms } => {
                if ctx.now_ms.saturating_sub(since_ms) < params.station_repair_duration_ms {
                    continue;
                }
                let Some(station) = registry.station_mut(station_id) else {
                    continue;
                };
                let lost = station.close_damage(ctx.now_ms, params.station_data_loss_fraction);
                let next = if in_window {
                    StationStatus::OfflineMaintenance
                } else {
                    StationStatus::Online
                };
                station.set_status(next);
                info!(station = %station_id, data_lost_mb = lost, "station repaired");
                events.push(ctx.event(EventKind::StationRepaired {
                    station: station_id,
                    data_lost_mb: lost,
                }));
                outcome.repaired.push(station_id);
                if in_window {
                    events.push(ctx.event(EventKind::MaintenanceStarted { station: station_id }));
                    outcome.entered_maintenance.push(station_id);
                }
            }
            StationStatus::Online | StationStatus::OfflineMaintenance => {
                if rng.chance(params.station_damage_probability) {
                    // damage supersedes the maintenance interval; a repair
                    // inside a window opens a new one
                    if status == StationStatus::OfflineMaintenance {
                        events.push(ctx.event(EventKind::MaintenanceEnded { station: station_id }));
                        outcome.left_maintenance.push(station_id);
                    }
                    outcome.links_dropped += take_offline(
                        registry,
                        station_id,
                        StationStatus::Damaged { since_ms: ctx.now_ms },
                        DisconnectReason::StationDamaged,
                        params.queue_policy,
                        ctx,
                        events,
                    );
                    if let Some(station) = registry.station_mut(station_id) {
                        station.open_damage(ctx.now_ms);
                    }
                    info!(station = %station_id, now_ms = ctx.now_ms, "station damaged");
                    events.push(ctx.event(EventKind::StationDamaged { station: station_id }));
                    outcome.damaged.push(station_id);
                    continue;
                }

                match (status, in_window) {
                    (StationStatus::Online, true) => {
                        outcome.links_dropped += take_offline(
                            registry,
                            station_id,
                            StationStatus::OfflineMaintenance,
                            DisconnectReason::StationMaintenance,
                            params.queue_policy,
                            ctx,
                            events,
                        );
                        debug!(station = %station_id, "maintenance started");
                        events.push(ctx.event(EventKind::MaintenanceStarted { station: station_id }));
                        outcome.entered_maintenance.push(station_id);
                    }
                    (StationStatus::OfflineMaintenance, false) => {
                        if let Some(station) = registry.station_mut(station_id) {
                            station.set_status(StationStatus::Online);
                        }
                        debug!(station = %station_id, "maintenance ended");
                        events.push(ctx.event(EventKind::MaintenanceEnded { station: station_id }));
                        outcome.left_maintenance.push(station_id);
                    }
                    _ => {}
                }
            }
        }
    }

    outcome
}

/// Switch a station to a non-online status, dropping its links
///
/// Returns the number of links torn down.
fn take_offline(
    registry: &mut EntityRegistry,
    station_id: StationId,
    status: StationStatus,
    reason: DisconnectReason,
    queue_policy: StationQueuePolicy,
    ctx: TickContext,
    events: &mut Vec<Event>,
) -> usize {
    let dropped = registry.disconnect_all_at(station_id);
    for (satellite, _) in &dropped {
        debug!(satellite = %satellite, station = %station_id, reason = reason.as_str(), "link dropped");
        events.push(ctx.event(EventKind::Disconnected {
            satellite: *satellite,
            station: station_id,
            reason,
        }));
    }

    if let Some(station) = registry.station_mut(station_id) {
        station.set_status(status);
        if queue_policy == StationQueuePolicy::Clear {
            let cleared = station.clear_queue();
            if !cleared.is_empty() {
                events.push(ctx.event(EventKind::QueueCleared {
                    station: station_id,
                    satellites: cleared,
                }));
            }
        }
    }

    dropped.len()
}
