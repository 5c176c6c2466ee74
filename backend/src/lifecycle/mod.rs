//! Satellite lifecycle
//!
//! Operational satellites move along their orbit and roll for damage once per
//! tick. A damaged satellite drops its link, leaves every wait queue and sits
//! inert in `Degrading` until `satellite_repair_duration_ms` has passed, then
//! becomes `Destroyed`. There is no way back: destruction is reported once and
//! the satellite is removed from the registry at the start of the next tick.

use crate::config::SimulationParams;
use crate::core::{SatelliteId, TickContext};
use crate::models::{DisconnectReason, EntityRegistry, Event, EventKind, SatelliteStatus};
use crate::rng::RandomSource;
use tracing::{debug, info};

/// Satellites whose status changed during one lifecycle pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifecycleOutcome {
    pub damaged: Vec<SatelliteId>,
    pub destroyed: Vec<SatelliteId>,
}

/// Advance every satellite's state machine by one tick
///
/// Satellites are visited in ascending id order; one random sample is drawn
/// per Operational satellite.
pub fn update_satellites(
    registry: &mut EntityRegistry,
    rng: &mut dyn RandomSource,
    params: &SimulationParams,
    ctx: TickContext,
    events: &mut Vec<Event>,
) -> LifecycleOutcome {
    let mut outcome = LifecycleOutcome::default();

    for sat_id in registry.satellite_ids() {
        let Some(sat) = registry.satellite_mut(sat_id) else {
            continue;
        };

        match sat.status() {
            SatelliteStatus::Operational => {
                sat.advance(ctx.dt_ms);
                if !rng.chance(params.satellite_damage_probability) {
                    continue;
                }
                if let Ok(link) = registry.disconnect(sat_id) {
                    events.push(ctx.event(EventKind::Disconnected {
                        satellite: sat_id,
                        station: link.station,
                        reason: DisconnectReason::SatelliteDamaged,
                    }));
                }
                registry.purge_from_queues(sat_id);
                if let Some(sat) = registry.satellite_mut(sat_id) {
                    sat.begin_degrading(ctx.now_ms);
                }
                info!(satellite = %sat_id, now_ms = ctx.now_ms, "satellite damaged");
                events.push(ctx.event(EventKind::SatelliteDamaged { satellite: sat_id }));
                outcome.damaged.push(sat_id);
            }
            SatelliteStatus::Degrading { since_ms } => {
                if ctx.now_ms.saturating_sub(since_ms) < params.satellite_repair_duration_ms {
                    continue;
                }
                sat.mark_destroyed(ctx.now_ms);
                let position = sat.position();
                info!(satellite = %sat_id, now_ms = ctx.now_ms, "satellite destroyed");
                events.push(ctx.event(EventKind::SatelliteDestroyed {
                    satellite: sat_id,
                    position,
                }));
                outcome.destroyed.push(sat_id);
            }
            SatelliteStatus::Destroyed { .. } => {
                debug!(satellite = %sat_id, "awaiting cleanup");
            }
        }
    }

    outcome
}

/// Remove satellites destroyed in an earlier tick
///
/// Returns the removed ids.
pub fn cleanup_destroyed(registry: &mut EntityRegistry) -> Vec<SatelliteId> {
    let doomed: Vec<SatelliteId> = registry
        .satellites()
        .filter(|s| matches!(s.status(), SatelliteStatus::Destroyed { .. }))
        .map(|s| s.id())
        .collect();
    for id in &doomed {
        registry.remove_satellite(*id);
    }
    doomed
}
