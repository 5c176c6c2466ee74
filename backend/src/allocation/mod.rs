//! Connection allocation
//!
//! Decides which satellite occupies which station slot. Runs in three places
//! in the tick:
//!
//! 1. [`process_queues`] admits waiting satellites into slots that opened up
//! 2. [`release_out_of_range`] drops links whose satellite moved out of view
//! 3. [`match_new_requests`] serves every satellite that still needs a link
//!
//! # Eligibility
//!
//! A satellite may link with a station when the station is Online, the
//! satellite is Operational, the distance is within the station's comm radius
//! and, for directional stations, the bearing from station to satellite lies
//! inside the station's arc.
//!
//! # Request ordering
//!
//! Each requesting satellite targets its nearest eligible station (ties go to
//! the lower station id). The order in which requests are then served is
//! delegated to an [`AllocationPolicy`]:
//!
//! - [`PriorityClasses`]: every higher-priority request system-wide before any
//!   lower one, nearest first inside a class
//! - [`NearestFirst`]: nearest first regardless of priority
//!
//! A request that finds its station full is queued there; the queue itself is
//! always priority ordered.

use crate::config::AllocationPolicyKind;
use crate::core::{SatelliteId, StationId, TickContext};
use crate::models::{DisconnectReason, EntityRegistry, Event, EventKind, GroundStation, Satellite};
use tracing::debug;

pub mod nearest_first;
pub mod priority_classes;

pub use nearest_first::NearestFirst;
pub use priority_classes::PriorityClasses;

/// A satellite asking for a link with its nearest eligible station
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionRequest {
    pub satellite: SatelliteId,
    pub priority: u8,
    pub station: StationId,
    pub distance_km: f64,
}

/// Ordering of one tick's connection requests
pub trait AllocationPolicy: Send {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Sort `requests` into service order
    ///
    /// Implementations must produce a total, deterministic order.
    fn order_requests(&self, requests: &mut [ConnectionRequest]);
}

/// Build the policy selected in configuration
pub fn policy_for(kind: AllocationPolicyKind) -> Box<dyn AllocationPolicy> {
    match kind {
        AllocationPolicyKind::PriorityClasses => Box::new(PriorityClasses),
        AllocationPolicyKind::NearestFirst => Box::new(NearestFirst),
    }
}

/// Links created and requests queued during one allocation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationOutcome {
    pub connected: Vec<(SatelliteId, StationId)>,
    pub queued: Vec<(SatelliteId, StationId)>,
}

// ============================================================================
// Eligibility
// ============================================================================

/// Full eligibility test, status included
pub fn is_eligible(satellite: &Satellite, station: &GroundStation) -> bool {
    station.is_online() && satellite.is_operational() && station.covers(&satellite.position())
}

/// Nearest eligible station for `satellite`, ties to the lower station id
pub fn nearest_eligible_station(registry: &EntityRegistry, satellite: &Satellite) -> Option<(StationId, f64)> {
    let position = satellite.position();
    registry
        .stations()
        .filter(|st| is_eligible(satellite, st))
        .map(|st| (st.id(), st.distance_to(&position)))
        // ascending id order; on equal distance the earlier station is kept
        .fold(None, |best: Option<(StationId, f64)>, (id, dist)| match best {
            Some((_, best_dist)) if best_dist <= dist => best,
            _ => Some((id, dist)),
        })
}

// ============================================================================
// Queue admission
// ============================================================================

/// Admit waiting satellites into free slots
///
/// Stations are visited in ascending id order and their queues in queue
/// order. Ineligible entries stay queued; entries for satellites that no
/// longer need a link are dropped.
pub fn process_queues(registry: &mut EntityRegistry, ctx: TickContext, events: &mut Vec<Event>) -> AllocationOutcome {
    let mut outcome = AllocationOutcome::default();

    for station_id in registry.station_ids() {
        let entries = match registry.station(station_id) {
            Some(st) if st.is_online() && st.has_free_slot() => st.queue().to_vec(),
            _ => continue,
        };

        for entry in entries {
            let Some(station) = registry.station(station_id) else {
                break;
            };
            if !station.has_free_slot() {
                break;
            }

            let (needs_link, eligible) = match registry.satellite(entry.satellite) {
                Some(sat) => (sat.needs_link(), is_eligible(sat, station)),
                None => (false, false),
            };
            if !needs_link {
                if let Some(st) = registry.station_mut(station_id) {
                    st.dequeue(entry.satellite);
                }
                continue;
            }
            if !eligible {
                continue;
            }

            if let Ok(link) = registry.connect(entry.satellite, station_id, ctx.now_ms) {
                debug!(satellite = %entry.satellite, station = %station_id, "admitted from queue");
                events.push(ctx.event(EventKind::Connected {
                    satellite: entry.satellite,
                    station: station_id,
                    contact: link.contact,
                    from_queue: true,
                }));
                outcome.connected.push((entry.satellite, station_id));
            }
        }
    }

    outcome
}

// ============================================================================
// Out-of-range release
// ============================================================================

/// Drop links whose satellite is no longer inside its station's range or arc
pub fn release_out_of_range(registry: &mut EntityRegistry, ctx: TickContext, events: &mut Vec<Event>) -> Vec<SatelliteId> {
    let lost: Vec<SatelliteId> = registry
        .satellites()
        .filter_map(|sat| {
            let link = sat.link()?;
            let station = registry.station(link.station)?;
            (!station.covers(&sat.position())).then(|| sat.id())
        })
        .collect();

    for sat_id in &lost {
        if let Ok(link) = registry.disconnect(*sat_id) {
            debug!(satellite = %sat_id, station = %link.station, "signal lost");
            events.push(ctx.event(EventKind::Disconnected {
                satellite: *sat_id,
                station: link.station,
                reason: DisconnectReason::OutOfRange,
            }));
        }
    }
    lost
}

// ============================================================================
// New requests
// ============================================================================

/// Collect this tick's requests in ascending satellite id order
pub fn collect_requests(registry: &EntityRegistry) -> Vec<ConnectionRequest> {
    registry
        .satellites()
        .filter(|sat| sat.needs_link())
        .filter_map(|sat| {
            nearest_eligible_station(registry, sat).map(|(station, distance_km)| ConnectionRequest {
                satellite: sat.id(),
                priority: sat.priority(),
                station,
                distance_km,
            })
        })
        .collect()
}

/// Serve every satellite that needs a link
///
/// Each request connects immediately when its station has a free slot and
/// is queued there otherwise (once per station).
pub fn match_new_requests(
    registry: &mut EntityRegistry,
    policy: &dyn AllocationPolicy,
    ctx: TickContext,
    events: &mut Vec<Event>,
) -> AllocationOutcome {
    let mut outcome = AllocationOutcome::default();
    let mut requests = collect_requests(registry);
    policy.order_requests(&mut requests);

    for request in requests {
        let has_slot = registry
            .station(request.station)
            .map(|st| st.has_free_slot())
            .unwrap_or(false);

        if has_slot {
            if let Ok(link) = registry.connect(request.satellite, request.station, ctx.now_ms) {
                debug!(
                    satellite = %request.satellite,
                    station = %request.station,
                    policy = policy.name(),
                    "connected"
                );
                events.push(ctx.event(EventKind::Connected {
                    satellite: request.satellite,
                    station: request.station,
                    contact: link.contact,
                    from_queue: false,
                }));
                outcome.connected.push((request.satellite, request.station));
            }
            continue;
        }

        let Some(station) = registry.station_mut(request.station) else {
            continue;
        };
        if station.enqueue(request.satellite, request.priority, ctx.now_ms) {
            let position = station
                .queue()
                .iter()
                .position(|e| e.satellite == request.satellite)
                .map(|i| i + 1)
                .unwrap_or(0);
            debug!(satellite = %request.satellite, station = %request.station, position, "queued");
            events.push(ctx.event(EventKind::Queued {
                satellite: request.satellite,
                station: request.station,
                position,
            }));
            outcome.queued.push((request.satellite, request.station));
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Position, SatelliteConfig, StationConfig};
    use std::f64::consts::PI;

    #[test]
    fn test_nearest_tie_goes_to_lower_station_id() {
        let mut registry = EntityRegistry::new();
        // two stations mirrored around the satellite
        let a = registry.add_station(&StationConfig::at("A", Position::new(6900.0, 100.0)));
        registry.add_station(&StationConfig::at("B", Position::new(6900.0, -100.0)));
        let sat = registry.add_satellite(&SatelliteConfig::new("S", 6900.0, 0.0, 100), 10);
        let s = registry.satellite(sat).unwrap();
        assert_eq!(nearest_eligible_station(&registry, s), Some((a, 100.0)));
    }

    #[test]
    fn test_out_of_range_release() {
        let mut registry = EntityRegistry::new();
        let st = registry.add_station(&StationConfig::on_surface("A", 0.0));
        let sat = registry.add_satellite(&SatelliteConfig::new("S", 6900.0, PI, 100), 10);
        registry.connect(sat, st, 0).unwrap();
        // half an orbit later the satellite is on the far side of the Earth
        registry.satellite_mut(sat).unwrap().advance(1000);

        let mut events = Vec::new();
        let lost = release_out_of_range(&mut registry, TickContext::new(1, 1000, 1000), &mut events);
        assert_eq!(lost, vec![sat]);
        assert!(matches!(
            events[0].kind,
            EventKind::Disconnected {
                reason: DisconnectReason::OutOfRange,
                ..
            }
        ));
    }

    #[test]
    fn test_queue_admission_skips_ineligible_entry() {
        let mut registry = EntityRegistry::new();
        let st = registry.add_station(&StationConfig::on_surface("A", 0.0).with_capacity(1));
        let far = registry.add_satellite(&SatelliteConfig::new("far", 6900.0, 0.0, 100).with_angle(PI), 10);
        let near = registry.add_satellite(&SatelliteConfig::new("near", 6900.0, 0.0, 100), 10);
        registry.station_mut(st).unwrap().enqueue(far, 1, 0);
        registry.station_mut(st).unwrap().enqueue(near, 0, 0);

        let mut events = Vec::new();
        let outcome = process_queues(&mut registry, TickContext::new(0, 0, 10), &mut events);
        assert_eq!(outcome.connected, vec![(near, st)]);
        assert!(registry.station(st).unwrap().is_queued(far));
    }
}
