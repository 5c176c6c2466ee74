//! Tests for station maintenance windows, damage and repair

use satlink_core::availability::update_stations;
use satlink_core::config::{SimulationParams, StationQueuePolicy};
use satlink_core::core::TickContext;
use satlink_core::models::{
    DamageRecord, DisconnectReason, EntityRegistry, Event, EventKind, SatelliteConfig, StationConfig,
    StationStatus,
};
use satlink_core::rng::ScriptedSource;
use satlink_core::{Orchestrator, OrchestratorConfig};

fn ctx(tick: usize) -> TickContext {
    TickContext::new(tick, tick as u64 * 1000, 1000)
}

fn single_pair(params: SimulationParams, station: StationConfig) -> Orchestrator {
    Orchestrator::new(OrchestratorConfig {
        rng_seed: 11,
        params,
        speed_multiplier: 1.0,
        satellites: vec![SatelliteConfig::new("S", 6961.0, 0.0, 1_000_000).with_contact_limit(1_000_000)],
        stations: vec![station],
    })
    .unwrap()
}

// ============================================================================
// Maintenance
// ============================================================================

#[test]
fn test_maintenance_window_drops_and_restores_link() {
    let station = StationConfig::on_surface("GS", 0.0)
        .with_max_received(None)
        .with_maintenance(2000, 4000);
    let mut sim = single_pair(SimulationParams::deterministic(), station);

    let results = sim.run(5, 1000).unwrap();

    assert_eq!(results[0].connections, 1);
    assert_eq!(results[2].delivered_mb, 0);
    assert_eq!(results[3].delivered_mb, 0);
    assert_eq!(results[4].connections, 1);

    let log = sim.event_log();
    let tick2: Vec<&EventKind> = log.events_at_tick(2).into_iter().map(|e| &e.kind).collect();
    assert!(tick2.iter().any(|k| matches!(k, EventKind::MaintenanceStarted { .. })));
    assert!(tick2.iter().any(|k| matches!(
        k,
        EventKind::Disconnected {
            reason: DisconnectReason::StationMaintenance,
            ..
        }
    )));
    assert!(log
        .events_at_tick(4)
        .iter()
        .any(|e| matches!(e.kind, EventKind::MaintenanceEnded { .. })));
}

#[test]
fn test_maintenance_opens_outage_until_reconnect() {
    let station = StationConfig::on_surface("GS", 0.0)
        .with_max_received(None)
        .with_maintenance(2000, 4000);
    let mut sim = single_pair(SimulationParams::deterministic(), station);
    let sat = sim.registry().satellite_ids()[0];
    let gs = sim.registry().station_ids()[0];

    sim.run(3, 1000).unwrap();

    let started: Vec<_> = sim
        .event_log()
        .events_at_tick(2)
        .into_iter()
        .filter(|e| matches!(e.kind, EventKind::OutageStarted { .. }))
        .collect();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].time_ms, 2000);
    assert!(matches!(
        started[0].kind,
        EventKind::OutageStarted { satellite, last_station } if satellite == sat && last_station == gs
    ));
    assert_eq!(sim.outages().records().len(), 1);
    assert_eq!(sim.outages().records()[0].started_at_ms, 2000);
    assert!(sim.outages().is_in_outage(sat));

    // window ends at 4000: the link comes back and the outage closes
    sim.run(2, 1000).unwrap();

    let record = &sim.outages().records()[0];
    assert_eq!(record.ended_at_ms, Some(4000));
    assert_eq!(record.duration_ms(), Some(2000));
    assert!(record.was_restored());
    assert!(!sim.outages().is_in_outage(sat));
    assert!(sim
        .event_log()
        .events_at_tick(4)
        .iter()
        .any(|e| matches!(e.kind, EventKind::OutageEnded { duration_ms: 2000, .. })));
}

#[test]
fn test_window_boundaries_use_tick_start() {
    let mut registry = EntityRegistry::new();
    let st = registry.add_station(&StationConfig::on_surface("GS", 0.0).with_maintenance(1500, 2000));
    let params = SimulationParams::deterministic();
    let mut rng = ScriptedSource::never();
    let mut events = Vec::new();

    // tick [1000, 2000) overlaps the window but starts before it
    update_stations(&mut registry, &mut rng, &params, ctx(1), &mut events);
    assert_eq!(registry.station(st).unwrap().status(), StationStatus::Online);

    // window end is exclusive
    update_stations(&mut registry, &mut rng, &params, ctx(2), &mut events);
    assert_eq!(registry.station(st).unwrap().status(), StationStatus::Online);
    assert!(events.is_empty());
}

#[test]
fn test_consecutive_windows() {
    let mut registry = EntityRegistry::new();
    let st = registry.add_station(
        &StationConfig::on_surface("GS", 0.0)
            .with_maintenance(1000, 2000)
            .with_maintenance(3000, 4000),
    );
    let params = SimulationParams::deterministic();
    let mut rng = ScriptedSource::never();
    let mut events = Vec::new();

    let statuses: Vec<StationStatus> = (0..5)
        .map(|t| {
            update_stations(&mut registry, &mut rng, &params, ctx(t), &mut events);
            registry.station(st).unwrap().status()
        })
        .collect();

    assert_eq!(
        statuses,
        vec![
            StationStatus::Online,
            StationStatus::OfflineMaintenance,
            StationStatus::Online,
            StationStatus::OfflineMaintenance,
            StationStatus::Online,
        ]
    );
}

// ============================================================================
// Damage and repair
// ============================================================================

#[test]
fn test_damage_repair_discards_stored_data() {
    let station = StationConfig::on_surface("GS", 0.0).with_max_received(None);
    let mut sim = single_pair(SimulationParams::deterministic(), station);
    let gs = sim.registry().station_ids()[0];

    sim.run(5, 1000).unwrap();
    // three burst ticks then two base ticks
    assert_eq!(sim.registry().station(gs).unwrap().received_data(), 4000);

    sim.set_param("station_damage_probability", "1").unwrap();
    let damaged = sim.tick(1000).unwrap();
    sim.set_param("station_damage_probability", "0").unwrap();

    assert_eq!(damaged.delivered_mb, 0);
    assert_eq!(damaged.disconnections, 1);
    assert_eq!(
        sim.registry().station(gs).unwrap().status(),
        StationStatus::Damaged { since_ms: 5000 }
    );

    // repair duration 5000 ms: back at t = 10000
    let results = sim.run(4, 1000).unwrap();
    assert!(results.iter().all(|r| r.delivered_mb == 0));
    assert!(!sim.registry().station(gs).unwrap().is_online());

    let repaired = sim.tick(1000).unwrap();
    let station = sim.registry().station(gs).unwrap();
    assert_eq!(station.status(), StationStatus::Online);
    assert_eq!(
        station.damage_history(),
        &[DamageRecord {
            started_at_ms: 5000,
            repaired_at_ms: Some(10_000),
            data_lost_mb: 2000,
        }]
    );
    // half lost, then a base-rate tick on the reconnected contact
    assert_eq!(repaired.delivered_mb, 500);
    assert_eq!(station.received_data(), 2500);
    assert!(sim
        .event_log()
        .events_at_tick(10)
        .iter()
        .any(|e| matches!(e.kind, EventKind::StationRepaired { data_lost_mb: 2000, .. })));
}

#[test]
fn test_repair_inside_window_goes_to_maintenance() {
    let mut registry = EntityRegistry::new();
    let st = registry.add_station(&StationConfig::on_surface("GS", 0.0).with_maintenance(1000, 9000));
    let params = SimulationParams {
        station_damage_probability: 1.0,
        station_repair_duration_ms: 2000,
        ..SimulationParams::deterministic()
    };
    let mut events = Vec::new();

    update_stations(&mut registry, &mut ScriptedSource::always(), &params, ctx(0), &mut events);
    assert!(matches!(
        registry.station(st).unwrap().status(),
        StationStatus::Damaged { .. }
    ));

    update_stations(&mut registry, &mut ScriptedSource::always(), &params, ctx(2), &mut events);
    assert_eq!(registry.station(st).unwrap().status(), StationStatus::OfflineMaintenance);
}

fn maintenance_marks(events: &[Event]) -> Vec<(usize, bool)> {
    events
        .iter()
        .filter_map(|e| match e.kind {
            EventKind::MaintenanceStarted { .. } => Some((e.tick, true)),
            EventKind::MaintenanceEnded { .. } => Some((e.tick, false)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_damage_during_window_closes_maintenance_interval() {
    let mut registry = EntityRegistry::new();
    let st = registry.add_station(&StationConfig::on_surface("GS", 0.0).with_maintenance(1000, 4000));
    let quiet = SimulationParams {
        station_repair_duration_ms: 5000,
        ..SimulationParams::deterministic()
    };
    let hostile = SimulationParams {
        station_damage_probability: 1.0,
        ..quiet.clone()
    };
    let mut events = Vec::new();

    update_stations(&mut registry, &mut ScriptedSource::never(), &quiet, ctx(1), &mut events);
    update_stations(&mut registry, &mut ScriptedSource::always(), &hostile, ctx(2), &mut events);
    for t in 3..8 {
        update_stations(&mut registry, &mut ScriptedSource::never(), &quiet, ctx(t), &mut events);
    }

    // repaired at 7000, after the window: straight back online
    assert_eq!(registry.station(st).unwrap().status(), StationStatus::Online);
    assert_eq!(maintenance_marks(&events), vec![(1, true), (2, false)]);
    let damaged_at = events
        .iter()
        .position(|e| matches!(e.kind, EventKind::StationDamaged { .. }))
        .unwrap();
    let ended_at = events
        .iter()
        .position(|e| matches!(e.kind, EventKind::MaintenanceEnded { .. }))
        .unwrap();
    assert!(ended_at < damaged_at);
}

#[test]
fn test_damage_and_repair_inside_one_window_pair_up() {
    let mut registry = EntityRegistry::new();
    let st = registry.add_station(&StationConfig::on_surface("GS", 0.0).with_maintenance(1000, 9000));
    let quiet = SimulationParams {
        station_repair_duration_ms: 3000,
        ..SimulationParams::deterministic()
    };
    let hostile = SimulationParams {
        station_damage_probability: 1.0,
        ..quiet.clone()
    };
    let mut events = Vec::new();

    update_stations(&mut registry, &mut ScriptedSource::never(), &quiet, ctx(1), &mut events);
    update_stations(&mut registry, &mut ScriptedSource::always(), &hostile, ctx(2), &mut events);
    for t in 3..10 {
        update_stations(&mut registry, &mut ScriptedSource::never(), &quiet, ctx(t), &mut events);
    }

    assert_eq!(registry.station(st).unwrap().status(), StationStatus::Online);
    assert_eq!(
        maintenance_marks(&events),
        vec![(1, true), (2, false), (5, true), (9, false)]
    );
}

#[test]
fn test_damage_clears_queue_under_clear_policy() {
    let mut registry = EntityRegistry::new();
    let st = registry.add_station(&StationConfig::on_surface("GS", 0.0));
    let sat = registry.add_satellite(&SatelliteConfig::new("S", 6961.0, 0.0, 100), 10);
    registry.station_mut(st).unwrap().enqueue(sat, 0, 0);
    let params = SimulationParams {
        station_damage_probability: 1.0,
        queue_policy: StationQueuePolicy::Clear,
        ..SimulationParams::deterministic()
    };
    let mut events = Vec::new();

    let outcome = update_stations(&mut registry, &mut ScriptedSource::always(), &params, ctx(0), &mut events);

    assert_eq!(outcome.damaged, vec![st]);
    assert!(registry.station(st).unwrap().queue().is_empty());
    assert!(events.iter().any(|e| matches!(
        &e.kind,
        EventKind::QueueCleared { satellites, .. } if satellites == &vec![sat]
    )));
}

#[test]
fn test_damage_preserves_queue_by_default() {
    let mut registry = EntityRegistry::new();
    let st = registry.add_station(&StationConfig::on_surface("GS", 0.0));
    let sat = registry.add_satellite(&SatelliteConfig::new("S", 6961.0, 0.0, 100), 10);
    registry.station_mut(st).unwrap().enqueue(sat, 0, 0);
    let params = SimulationParams {
        station_damage_probability: 1.0,
        ..SimulationParams::deterministic()
    };
    let mut events = Vec::new();

    update_stations(&mut registry, &mut ScriptedSource::always(), &params, ctx(0), &mut events);

    assert_eq!(registry.station(st).unwrap().queue().len(), 1);
    assert!(registry.verify_invariants().is_ok());
}
