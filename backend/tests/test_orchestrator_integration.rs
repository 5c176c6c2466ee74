//! End-to-end orchestrator tests
//!
//! Full tick loop over small hand-built constellations: data conservation,
//! snapshots, mid-run entity changes and the final report.

use satlink_core::config::{AllocationPolicyKind, SimulationParams};
use satlink_core::models::geometry::Position;
use satlink_core::models::{DisconnectReason, EventKind};
use satlink_core::{
    Orchestrator, OrchestratorConfig, RunState, SatelliteConfig, SimulationError, StationConfig, StopReason,
};
use std::f64::consts::PI;

const ORBIT_KM: f64 = 6961.0;

fn single_pair() -> OrchestratorConfig {
    OrchestratorConfig {
        rng_seed: 11,
        params: SimulationParams::deterministic(),
        speed_multiplier: 1.0,
        satellites: vec![SatelliteConfig::new("SAT-1", ORBIT_KM, 0.0, 50_000)],
        stations: vec![StationConfig::at("GS-1", Position::new(6371.0, 0.0))],
    }
}

/// Moving satellites over three omnidirectional, uncapped stations
fn moving_constellation() -> OrchestratorConfig {
    let satellites = (0..6)
        .map(|i| {
            SatelliteConfig::new(format!("SAT-{}", i), ORBIT_KM + 100.0 * i as f64, 0.02 + 0.01 * i as f64, 40_000)
                .with_angle(i as f64)
        })
        .collect();
    let stations = (0..3)
        .map(|i| {
            let angle = i as f64 * 2.0 * PI / 3.0;
            StationConfig::at(format!("GS-{}", i), Position::from_polar(6371.0, angle)).with_capacity(1)
        })
        .collect();
    OrchestratorConfig {
        rng_seed: 21,
        params: SimulationParams::deterministic(),
        speed_multiplier: 1.0,
        satellites,
        stations,
    }
}

#[test]
fn test_data_is_conserved_across_ticks() {
    let mut sim = Orchestrator::new(moving_constellation()).unwrap();
    let initial: i64 = sim.registry().satellites().map(|s| s.initial_backlog()).sum();

    let mut delivered = 0;
    for _ in 0..120 {
        let result = sim.tick(500).unwrap();
        delivered += result.delivered_mb;

        let remaining: i64 = sim.registry().satellites().map(|s| s.data_backlog()).sum();
        let received: i64 = sim.registry().stations().map(|s| s.received_data()).sum();
        assert_eq!(initial - remaining, received);
        assert_eq!(received, delivered);
    }
    assert!(delivered > 0);

    let report = sim.stop();
    assert_eq!(report.total_delivered_mb, delivered);
}

#[test]
fn test_snapshot_reflects_post_tick_state() {
    let mut sim = Orchestrator::new(single_pair()).unwrap();
    let sat = sim.registry().satellite_ids()[0];
    let gs = sim.registry().station_ids()[0];

    let before = sim.snapshot();
    assert_eq!(before.run_state, RunState::Ready);
    assert!(before.links().is_empty());

    sim.tick(1000).unwrap();
    let snapshot = sim.snapshot();

    assert_eq!(snapshot.tick, 1);
    assert_eq!(snapshot.time_ms, 1000);
    assert_eq!(snapshot.run_state, RunState::Running);
    assert_eq!(snapshot.links(), vec![(sat, gs)]);
    assert!(snapshot.station(gs).unwrap().connected.contains(&sat));
    let sat_view = snapshot.satellite(sat).unwrap();
    assert!(sat_view.data_backlog_mb < 50_000);
    assert_eq!(
        50_000 - sat_view.data_backlog_mb,
        snapshot.station(gs).unwrap().received_data_mb
    );

    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains("SAT-1"));
}

#[test]
fn test_remove_satellite_mid_run() {
    let mut sim = Orchestrator::new(single_pair()).unwrap();
    let sat = sim.registry().satellite_ids()[0];
    let gs = sim.registry().station_ids()[0];
    sim.tick(1000).unwrap();

    sim.remove_satellite(sat).unwrap();

    assert!(sim.registry().satellite(sat).is_none());
    assert!(sim.registry().station(gs).unwrap().connected().is_empty());
    assert!(sim.event_log().events().iter().any(|e| matches!(
        e.kind,
        EventKind::Disconnected { satellite, reason: DisconnectReason::Removed, .. } if satellite == sat
    )));
    assert!(matches!(
        sim.remove_satellite(sat),
        Err(SimulationError::SatelliteNotFound(_))
    ));

    // the run carries on without it
    let result = sim.tick(1000).unwrap();
    assert_eq!(result.delivered_mb, 0);
}

#[test]
fn test_added_satellite_joins_next_tick() {
    let mut sim = Orchestrator::new(single_pair()).unwrap();
    sim.tick(1000).unwrap();

    let late = sim
        .add_satellite(&SatelliteConfig::new("LATE", ORBIT_KM, 0.0, 1_000).with_angle(0.1))
        .unwrap();
    sim.tick(1000).unwrap();

    assert!(sim.registry().satellite(late).unwrap().link().is_some());
}

#[test]
fn test_station_placement_respects_separation() {
    let config = OrchestratorConfig {
        stations: vec![StationConfig::on_surface("GS-1", 0.0)],
        ..single_pair()
    };
    let mut sim = Orchestrator::new(config).unwrap();

    assert!(matches!(
        sim.place_station_at("GS-2", 0.01),
        Err(SimulationError::Placement(_))
    ));
    let far = sim.place_station_at("GS-3", PI).unwrap();
    assert_eq!(sim.registry().station(far).unwrap().name(), "GS-3");
    assert_eq!(sim.registry().num_stations(), 2);
}

#[test]
fn test_comm_radius_adjustment_is_clamped() {
    let mut sim = Orchestrator::new(single_pair()).unwrap();
    let gs = sim.registry().station_ids()[0];

    assert_eq!(sim.adjust_comm_radius(gs, 100.0).unwrap(), 940.0);
    assert_eq!(sim.adjust_comm_radius(gs, 9_000.0).unwrap(), 7500.0);
    assert_eq!(sim.adjust_comm_radius(gs, 3_000.0).unwrap(), 3000.0);
}

#[test]
fn test_policy_switch_takes_effect() {
    let mut sim = Orchestrator::new(moving_constellation()).unwrap();
    sim.tick(1000).unwrap();

    sim.set_param("allocation_policy", "nearest_first").unwrap();
    assert_eq!(sim.params().allocation_policy, AllocationPolicyKind::NearestFirst);

    for _ in 0..10 {
        sim.tick(1000).unwrap();
    }
    assert!(sim.registry().verify_invariants().is_ok());
}

#[test]
fn test_event_log_cursor() {
    let mut sim = Orchestrator::new(single_pair()).unwrap();
    sim.tick(1000).unwrap();
    let cursor = sim.event_log().len();
    assert!(cursor > 0);

    sim.tick(1000).unwrap();
    let fresh = sim.event_log().since(cursor);
    assert!(fresh.iter().all(|e| e.tick == 1));
}

#[test]
fn test_report_json() {
    let mut sim = Orchestrator::new(single_pair()).unwrap();
    sim.run(3, 1000).unwrap();

    let report = sim.stop();
    let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(report.stop_reason, StopReason::Manual);
    assert_eq!(value["stop_reason"], "manual");
    assert_eq!(value["ticks"], 3);
    assert_eq!(value["total_delivered_mb"], report.total_delivered_mb);
    assert_eq!(value["config_fingerprint"].as_str().unwrap().len(), 64);
    assert_eq!(report.stations.len(), 1);
    assert_eq!(report.stations[0].received_data_mb, report.total_delivered_mb);
}

#[test]
fn test_terminate_returns_report() {
    let mut sim = Orchestrator::new(single_pair()).unwrap();
    sim.tick(1000).unwrap();

    let report = sim.terminate();

    assert_eq!(report.stop_reason, StopReason::Terminated);
    assert_eq!(report.ticks, 1);
}
