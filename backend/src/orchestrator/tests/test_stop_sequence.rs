// Stop sequence: everything still open when the run ends must be flushed into
// the log before the registry is cleared.

use crate::config::SimulationParams;
use crate::models::{DisconnectReason, EventKind, OutageClosure, SatelliteConfig, StationConfig};
use crate::orchestrator::engine::{Orchestrator, OrchestratorConfig, RunState, SimulationError};
use crate::orchestrator::report::StopReason;

fn config(params: SimulationParams) -> OrchestratorConfig {
    OrchestratorConfig {
        rng_seed: 42,
        params,
        speed_multiplier: 1.0,
        satellites: vec![SatelliteConfig::new("SAT-1", 6961.0, 0.0, 100_000)],
        stations: vec![StationConfig::on_surface("GS-1", 0.0)],
    }
}

#[test]
fn test_stop_disconnects_live_links() {
    let mut orch = Orchestrator::new(config(SimulationParams::deterministic())).unwrap();
    orch.tick(1000).unwrap();
    assert!(orch.snapshot().links().len() == 1);

    let report = orch.stop();

    assert_eq!(report.stop_reason, StopReason::Manual);
    assert_eq!(orch.run_state(), RunState::Stopped);
    assert_eq!(orch.registry().num_satellites(), 0);
    assert_eq!(orch.registry().num_stations(), 0);

    let stopped = orch.event_log().events().iter().any(|e| {
        matches!(
            e.kind,
            EventKind::Disconnected {
                reason: DisconnectReason::SimulationStopped,
                ..
            }
        )
    });
    assert!(stopped);
}

#[test]
fn test_stop_is_idempotent() {
    let mut orch = Orchestrator::new(config(SimulationParams::deterministic())).unwrap();
    orch.tick(1000).unwrap();

    let first = orch.stop();
    let logged = orch.event_log().len();
    let second = orch.stop();

    assert_eq!(first, second);
    assert_eq!(orch.event_log().len(), logged);
}

#[test]
fn test_tick_after_stop_is_rejected() {
    let mut orch = Orchestrator::new(config(SimulationParams::deterministic())).unwrap();
    orch.stop();
    assert_eq!(orch.tick(1000), Err(SimulationError::Stopped));
    assert_eq!(
        orch.add_satellite(&SatelliteConfig::new("late", 6961.0, 0.0, 10)),
        Err(SimulationError::Stopped)
    );
}

#[test]
fn test_requested_stop_honoured_at_tick_end() {
    let mut orch = Orchestrator::new(config(SimulationParams::deterministic())).unwrap();
    orch.tick(1000).unwrap();
    orch.request_stop();
    assert_eq!(orch.run_state(), RunState::Running);

    let result = orch.tick(1000).unwrap();

    assert!(result.stopped);
    let report = orch.report().unwrap();
    assert_eq!(report.stop_reason, StopReason::Requested);
    assert_eq!(report.ticks, 2);
    assert_eq!(report.ended_at_ms, 2000);
}

#[test]
fn test_unresolved_damage_reported_at_stop() {
    let params = SimulationParams {
        station_damage_probability: 1.0,
        station_repair_duration_ms: 1_000_000,
        satellite_damage_probability: 1.0,
        satellite_repair_duration_ms: 1_000_000,
        ..SimulationParams::deterministic()
    };
    let mut orch = Orchestrator::new(config(params)).unwrap();
    orch.tick(1000).unwrap();
    orch.stop();

    let kinds: Vec<&EventKind> = orch.event_log().events().iter().map(|e| &e.kind).collect();
    assert!(kinds
        .iter()
        .any(|k| matches!(k, EventKind::StationDamageUnresolved { since_ms: 0, .. })));
    assert!(kinds
        .iter()
        .any(|k| matches!(k, EventKind::SatelliteDamageUnresolved { since_ms: 0, .. })));
}

#[test]
fn test_open_outage_flushed_at_stop() {
    let params = SimulationParams {
        station_repair_duration_ms: 1_000_000,
        ..SimulationParams::deterministic()
    };
    let mut orch = Orchestrator::new(config(params)).unwrap();
    orch.tick(1000).unwrap();

    // the only station goes down, cutting the satellite off
    orch.set_param("station_damage_probability", "1.0").unwrap();
    orch.tick(1000).unwrap();
    assert_eq!(orch.outages().open_count(), 1);

    let report = orch.stop();

    assert_eq!(report.outage_stats.open_at_end_count, 1);
    assert_eq!(report.outages[0].closure, Some(OutageClosure::OpenAtEnd));
    assert_eq!(report.outages[0].started_at_ms, 1000);
}

#[test]
fn test_duration_limit_stops_run() {
    let params = SimulationParams {
        duration_ms: Some(3000),
        ..SimulationParams::deterministic()
    };
    let mut orch = Orchestrator::new(config(params)).unwrap();

    let results = orch.run(100, 1000).unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[2].stopped);
    assert_eq!(orch.report().unwrap().stop_reason, StopReason::DurationElapsed);
}
