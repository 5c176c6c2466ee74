//! Property tests: registry invariants hold for arbitrary generated runs

use proptest::prelude::*;
use satlink_core::config::SimulationParams;
use satlink_core::{Orchestrator, SetupParams};
use std::collections::HashMap;

fn setup_strategy() -> impl Strategy<Value = SetupParams> {
    (0usize..8, 0usize..8, 1usize..5, 5u64..40).prop_map(|(commercial, military, stations, secs)| SetupParams {
        commercial_satellites: commercial,
        military_satellites: military,
        stations,
        duration_ms: secs * 1000,
    })
}

/// Failure rates well above the defaults so damage paths get exercised
fn params_strategy() -> impl Strategy<Value = SimulationParams> {
    (0.0f64..0.05, 0.0f64..0.05, 0.0f64..0.5, 0.0f64..0.5, 1i64..5_000).prop_map(
        |(sat_damage, station_damage, jamming, error, limit)| SimulationParams {
            satellite_damage_probability: sat_damage,
            station_damage_probability: station_damage,
            jamming_probability: jamming,
            transmission_error_probability: error,
            satellite_repair_duration_ms: 2_000,
            station_repair_duration_ms: 2_000,
            per_contact_limit_mb: limit,
            ..SimulationParams::default()
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_links_never_exceed_capacity(
        setup in setup_strategy(),
        params in params_strategy(),
        seed in any::<u64>(),
        dt in 50u64..1_000,
    ) {
        let mut sim = Orchestrator::from_setup(&setup, params, seed).unwrap();
        let mut last_backlog: HashMap<_, i64> = HashMap::new();

        for _ in 0..200 {
            let result = sim.tick(dt).unwrap();
            prop_assert!(sim.registry().verify_invariants().is_ok());

            for station in sim.registry().stations() {
                prop_assert!(station.connected().len() <= station.capacity());
                if let Some(max) = station.max_received() {
                    prop_assert!(station.received_data() <= max);
                }
                for sat in station.connected() {
                    let link = sim.registry().satellite(*sat).and_then(|s| s.link());
                    prop_assert_eq!(link.map(|l| l.station), Some(station.id()));
                }
            }
            for sat in sim.registry().satellites() {
                prop_assert!(sat.data_backlog() >= 0);
                prop_assert!(sat.data_sent_this_contact() <= sat.per_contact_limit());
                if let Some(previous) = last_backlog.insert(sat.id(), sat.data_backlog()) {
                    prop_assert!(sat.data_backlog() <= previous);
                }
            }
            prop_assert!(result.delivered_mb >= 0);

            if result.stopped {
                break;
            }
        }

        sim.stop();
        prop_assert_eq!(sim.registry().num_satellites(), 0);
        prop_assert_eq!(sim.registry().num_stations(), 0);
    }

    #[test]
    fn prop_same_seed_same_run(
        setup in setup_strategy(),
        params in params_strategy(),
        seed in any::<u64>(),
    ) {
        let mut a = Orchestrator::from_setup(&setup, params.clone(), seed).unwrap();
        let mut b = Orchestrator::from_setup(&setup, params, seed).unwrap();

        let results_a = a.run(60, 250).unwrap();
        let results_b = b.run(60, 250).unwrap();

        prop_assert_eq!(results_a, results_b);
        prop_assert_eq!(a.event_log().records(), b.event_log().records());
    }
}
