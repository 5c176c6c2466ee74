//! Data transfer engine
//!
//! Moves data across every active link once per tick.
//!
//! # Rate
//!
//! The first contact between a satellite and a station runs at
//! `burst_rate_mb_per_s` for `burst_duration_ms` from the contact start; any
//! later contact on the same pair runs at `base_rate_mb_per_s` from the first
//! tick. The [`BurstLedger`] remembers the first contact of every pair for the
//! life of the engine.
//!
//! # Amount
//!
//! `intended = rate × Δt`, clamped to the satellite's backlog and to what the
//! current contact may still carry. Amounts are worked out in thousandths of
//! a MB; the part below a whole MB is carried to the next tick of the same
//! contact, so short ticks still add up to `rate × elapsed`. Two independent rolls are drawn per link:
//! jamming and transmission error. A jammed tick keeps only
//! `jamming_retained_fraction` of the intended amount and is never also
//! error-reduced; an erroneous tick keeps `error_retained_fraction`.
//!
//! # Disconnect triggers
//!
//! Checked after commit: an empty backlog ends the contact with
//! "transfer complete", an exhausted contact allowance with "contact limit
//! reached".
//!
//! CRITICAL: All committed data volumes are i64 (megabytes). The carry is
//! reset whenever a contact opens or closes.

use crate::config::SimulationParams;
use crate::core::{ContactId, SatelliteId, StationId, TickContext};
use crate::models::{DisconnectReason, EntityRegistry, Event, EventKind, Link};
use crate::rng::RandomSource;
use std::collections::BTreeMap;
use tracing::debug;

const MILLI_PER_MB: i64 = 1000;

/// First contact of every (satellite, station) pair
#[derive(Debug, Clone, Default)]
pub struct BurstLedger {
    first_contact: BTreeMap<(SatelliteId, StationId), ContactId>,
}

impl BurstLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `link` if it is the first contact of its pair
    pub fn record(&mut self, satellite: SatelliteId, link: &Link) {
        self.first_contact
            .entry((satellite, link.station))
            .or_insert(link.contact);
    }

    /// Whether `link` may run at the burst rate at `now_ms`
    pub fn in_burst(&self, satellite: SatelliteId, link: &Link, now_ms: u64, burst_duration_ms: u64) -> bool {
        self.first_contact.get(&(satellite, link.station)) == Some(&link.contact)
            && now_ms.saturating_sub(link.started_at_ms) < burst_duration_ms
    }

    pub fn len(&self) -> usize {
        self.first_contact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_contact.is_empty()
    }
}

/// Result of moving data across one link for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTransfer {
    pub satellite: SatelliteId,
    pub station: StationId,
    pub intended_mb: i64,
    pub transferred_mb: i64,
    pub burst: bool,
    pub jammed: bool,
    pub error: bool,
}

/// Totals for one transfer pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferOutcome {
    pub transfers: Vec<LinkTransfer>,
    pub delivered_mb: i64,
    pub completed: Vec<SatelliteId>,
    pub limit_reached: Vec<SatelliteId>,
}

/// Stateful transfer engine
#[derive(Debug, Clone, Default)]
pub struct TransferEngine {
    ledger: BurstLedger,
}

impl TransferEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> &BurstLedger {
        &self.ledger
    }

    /// Register every contact opened this tick
    ///
    /// Must see each `Connected` event before the next [`TransferEngine::step`],
    /// including contacts torn down again before any data moved.
    pub fn observe<'a>(&mut self, events: impl IntoIterator<Item = &'a Event>) {
        for event in events {
            if let EventKind::Connected {
                satellite,
                station,
                contact,
                ..
            } = event.kind
            {
                self.ledger.record(
                    satellite,
                    &Link {
                        station,
                        contact,
                        started_at_ms: event.time_ms,
                    },
                );
            }
        }
    }

    /// Move data across every active link, in ascending satellite id order
    pub fn step(
        &mut self,
        registry: &mut EntityRegistry,
        rng: &mut dyn RandomSource,
        params: &SimulationParams,
        ctx: TickContext,
        events: &mut Vec<Event>,
    ) -> TransferOutcome {
        let mut outcome = TransferOutcome::default();

        for sat_id in registry.satellite_ids() {
            let Some(sat) = registry.satellite(sat_id) else {
                continue;
            };
            let Some(link) = sat.link() else {
                continue;
            };
            self.ledger.record(sat_id, &link);

            let burst = self
                .ledger
                .in_burst(sat_id, &link, ctx.now_ms, params.burst_duration_ms);
            let rate = if burst {
                params.burst_rate_mb_per_s
            } else {
                params.base_rate_mb_per_s
            };
            // rate (MB/s) x dt (ms) is in thousandths of a MB
            let owed = rate
                .saturating_mul(ctx.dt_ms as i64)
                .saturating_add(sat.pending_milli_mb());
            let cap = sat.data_backlog().min(sat.contact_allowance()).max(0);
            let intended = (owed / MILLI_PER_MB).min(cap);
            let intended_milli = if owed / MILLI_PER_MB > cap {
                intended * MILLI_PER_MB
            } else {
                owed
            };

            let jammed = rng.chance(params.jamming_probability);
            let error = rng.chance(params.transmission_error_probability);
            let kept_milli = if jammed {
                scale(intended_milli, params.jamming_retained_fraction)
            } else if error {
                scale(intended_milli, params.error_retained_fraction)
            } else {
                intended_milli
            };
            let transferred = kept_milli / MILLI_PER_MB;

            if let Some(sat) = registry.satellite_mut(sat_id) {
                sat.record_transfer(transferred);
                sat.carry_over(kept_milli - transferred * MILLI_PER_MB);
            }
            if let Some(station) = registry.station_mut(link.station) {
                station.store(transferred);
            }

            if jammed {
                events.push(ctx.event(EventKind::Jammed {
                    satellite: sat_id,
                    station: link.station,
                    intended_mb: intended,
                    transferred_mb: transferred,
                }));
            } else if error {
                events.push(ctx.event(EventKind::TransmissionError {
                    satellite: sat_id,
                    station: link.station,
                    intended_mb: intended,
                    transferred_mb: transferred,
                }));
            }
            if transferred > 0 {
                events.push(ctx.event(EventKind::DataTransferred {
                    satellite: sat_id,
                    station: link.station,
                    amount_mb: transferred,
                    burst,
                }));
            }
            outcome.delivered_mb += transferred;
            outcome.transfers.push(LinkTransfer {
                satellite: sat_id,
                station: link.station,
                intended_mb: intended,
                transferred_mb: transferred,
                burst,
                jammed,
                error,
            });

            let Some(sat) = registry.satellite(sat_id) else {
                continue;
            };
            let reason = if sat.data_backlog() <= 0 {
                DisconnectReason::TransferComplete
            } else if sat.data_sent_this_contact() >= sat.per_contact_limit() {
                DisconnectReason::ContactLimitReached
            } else {
                continue;
            };
            if registry.disconnect(sat_id).is_ok() {
                debug!(satellite = %sat_id, station = %link.station, reason = reason.as_str(), "contact ended");
                events.push(ctx.event(EventKind::Disconnected {
                    satellite: sat_id,
                    station: link.station,
                    reason,
                }));
                match reason {
                    DisconnectReason::TransferComplete => outcome.completed.push(sat_id),
                    _ => outcome.limit_reached.push(sat_id),
                }
            }
        }

        outcome
    }
}

fn scale(amount: i64, fraction: f64) -> i64 {
    (amount as f64 * fraction) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SatelliteConfig, StationConfig};
    use crate::rng::ScriptedSource;

    fn linked() -> (EntityRegistry, SatelliteId, StationId) {
        let mut registry = EntityRegistry::new();
        let st = registry.add_station(&StationConfig::on_surface("GS", 0.0).with_max_received(None));
        let sat = registry.add_satellite(&SatelliteConfig::new("S", 6900.0, 0.0, 100_000), 10_000);
        registry.connect(sat, st, 0).unwrap();
        (registry, sat, st)
    }

    #[test]
    fn test_error_halves_amount() {
        let (mut registry, sat, _) = linked();
        let params = SimulationParams {
            transmission_error_probability: 1.0,
            ..SimulationParams::deterministic()
        };
        let mut engine = TransferEngine::new();
        let mut events = Vec::new();
        // jamming roll fails, error roll succeeds
        let mut rng = ScriptedSource::new(vec![0.5, 0.0]);
        let outcome = engine.step(
            &mut registry,
            &mut rng,
            &params,
            TickContext::new(0, 0, 1000),
            &mut events,
        );
        // burst rate for the first contact: 1000 MB/s * 1 s, halved
        assert_eq!(outcome.delivered_mb, 500);
        assert_eq!(registry.satellite(sat).unwrap().data_backlog(), 99_500);
    }

    #[test]
    fn test_jamming_takes_precedence() {
        let (mut registry, _, _) = linked();
        let params = SimulationParams {
            jamming_probability: 1.0,
            transmission_error_probability: 1.0,
            ..SimulationParams::deterministic()
        };
        let mut events = Vec::new();
        let outcome = TransferEngine::new().step(
            &mut registry,
            &mut ScriptedSource::always(),
            &params,
            TickContext::new(0, 0, 1000),
            &mut events,
        );
        assert_eq!(outcome.delivered_mb, 0);
        assert!(outcome.transfers[0].jammed);
        assert!(!events
            .iter()
            .any(|e| matches!(e.kind, EventKind::TransmissionError { .. })));
    }

    #[test]
    fn test_small_tick_carries_remainder() {
        let (mut registry, sat, _) = linked();
        let params = SimulationParams {
            base_rate_mb_per_s: 500,
            burst_duration_ms: 0,
            ..SimulationParams::deterministic()
        };
        let mut engine = TransferEngine::new();
        let mut events = Vec::new();

        // 500 * 17 / 1000 = 8.5: 8 now, the half carried
        let first = engine.step(
            &mut registry,
            &mut ScriptedSource::never(),
            &params,
            TickContext::new(0, 0, 17),
            &mut events,
        );
        assert_eq!(first.delivered_mb, 8);
        assert_eq!(registry.satellite(sat).unwrap().pending_milli_mb(), 500);

        let second = engine.step(
            &mut registry,
            &mut ScriptedSource::never(),
            &params,
            TickContext::new(1, 17, 17),
            &mut events,
        );
        assert_eq!(second.delivered_mb, 9);
        assert_eq!(registry.satellite(sat).unwrap().pending_milli_mb(), 0);
    }

    #[test]
    fn test_error_scales_carry() {
        let (mut registry, sat, _) = linked();
        let params = SimulationParams {
            base_rate_mb_per_s: 1,
            burst_duration_ms: 0,
            transmission_error_probability: 1.0,
            error_retained_fraction: 0.5,
            ..SimulationParams::deterministic()
        };
        let mut engine = TransferEngine::new();
        let mut events = Vec::new();
        // jamming fails, error succeeds, every tick
        let mut rng = ScriptedSource::new(vec![0.5, 0.0, 0.5, 0.0]);

        // 600 milli-MB owed, 300 kept, nothing whole yet
        engine.step(&mut registry, &mut rng, &params, TickContext::new(0, 0, 600), &mut events);
        assert_eq!(registry.satellite(sat).unwrap().pending_milli_mb(), 300);

        // (300 + 600) halved = 450: still under 1 MB
        let outcome = engine.step(&mut registry, &mut rng, &params, TickContext::new(1, 600, 600), &mut events);
        assert_eq!(outcome.delivered_mb, 0);
        assert_eq!(registry.satellite(sat).unwrap().pending_milli_mb(), 450);
    }

    #[test]
    fn test_reconnect_drops_carry() {
        let (mut registry, sat, st) = linked();
        let params = SimulationParams {
            base_rate_mb_per_s: 1,
            burst_duration_ms: 0,
            ..SimulationParams::deterministic()
        };
        let mut engine = TransferEngine::new();
        let mut events = Vec::new();
        engine.step(
            &mut registry,
            &mut ScriptedSource::never(),
            &params,
            TickContext::new(0, 0, 700),
            &mut events,
        );
        assert_eq!(registry.satellite(sat).unwrap().pending_milli_mb(), 700);

        registry.disconnect(sat).unwrap();
        registry.connect(sat, st, 700).unwrap();
        assert_eq!(registry.satellite(sat).unwrap().pending_milli_mb(), 0);
    }
}
