//! Outage tracking
//!
//! An outage starts when a satellite that held a link ends a tick without
//! one, and ends when that satellite acquires any link again. Satellites that
//! have drained their backlog no longer need a link and are never in outage.
//!
//! Outages that are still open when the satellite is destroyed or removed are
//! closed with a matching [`OutageClosure`]; whatever is still open when the
//! run stops is flushed as [`OutageClosure::OpenAtEnd`].

use crate::core::{SatelliteId, StationId, TickContext};
use crate::models::{EntityRegistry, Event, EventKind, OutageClosure, SatelliteStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One outage interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutageRecord {
    pub satellite: SatelliteId,
    /// Station the satellite was linked to before the outage
    pub last_station: StationId,
    pub started_at_ms: u64,
    pub ended_at_ms: Option<u64>,
    pub closure: Option<OutageClosure>,
}

impl OutageRecord {
    pub fn is_open(&self) -> bool {
        self.closure.is_none()
    }

    /// Length of a closed outage
    pub fn duration_ms(&self) -> Option<u64> {
        self.ended_at_ms
            .map(|end| end.saturating_sub(self.started_at_ms))
    }

    /// Whether the link came back (as opposed to the satellite disappearing
    /// or the run ending)
    pub fn was_restored(&self) -> bool {
        matches!(self.closure, Some(OutageClosure::Reconnected { .. }))
    }
}

/// Aggregate outage statistics
///
/// Durations cover outages ended by reconnection only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutageStats {
    pub count: usize,
    pub restored_count: usize,
    pub open_at_end_count: usize,
    pub total_restored_ms: u64,
    pub longest_restored_ms: u64,
    pub mean_restored_ms: f64,
}

/// Per-satellite outage state machine
#[derive(Debug, Clone, Default)]
pub struct OutageTracker {
    /// Station each satellite was linked to at the last reconcile
    last_link: BTreeMap<SatelliteId, StationId>,
    /// Index into `records` of each satellite's open outage
    open: BTreeMap<SatelliteId, usize>,
    records: Vec<OutageRecord>,
}

impl OutageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[OutageRecord] {
        &self.records
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn is_in_outage(&self, satellite: SatelliteId) -> bool {
        self.open.contains_key(&satellite)
    }

    /// Compare the registry against the previous tick
    ///
    /// `tick_events` are the events of the current tick; a `Connected` event
    /// counts as acquiring a link even if the contact ended again within the
    /// same tick.
    pub fn reconcile(&mut self, registry: &EntityRegistry, ctx: TickContext, tick_events: &[Event]) -> Vec<Event> {
        let mut emitted = Vec::new();

        let mut connected_this_tick: BTreeMap<SatelliteId, StationId> = BTreeMap::new();
        for event in tick_events {
            if let EventKind::Connected {
                satellite, station, ..
            } = event.kind
            {
                connected_this_tick.insert(satellite, station);
            }
        }

        for sat in registry.satellites() {
            let id = sat.id();
            let current = sat.link().map(|l| l.station);
            let acquired = current.or_else(|| connected_this_tick.get(&id).copied());

            if let Some(station) = acquired {
                self.close(id, OutageClosure::Reconnected { station }, ctx, &mut emitted);
            }

            if matches!(sat.status(), SatelliteStatus::Destroyed { .. }) {
                self.close(id, OutageClosure::SatelliteDestroyed, ctx, &mut emitted);
                self.last_link.remove(&id);
                continue;
            }

            match current {
                Some(station) => {
                    self.last_link.insert(id, station);
                }
                None => {
                    let previous = connected_this_tick
                        .get(&id)
                        .copied()
                        .or_else(|| self.last_link.get(&id).copied());
                    if let Some(last_station) = previous {
                        if sat.data_backlog() > 0 && !self.open.contains_key(&id) {
                            self.open_outage(id, last_station, ctx, &mut emitted);
                        }
                    }
                    self.last_link.remove(&id);
                }
            }
        }

        // satellites that left the registry since the last reconcile
        let gone: Vec<SatelliteId> = self
            .open
            .keys()
            .chain(self.last_link.keys())
            .filter(|id| registry.satellite(**id).is_none())
            .copied()
            .collect();
        for id in gone {
            self.close(id, OutageClosure::SatelliteRemoved, ctx, &mut emitted);
            self.last_link.remove(&id);
        }

        emitted
    }

    /// Close the satellite's open outage, if any
    pub fn close(&mut self, satellite: SatelliteId, closure: OutageClosure, ctx: TickContext, events: &mut Vec<Event>) {
        let Some(index) = self.open.remove(&satellite) else {
            return;
        };
        let record = &mut self.records[index];
        record.ended_at_ms = Some(ctx.now_ms);
        record.closure = Some(closure);
        events.push(ctx.event(EventKind::OutageEnded {
            satellite,
            duration_ms: ctx.now_ms.saturating_sub(record.started_at_ms),
            closure,
        }));
    }

    /// Close every open outage as open-at-end
    pub fn flush(&mut self, ctx: TickContext) -> Vec<Event> {
        let mut emitted = Vec::new();
        let open: Vec<SatelliteId> = self.open.keys().copied().collect();
        for id in open {
            self.close(id, OutageClosure::OpenAtEnd, ctx, &mut emitted);
        }
        self.last_link.clear();
        emitted
    }

    pub fn stats(&self) -> OutageStats {
        let restored: Vec<u64> = self
            .records
            .iter()
            .filter(|r| r.was_restored())
            .filter_map(OutageRecord::duration_ms)
            .collect();
        let total: u64 = restored.iter().sum();
        OutageStats {
            count: self.records.len(),
            restored_count: restored.len(),
            open_at_end_count: self
                .records
                .iter()
                .filter(|r| r.closure == Some(OutageClosure::OpenAtEnd))
                .count(),
            total_restored_ms: total,
            longest_restored_ms: restored.iter().copied().max().unwrap_or(0),
            mean_restored_ms: if restored.is_empty() {
                0.0
            } else {
                total as f64 / restored.len() as f64
            },
        }
    }

    fn open_outage(&mut self, satellite: SatelliteId, last_station: StationId, ctx: TickContext, events: &mut Vec<Event>) {
        self.open.insert(satellite, self.records.len());
        self.records.push(OutageRecord {
            satellite,
            last_station,
            started_at_ms: ctx.now_ms,
            ended_at_ms: None,
            closure: None,
        });
        events.push(ctx.event(EventKind::OutageStarted {
            satellite,
            last_station,
        }));
    }
}
