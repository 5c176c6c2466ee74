//! Event log for reporting and auditing.
//!
//! Every link change, transfer, degradation, status transition and outage is
//! recorded as an [`Event`]. The log is append-only during a run and is the
//! only channel through which the engine talks to reporting collaborators:
//! the engine never calls into them.
//!
//! Events carry typed payloads; [`Event::to_record`] flattens one into the
//! `{timestamp, category, subject_ids, message}` shape consumed by report
//! generators.
//!
//! # Example
//!
//! ```rust
//! use satlink_core::core::{SatelliteId, StationId};
//! use satlink_core::models::{DisconnectReason, Event, EventCategory, EventKind, EventLog};
//!
//! let mut log = EventLog::new();
//! log.log(Event::new(1500, 3, EventKind::Disconnected {
//!     satellite: SatelliteId(4),
//!     station: StationId(1),
//!     reason: DisconnectReason::ContactLimitReached,
//! }));
//!
//! let record = log.events()[0].to_record();
//! assert_eq!(record.category, EventCategory::Disconnect);
//! assert_eq!(record.subject_ids, vec!["Sat-4", "Station-1"]);
//! assert!(record.message.contains("contact limit reached"));
//! ```

use crate::core::{ContactId, SatelliteId, StationId};
use crate::models::geometry::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reporting category of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    Connect,
    Disconnect,
    Queue,
    DataTransfer,
    Jamming,
    Error,
    Maintenance,
    Damage,
    Repair,
    Destroyed,
    Outage,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Connect => "CONNECT",
            EventCategory::Disconnect => "DISCONNECT",
            EventCategory::Queue => "QUEUE",
            EventCategory::DataTransfer => "DATA_TRANSFER",
            EventCategory::Jamming => "JAMMING",
            EventCategory::Error => "ERROR",
            EventCategory::Maintenance => "MAINTENANCE",
            EventCategory::Damage => "DAMAGE",
            EventCategory::Repair => "REPAIR",
            EventCategory::Destroyed => "DESTROYED",
            EventCategory::Outage => "OUTAGE",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a link was torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    TransferComplete,
    ContactLimitReached,
    OutOfRange,
    StationMaintenance,
    StationDamaged,
    SatelliteDamaged,
    SimulationStopped,
    Removed,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::TransferComplete => "transfer complete",
            DisconnectReason::ContactLimitReached => "contact limit reached",
            DisconnectReason::OutOfRange => "signal lost",
            DisconnectReason::StationMaintenance => "station maintenance",
            DisconnectReason::StationDamaged => "station damaged",
            DisconnectReason::SatelliteDamaged => "satellite damaged",
            DisconnectReason::SimulationStopped => "simulation stopped",
            DisconnectReason::Removed => "satellite removed",
        }
    }
}

/// How an outage ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutageClosure {
    Reconnected { station: StationId },
    SatelliteDestroyed,
    SatelliteRemoved,
    OpenAtEnd,
}

/// Entity an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Satellite(SatelliteId),
    Station(StationId),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Satellite(id) => write!(f, "{}", id),
            Subject::Station(id) => write!(f, "{}", id),
        }
    }
}

/// Typed event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Connected {
        satellite: SatelliteId,
        station: StationId,
        contact: ContactId,
        /// Admitted from the station's wait queue
        from_queue: bool,
    },
    Disconnected {
        satellite: SatelliteId,
        station: StationId,
        reason: DisconnectReason,
    },
    Queued {
        satellite: SatelliteId,
        station: StationId,
        /// 1-based position after insertion
        position: usize,
    },
    QueueCleared {
        station: StationId,
        satellites: Vec<SatelliteId>,
    },
    DataTransferred {
        satellite: SatelliteId,
        station: StationId,
        amount_mb: i64,
        burst: bool,
    },
    Jammed {
        satellite: SatelliteId,
        station: StationId,
        intended_mb: i64,
        transferred_mb: i64,
    },
    TransmissionError {
        satellite: SatelliteId,
        station: StationId,
        intended_mb: i64,
        transferred_mb: i64,
    },
    MaintenanceStarted {
        station: StationId,
    },
    MaintenanceEnded {
        station: StationId,
    },
    StationDamaged {
        station: StationId,
    },
    StationRepaired {
        station: StationId,
        data_lost_mb: i64,
    },
    /// Station still damaged when the run stopped
    StationDamageUnresolved {
        station: StationId,
        since_ms: u64,
    },
    SatelliteDamaged {
        satellite: SatelliteId,
    },
    /// Satellite still degrading when the run stopped
    SatelliteDamageUnresolved {
        satellite: SatelliteId,
        since_ms: u64,
    },
    SatelliteDestroyed {
        satellite: SatelliteId,
        position: Position,
    },
    OutageStarted {
        satellite: SatelliteId,
        last_station: StationId,
    },
    OutageEnded {
        satellite: SatelliteId,
        duration_ms: u64,
        closure: OutageClosure,
    },
}

/// Timestamped event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Virtual time (ms)
    pub time_ms: u64,
    pub tick: usize,
    pub kind: EventKind,
}

/// Flattened event for report generators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp_ms: u64,
    pub category: EventCategory,
    pub subject_ids: Vec<String>,
    pub message: String,
}

impl Event {
    pub fn new(time_ms: u64, tick: usize, kind: EventKind) -> Self {
        Self { time_ms, tick, kind }
    }

    pub fn category(&self) -> EventCategory {
        use EventKind::*;
        match &self.kind {
            Connected { .. } => EventCategory::Connect,
            Disconnected { .. } => EventCategory::Disconnect,
            Queued { .. } | QueueCleared { .. } => EventCategory::Queue,
            DataTransferred { .. } => EventCategory::DataTransfer,
            Jammed { .. } => EventCategory::Jamming,
            TransmissionError { .. } => EventCategory::Error,
            MaintenanceStarted { .. } | MaintenanceEnded { .. } => EventCategory::Maintenance,
            StationDamaged { .. }
            | StationDamageUnresolved { .. }
            | SatelliteDamaged { .. }
            | SatelliteDamageUnresolved { .. } => EventCategory::Damage,
            StationRepaired { .. } => EventCategory::Repair,
            SatelliteDestroyed { .. } => EventCategory::Destroyed,
            OutageStarted { .. } | OutageEnded { .. } => EventCategory::Outage,
        }
    }

    /// Entities involved, satellite first
    pub fn subjects(&self) -> Vec<Subject> {
        use EventKind::*;
        match &self.kind {
            Connected { satellite, station, .. }
            | Disconnected { satellite, station, .. }
            | Queued { satellite, station, .. }
            | DataTransferred { satellite, station, .. }
            | Jammed { satellite, station, .. }
            | TransmissionError { satellite, station, .. } => {
                vec![Subject::Satellite(*satellite), Subject::Station(*station)]
            }
            OutageStarted {
                satellite,
                last_station,
            } => vec![Subject::Satellite(*satellite), Subject::Station(*last_station)],
            QueueCleared { station, satellites } => std::iter::once(Subject::Station(*station))
                .chain(satellites.iter().map(|s| Subject::Satellite(*s)))
                .collect(),
            MaintenanceStarted { station }
            | MaintenanceEnded { station }
            | StationDamaged { station }
            | StationRepaired { station, .. }
            | StationDamageUnresolved { station, .. } => vec![Subject::Station(*station)],
            SatelliteDamaged { satellite }
            | SatelliteDamageUnresolved { satellite, .. }
            | SatelliteDestroyed { satellite, .. }
            | OutageEnded { satellite, .. } => vec![Subject::Satellite(*satellite)],
        }
    }

    pub fn involves_satellite(&self, id: SatelliteId) -> bool {
        self.subjects().contains(&Subject::Satellite(id))
    }

    pub fn involves_station(&self, id: StationId) -> bool {
        self.subjects().contains(&Subject::Station(id))
    }

    /// Human-readable description
    pub fn message(&self) -> String {
        use EventKind::*;
        match &self.kind {
            Connected {
                satellite,
                station,
                from_queue,
                ..
            } => {
                if *from_queue {
                    format!("{} connected to {} from queue", satellite, station)
                } else {
                    format!("{} connected to {}", satellite, station)
                }
            }
            Disconnected {
                satellite,
                station,
                reason,
            } => format!("{} disconnected from {}: {}", satellite, station, reason.as_str()),
            Queued {
                satellite,
                station,
                position,
            } => format!("{} queued at {} (position {})", satellite, station, position),
            QueueCleared { station, satellites } => {
                format!("{} cleared its queue ({} waiting)", station, satellites.len())
            }
            DataTransferred {
                satellite,
                station,
                amount_mb,
                burst,
            } => {
                let tag = if *burst { " [burst]" } else { "" };
                format!("{} sent {} MB to {}{}", satellite, amount_mb, station, tag)
            }
            Jammed {
                satellite,
                station,
                intended_mb,
                transferred_mb,
            } => format!(
                "link {} -> {} jammed: {} of {} MB delivered",
                satellite, station, transferred_mb, intended_mb
            ),
            TransmissionError {
                satellite,
                station,
                intended_mb,
                transferred_mb,
            } => format!(
                "transmission error on {} -> {}: {} of {} MB delivered",
                satellite, station, transferred_mb, intended_mb
            ),
            MaintenanceStarted { station } => format!("{} entered maintenance", station),
            MaintenanceEnded { station } => format!("{} left maintenance", station),
            StationDamaged { station } => format!("{} damaged", station),
            StationRepaired {
                station,
                data_lost_mb,
            } => format!("{} repaired, {} MB of stored data lost", station, data_lost_mb),
            StationDamageUnresolved { station, since_ms } => {
                format!("{} still damaged at end of run (since {} ms)", station, since_ms)
            }
            SatelliteDamaged { satellite } => format!("{} damaged, degrading", satellite),
            SatelliteDamageUnresolved {
                satellite,
                since_ms,
            } => format!(
                "{} still degrading at end of run (since {} ms)",
                satellite, since_ms
            ),
            SatelliteDestroyed {
                satellite,
                position,
            } => format!(
                "{} destroyed at ({:.0}, {:.0})",
                satellite, position.x, position.y
            ),
            OutageStarted {
                satellite,
                last_station,
            } => format!("{} lost link (last station {})", satellite, last_station),
            OutageEnded {
                satellite,
                duration_ms,
                closure,
            } => match closure {
                OutageClosure::Reconnected { station } => format!(
                    "{} link restored via {} after {} ms",
                    satellite, station, duration_ms
                ),
                OutageClosure::SatelliteDestroyed => {
                    format!("{} outage ended by destruction after {} ms", satellite, duration_ms)
                }
                OutageClosure::SatelliteRemoved => {
                    format!("{} outage ended by removal after {} ms", satellite, duration_ms)
                }
                OutageClosure::OpenAtEnd => {
                    format!("{} outage still open at end of run ({} ms)", satellite, duration_ms)
                }
            },
        }
    }

    pub fn to_record(&self) -> EventRecord {
        EventRecord {
            timestamp_ms: self.time_ms,
            category: self.category(),
            subject_ids: self.subjects().iter().map(|s| s.to_string()).collect(),
            message: self.message(),
        }
    }
}

/// Append-only event store
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events logged at or after position `cursor` (for incremental readers)
    pub fn since(&self, cursor: usize) -> &[Event] {
        &self.events[cursor.min(self.events.len())..]
    }

    pub fn events_at_tick(&self, tick: usize) -> Vec<&Event> {
        self.events.iter().filter(|e| e.tick == tick).collect()
    }

    pub fn events_of_category(&self, category: EventCategory) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.category() == category)
            .collect()
    }

    pub fn events_for_satellite(&self, id: SatelliteId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.involves_satellite(id))
            .collect()
    }

    pub fn events_for_station(&self, id: StationId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.involves_station(id))
            .collect()
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.events.iter().map(Event::to_record).collect()
    }
}
