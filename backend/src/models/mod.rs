//! Domain models for the satellite link simulator

pub mod event;
pub mod geometry;
pub mod registry;
pub mod satellite;
pub mod station;

// Re-exports
pub use event::{
    DisconnectReason, Event, EventCategory, EventKind, EventLog, EventRecord, OutageClosure, Subject,
};
pub use geometry::{CommArc, Position};
pub use registry::{EntityRegistry, InvariantViolation, LinkError};
pub use satellite::{Link, Satellite, SatelliteConfig, SatelliteKind, SatelliteStatus};
pub use station::{
    DamageRecord, GroundStation, MaintenanceWindow, QueueEntry, StationConfig, StationStatus,
};
