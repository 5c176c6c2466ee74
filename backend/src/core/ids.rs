//! Stable entity identifiers
//!
//! Identifiers are small integer newtypes handed out by an [`IdAllocator`]
//! owned by the registry. Ordering is meaningful: allocation ties are broken
//! by ascending id, so ids must never be reused within a run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Satellite identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SatelliteId(pub u32);

/// Ground station identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StationId(pub u32);

/// Identifier of one uninterrupted contact between a satellite and a station
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContactId(pub u64);

impl fmt::Display for SatelliteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sat-{}", self.0)
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Station-{}", self.0)
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "contact-{}", self.0)
    }
}

/// Monotonic id source
///
/// # Example
/// ```
/// use satlink_core::core::IdAllocator;
///
/// let mut ids = IdAllocator::new();
/// let a = ids.next_satellite();
/// let b = ids.next_satellite();
/// assert!(a < b);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    next_satellite: u32,
    next_station: u32,
    next_contact: u64,
}

impl IdAllocator {
    /// Start all sequences at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Start sequences at explicit offsets (useful when merging scenarios)
    pub fn starting_at(satellite: u32, station: u32) -> Self {
        Self {
            next_satellite: satellite,
            next_station: station,
            next_contact: 0,
        }
    }

    pub fn next_satellite(&mut self) -> SatelliteId {
        let id = SatelliteId(self.next_satellite);
        self.next_satellite += 1;
        id
    }

    pub fn next_station(&mut self) -> StationId {
        let id = StationId(self.next_station);
        self.next_station += 1;
        id
    }

    pub fn next_contact(&mut self) -> ContactId {
        let id = ContactId(self.next_contact);
        self.next_contact += 1;
        id
    }
}
