//! Entity registry
//!
//! Owns every satellite and ground station of a run and is the only place
//! where links are created or torn down. Both sides of a link (the
//! satellite's `link` and the station's connected set) are written together
//! by [`EntityRegistry::connect`] and [`EntityRegistry::disconnect`].
//!
//! # Critical Invariants
//!
//! 1. **Capacity**: no station holds more links than its capacity
//! 2. **Single link**: a satellite appears in at most one connected set, and the
//!    satellite's link points back at that station
//! 3. **Queue exclusivity**: a connected satellite is in no wait queue
//! 4. **Inactive satellites**: Degrading and Destroyed satellites hold no link
//! 5. **Queue order**: priority descending, FIFO within a priority
//!
//! [`EntityRegistry::verify_invariants`] checks all of them.

use crate::core::{IdAllocator, SatelliteId, StationId};
use crate::models::satellite::{Link, Satellite, SatelliteConfig};
use crate::models::station::{GroundStation, StationConfig};
use std::collections::BTreeMap;
use thiserror::Error;

/// Rejected link operation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("satellite {0} not found")]
    SatelliteNotFound(SatelliteId),

    #[error("station {0} not found")]
    StationNotFound(StationId),

    #[error("satellite {satellite} already linked to {station}")]
    AlreadyLinked {
        satellite: SatelliteId,
        station: StationId,
    },

    #[error("satellite {0} holds no link")]
    NotLinked(SatelliteId),

    #[error("station {0} has no free slot")]
    StationFull(StationId),

    #[error("station {0} is not online")]
    StationUnavailable(StationId),

    #[error("satellite {0} is not operational")]
    SatelliteUnavailable(SatelliteId),
}

/// Broken registry invariant (always a defect)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("{station} holds {connected} links with capacity {capacity}")]
    OverCapacity {
        station: StationId,
        connected: usize,
        capacity: usize,
    },

    #[error("{satellite} is in the connected set of more than one station")]
    MultipleLinks { satellite: SatelliteId },

    #[error("link between {satellite} and {station} is recorded on one side only")]
    BackReferenceMismatch {
        satellite: SatelliteId,
        station: StationId,
    },

    #[error("{satellite} is queued at {station} while connected")]
    QueuedWhileConnected {
        satellite: SatelliteId,
        station: StationId,
    },

    #[error("{satellite} holds a link while not operational")]
    InactiveWithLink { satellite: SatelliteId },

    #[error("{station} holds links while not online")]
    OfflineWithLinks { station: StationId },

    #[error("wait queue of {station} is out of order")]
    QueueOrder { station: StationId },
}

/// Canonical store of satellites and stations
///
/// # Example
/// ```
/// use satlink_core::models::{EntityRegistry, SatelliteConfig, StationConfig};
///
/// let mut registry = EntityRegistry::new();
/// let station = registry.add_station(&StationConfig::on_surface("GS", 0.0));
/// let sat = registry.add_satellite(&SatelliteConfig::new("S", 6900.0, 0.1, 100), 10);
///
/// let link = registry.connect(sat, station, 0).unwrap();
/// assert_eq!(link.station, station);
/// assert!(registry.verify_invariants().is_ok());
///
/// registry.disconnect(sat).unwrap();
/// assert!(registry.station(station).unwrap().connected().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    ids: IdAllocator,
    satellites: BTreeMap<SatelliteId, Satellite>,
    stations: BTreeMap<StationId, GroundStation>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry drawing ids from a caller-supplied allocator
    pub fn with_allocator(ids: IdAllocator) -> Self {
        Self {
            ids,
            satellites: BTreeMap::new(),
            stations: BTreeMap::new(),
        }
    }

    // ========================================================================
    // Insertion / removal
    // ========================================================================

    pub fn add_satellite(&mut self, config: &SatelliteConfig, default_contact_limit: i64) -> SatelliteId {
        let id = self.ids.next_satellite();
        self.satellites
            .insert(id, Satellite::new(id, config, default_contact_limit));
        id
    }

    pub fn add_station(&mut self, config: &StationConfig) -> StationId {
        let id = self.ids.next_station();
        self.stations.insert(id, GroundStation::new(id, config));
        id
    }

    /// Remove a satellite along with its link and queue entries
    ///
    /// Returns the removed satellite and the link it held, if any.
    pub fn remove_satellite(&mut self, id: SatelliteId) -> Option<(Satellite, Option<Link>)> {
        let link = self.disconnect(id).ok();
        self.purge_from_queues(id);
        self.satellites.remove(&id).map(|sat| (sat, link))
    }

    /// Drop every entity, returning the satellites and stations as they were
    pub fn clear(&mut self) -> (Vec<Satellite>, Vec<GroundStation>) {
        let sats = std::mem::take(&mut self.satellites).into_values().collect();
        let stations = std::mem::take(&mut self.stations).into_values().collect();
        (sats, stations)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn satellite(&self, id: SatelliteId) -> Option<&Satellite> {
        self.satellites.get(&id)
    }

    pub fn satellite_mut(&mut self, id: SatelliteId) -> Option<&mut Satellite> {
        self.satellites.get_mut(&id)
    }

    pub fn station(&self, id: StationId) -> Option<&GroundStation> {
        self.stations.get(&id)
    }

    pub fn station_mut(&mut self, id: StationId) -> Option<&mut GroundStation> {
        self.stations.get_mut(&id)
    }

    /// Satellites in ascending id order
    pub fn satellites(&self) -> impl Iterator<Item = &Satellite> {
        self.satellites.values()
    }

    pub fn satellites_mut(&mut self) -> impl Iterator<Item = &mut Satellite> {
        self.satellites.values_mut()
    }

    /// Stations in ascending id order
    pub fn stations(&self) -> impl Iterator<Item = &GroundStation> {
        self.stations.values()
    }

    pub fn satellite_ids(&self) -> Vec<SatelliteId> {
        self.satellites.keys().copied().collect()
    }

    pub fn station_ids(&self) -> Vec<StationId> {
        self.stations.keys().copied().collect()
    }

    pub fn num_satellites(&self) -> usize {
        self.satellites.len()
    }

    pub fn num_stations(&self) -> usize {
        self.stations.len()
    }

    // ========================================================================
    // Links
    // ========================================================================

    /// Open a new contact between `satellite` and `station`
    ///
    /// The satellite is removed from every wait queue and its per-contact
    /// counter restarts.
    pub fn connect(&mut self, satellite: SatelliteId, station: StationId, now_ms: u64) -> Result<Link, LinkError> {
        let sat = self
            .satellites
            .get(&satellite)
            .ok_or(LinkError::SatelliteNotFound(satellite))?;
        let st = self
            .stations
            .get(&station)
            .ok_or(LinkError::StationNotFound(station))?;

        if let Some(existing) = sat.link() {
            return Err(LinkError::AlreadyLinked {
                satellite,
                station: existing.station,
            });
        }
        if !sat.is_operational() {
            return Err(LinkError::SatelliteUnavailable(satellite));
        }
        if !st.is_online() {
            return Err(LinkError::StationUnavailable(station));
        }
        if !st.has_free_slot() {
            return Err(LinkError::StationFull(station));
        }

        let link = Link {
            station,
            contact: self.ids.next_contact(),
            started_at_ms: now_ms,
        };
        self.purge_from_queues(satellite);
        if let Some(st) = self.stations.get_mut(&station) {
            st.add_connected(satellite);
        }
        if let Some(sat) = self.satellites.get_mut(&satellite) {
            sat.attach(link);
        }
        Ok(link)
    }

    /// Tear down the satellite's current contact
    pub fn disconnect(&mut self, satellite: SatelliteId) -> Result<Link, LinkError> {
        let sat = self
            .satellites
            .get_mut(&satellite)
            .ok_or(LinkError::SatelliteNotFound(satellite))?;
        let link = sat.detach().ok_or(LinkError::NotLinked(satellite))?;
        if let Some(st) = self.stations.get_mut(&link.station) {
            st.remove_connected(satellite);
        }
        Ok(link)
    }

    /// Tear down every contact held by `station`
    pub fn disconnect_all_at(&mut self, station: StationId) -> Vec<(SatelliteId, Link)> {
        let linked: Vec<SatelliteId> = match self.stations.get(&station) {
            Some(st) => st.connected().iter().copied().collect(),
            None => return Vec::new(),
        };
        linked
            .into_iter()
            .filter_map(|sat| self.disconnect(sat).ok().map(|link| (sat, link)))
            .collect()
    }

    /// Remove `satellite` from every wait queue
    ///
    /// Returns the stations it was queued at.
    pub fn purge_from_queues(&mut self, satellite: SatelliteId) -> Vec<StationId> {
        self.stations
            .values_mut()
            .filter_map(|st| st.dequeue(satellite).then(|| st.id()))
            .collect()
    }

    // ========================================================================
    // Invariants
    // ========================================================================

    /// Check every registry invariant
    pub fn verify_invariants(&self) -> Result<(), InvariantViolation> {
        let mut seen: BTreeMap<SatelliteId, StationId> = BTreeMap::new();

        for st in self.stations.values() {
            if st.connected().len() > st.capacity() {
                return Err(InvariantViolation::OverCapacity {
                    station: st.id(),
                    connected: st.connected().len(),
                    capacity: st.capacity(),
                });
            }
            if !st.is_online() && !st.connected().is_empty() {
                return Err(InvariantViolation::OfflineWithLinks { station: st.id() });
            }
            for &sat_id in st.connected() {
                if seen.insert(sat_id, st.id()).is_some() {
                    return Err(InvariantViolation::MultipleLinks { satellite: sat_id });
                }
                let back = self
                    .satellites
                    .get(&sat_id)
                    .and_then(|s| s.link())
                    .map(|l| l.station);
                if back != Some(st.id()) {
                    return Err(InvariantViolation::BackReferenceMismatch {
                        satellite: sat_id,
                        station: st.id(),
                    });
                }
            }
            let ordered = st.queue().windows(2).all(|pair| {
                pair[0].priority > pair[1].priority
                    || (pair[0].priority == pair[1].priority
                        && pair[0].enqueued_at_ms <= pair[1].enqueued_at_ms)
            });
            if !ordered {
                return Err(InvariantViolation::QueueOrder { station: st.id() });
            }
        }

        for sat in self.satellites.values() {
            if let Some(link) = sat.link() {
                if seen.get(&sat.id()) != Some(&link.station) {
                    return Err(InvariantViolation::BackReferenceMismatch {
                        satellite: sat.id(),
                        station: link.station,
                    });
                }
                if !sat.is_operational() {
                    return Err(InvariantViolation::InactiveWithLink { satellite: sat.id() });
                }
            }
        }

        for st in self.stations.values() {
            if let Some(entry) = st.queue().iter().find(|e| seen.contains_key(&e.satellite)) {
                return Err(InvariantViolation::QueuedWhileConnected {
                    satellite: entry.satellite,
                    station: st.id(),
                });
            }
        }

        Ok(())
    }
}
