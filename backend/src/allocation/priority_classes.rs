//! Priority-class allocation
//!
//! Every request of a higher priority class is served before any request of
//! a lower class, across all stations. Inside a class the nearest satellite
//! goes first; the satellite id settles exact ties.
//!
//! This is the default: with a station of capacity 2 and three requests with
//! priorities [high, low, low], the high-priority satellite and the nearer
//! low-priority one connect and the remaining one is queued.

use super::{AllocationPolicy, ConnectionRequest};
use std::cmp::Ordering;

/// Priority descending, then distance ascending, then satellite id
///
/// # Example
///
/// ```
/// use satlink_core::allocation::{AllocationPolicy, ConnectionRequest, PriorityClasses};
/// use satlink_core::core::{SatelliteId, StationId};
///
/// let req = |sat, priority, distance_km| ConnectionRequest {
///     satellite: SatelliteId(sat),
///     priority,
///     station: StationId(0),
///     distance_km,
/// };
/// let mut requests = vec![req(0, 0, 100.0), req(1, 1, 900.0), req(2, 0, 50.0)];
/// PriorityClasses.order_requests(&mut requests);
///
/// let order: Vec<u32> = requests.iter().map(|r| r.satellite.0).collect();
/// assert_eq!(order, vec![1, 2, 0]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityClasses;

impl AllocationPolicy for PriorityClasses {
    fn name(&self) -> &'static str {
        "priority_classes"
    }

    fn order_requests(&self, requests: &mut [ConnectionRequest]) {
        requests.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.distance_km.partial_cmp(&b.distance_km).unwrap_or(Ordering::Equal))
                .then_with(|| a.satellite.cmp(&b.satellite))
        });
    }
}
