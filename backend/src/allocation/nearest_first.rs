//! Nearest-first allocation
//!
//! Requests are served by distance alone. Priority still decides queue order
//! once a station is full, but not who grabs a free slot first.

use super::{AllocationPolicy, ConnectionRequest};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default)]
pub struct NearestFirst;

impl AllocationPolicy for NearestFirst {
    fn name(&self) -> &'static str {
        "nearest_first"
    }

    fn order_requests(&self, requests: &mut [ConnectionRequest]) {
        requests.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.satellite.cmp(&b.satellite))
        });
    }
}
