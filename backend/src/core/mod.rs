//! Core infrastructure: virtual clock and identifier allocation

pub mod ids;
pub mod time;

pub use ids::{ContactId, IdAllocator, SatelliteId, StationId};
pub use time::{TickContext, TimeManager};
