//! Planar geometry on the orbital plane
//!
//! Coordinates are kilometres with the Earth's centre at the origin. Angles
//! are radians measured counter-clockwise from the +x axis.

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Mean Earth radius used for station placement (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Tolerance applied to arc boundary comparisons
const ARC_EPSILON: f64 = 1e-9;

/// Point on the orbital plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at `radius` km from the origin along `angle`
    pub fn from_polar(radius: f64, angle: f64) -> Self {
        Self {
            x: radius * angle.cos(),
            y: radius * angle.sin(),
        }
    }

    /// Euclidean distance in km
    pub fn distance_to(&self, other: &Position) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Direction of `other` as seen from `self`, in `(-π, π]`
    pub fn bearing_to(&self, other: &Position) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }
}

/// Map any angle into `(-π, π]`
///
/// # Example
/// ```
/// use satlink_core::models::geometry::normalize_angle;
/// use std::f64::consts::PI;
///
/// assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-12);
/// assert!((normalize_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-12);
/// ```
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Map any angle into `[0, 2π)`
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can return TAU itself for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Directional visibility arc of a station
///
/// The arc is `[base - half_angle, base + half_angle]` on the circle. Containment
/// is computed on the signed angular difference, so arcs spanning the ±π seam
/// behave the same as any other.
///
/// # Example
/// ```
/// use satlink_core::models::geometry::CommArc;
/// use std::f64::consts::PI;
///
/// // 60° wide arc straddling the seam at π
/// let arc = CommArc::new(PI, PI / 6.0);
/// assert!(arc.contains(-PI + 0.1));
/// assert!(arc.contains(PI - 0.1));
/// assert!(!arc.contains(0.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommArc {
    /// Centre bearing (rad)
    pub base: f64,
    /// Half of the arc width (rad)
    pub half_angle: f64,
}

impl CommArc {
    pub fn new(base: f64, half_angle: f64) -> Self {
        Self { base, half_angle }
    }

    /// Arc given by its total width in degrees
    pub fn from_width_degrees(base: f64, width_deg: f64) -> Self {
        Self::new(base, (width_deg / 2.0).to_radians())
    }

    pub fn contains(&self, bearing: f64) -> bool {
        if self.half_angle >= PI {
            return true;
        }
        normalize_angle(bearing - self.base).abs() <= self.half_angle + ARC_EPSILON
    }
}
