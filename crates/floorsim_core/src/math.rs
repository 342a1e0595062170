//! Geometry helpers shared by components, navigation and systems.

pub use glam::DVec2;

/// Planar point in floorplan coordinates.
pub type Point = DVec2;

/// Distance under which two points are considered the same place.
pub const ARRIVAL_EPSILON: f64 = 1e-6;

/// Hashable key for a point.
///
/// `-0.0` and `0.0` map to the same key; NaN coordinates are not expected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointKey(u64, u64);

impl From<Point> for PointKey {
    fn from(p: Point) -> Self {
        Self((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits())
    }
}

#[inline]
pub fn distance(a: Point, b: Point) -> f64 {
    a.distance(b)
}

#[inline]
pub fn same_place(a: Point, b: Point) -> bool {
    a.distance(b) <= ARRIVAL_EPSILON
}
