//! Axis-aligned bounding boxes.

use glam::Vec3;
use serde::{Deserialize, Serialize};


/// World-space axis-aligned box. `min <= max` on every axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Creates a box from two corners, normalizing their order per axis.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    /// Creates a box centred on `center` with half-size `extent`.
    pub fn from_center_extent(center: Vec3, extent: Vec3) -> Self {
        let extent = extent.abs();
        Self { min: center - extent, max: center + extent }
    }

    /// Returns `true` if `point` lies inside the box or on its boundary.
    #[inline]
    pub fn contains_inclusive(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Returns `true` if the two boxes overlap or touch.
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Box centre.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns a copy moved by `offset`.
    #[inline]
    pub fn translated(&self, offset: Vec3) -> Self {
        Self { min: self.min + offset, max: self.max + offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_includes_the_boundary() {
        let aabb = Aabb::new(Vec3::splat(10.0), Vec3::ZERO);
        assert_eq!(aabb.min, Vec3::ZERO);
        assert!(aabb.contains_inclusive(Vec3::ZERO));
        assert!(aabb.contains_inclusive(Vec3::splat(10.0)));
        assert!(!aabb.contains_inclusive(Vec3::new(10.01, 5.0, 5.0)));
    }

    #[test]
    fn touching_boxes_intersect() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = a.translated(Vec3::X);
        let c = a.translated(Vec3::X * 1.5);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert_eq!(b.center(), Vec3::new(1.5, 0.5, 0.5));
    }
}
