//! Broad and narrow phase collision detection.

mod aabb;
pub use aabb::AABB;

mod support;
pub use support::{MinkowskiDiff, SupportMap};

pub mod simplex;
pub use simplex::Simplex;

pub mod gjk;
pub mod epa;
pub mod mpr;
pub mod sat;

mod solver;
pub use solver::{CollisionSolver, GjkEpa, Mpr, Resolution, Sat, SolverError};

mod spatial_index;
pub use spatial_index::{SpatialIndex, Sweep};

pub mod bsp_tree;
pub use bsp_tree::BspTree;

pub mod quad_tree;
pub use quad_tree::QuadTree;

pub mod grid;
pub use grid::Grid;

use super::ShapeKey;

/// An unordered pair of shapes.
///
/// `CollisionPair::new(a, b) == CollisionPair::new(b, a)`, and they hash the same.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CollisionPair(ShapeKey, ShapeKey);

impl CollisionPair {
    pub fn new(a: ShapeKey, b: ShapeKey) -> Self {
        if a.bits() <= b.bits() {
            CollisionPair(a, b)
        } else {
            CollisionPair(b, a)
        }
    }

    #[inline]
    pub fn keys(&self) -> (ShapeKey, ShapeKey) {
        (self.0, self.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        math as m,
        physics::{BodySet, Material, Shape},
    };
    use std::collections::HashSet;

    #[test]
    fn pair_is_unordered() {
        let mut bodies = BodySet::new();
        let a = bodies.insert(Shape::circle(m::Vec2::zero(), 1.0, Material::WOOD).unwrap());
        let b = bodies.insert(Shape::circle(m::Vec2::zero(), 1.0, Material::WOOD).unwrap());
        assert_eq!(CollisionPair::new(a, b), CollisionPair::new(b, a));
        let mut set = HashSet::new();
        assert!(set.insert(CollisionPair::new(a, b)));
        assert!(!set.insert(CollisionPair::new(b, a)));
        assert_ne!(CollisionPair::new(a, b), CollisionPair::new(a, a));
    }
}
