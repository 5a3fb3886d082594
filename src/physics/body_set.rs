use super::{collision::AABB, Shape, ShapeError};
use crate::math as m;

use thunderdome as td;

/// Key type to look up a shape stored in a [`BodySet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShapeKey(pub(crate) td::Index);

impl ShapeKey {
    /// Get the underlying [`thunderdome::Index`][thunderdome::Index] of this key.
    /// Useful for creating your own mappings from shapes to other things.
    #[inline]
    pub fn index(&self) -> td::Index {
        self.0
    }

    /// A total order over keys, used to normalize unordered pairs.
    #[inline]
    pub(crate) fn bits(&self) -> u64 {
        self.0.to_bits()
    }
}

/// All the bodies in the simulation.
#[derive(Clone, Debug, Default)]
pub struct BodySet {
    shapes: td::Arena<Shape>,
}

impl BodySet {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, shape: Shape) -> ShapeKey {
        ShapeKey(self.shapes.insert(shape))
    }

    pub fn remove(&mut self, key: ShapeKey) -> Option<Shape> {
        self.shapes.remove(key.0)
    }

    /// Surround an area with four immovable walls of the given thickness,
    /// placed just outside the area.
    pub fn enclose(&mut self, area: AABB, thickness: f64) -> Result<[ShapeKey; 4], ShapeError> {
        let (w, h) = (area.width(), area.height());
        let c = area.center();
        let offset_x = (w + thickness) / 2.0;
        let offset_y = (h + thickness) / 2.0;
        let full_w = w + 2.0 * thickness;
        let walls = [
            Shape::world_bound(c - m::Vec2::new(0.0, offset_y), full_w, thickness)?,
            Shape::world_bound(c + m::Vec2::new(0.0, offset_y), full_w, thickness)?,
            Shape::world_bound(c - m::Vec2::new(offset_x, 0.0), thickness, h)?,
            Shape::world_bound(c + m::Vec2::new(offset_x, 0.0), thickness, h)?,
        ];
        Ok(walls.map(|wall| self.insert(wall)))
    }

    /// Access a shape, if it still exists.
    #[inline]
    pub fn get(&self, key: ShapeKey) -> Option<&Shape> {
        self.shapes.get(key.0)
    }

    /// Mutably access a shape, if it still exists.
    #[inline]
    pub fn get_mut(&mut self, key: ShapeKey) -> Option<&mut Shape> {
        self.shapes.get_mut(key.0)
    }

    /// Mutably access two different shapes at once.
    ///
    /// # Panics
    ///
    /// Panics if the keys are equal.
    #[inline]
    pub fn get2_mut(
        &mut self,
        a: ShapeKey,
        b: ShapeKey,
    ) -> (Option<&mut Shape>, Option<&mut Shape>) {
        self.shapes.get2_mut(a.0, b.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShapeKey, &Shape)> {
        self.shapes.iter().map(|(i, s)| (ShapeKey(i), s))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ShapeKey, &mut Shape)> {
        self.shapes.iter_mut().map(|(i, s)| (ShapeKey(i), s))
    }

    pub fn keys(&self) -> impl Iterator<Item = ShapeKey> + '_ {
        self.shapes.iter().map(|(i, _)| ShapeKey(i))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
