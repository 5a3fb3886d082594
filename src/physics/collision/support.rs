use crate::math as m;

/// Something with a convex outline that can be queried for its extreme points.
pub trait SupportMap {
    /// The point furthest along `dir`.
    fn max_along(&self, dir: m::Vec2) -> m::Vec2;

    /// The point furthest against `dir`.
    #[inline]
    fn min_along(&self, dir: m::Vec2) -> m::Vec2 {
        self.max_along(-dir)
    }

    /// A point inside the shape, typically its center of mass.
    fn center(&self) -> m::Vec2;
}

/// The Minkowski difference `A - B` of two shapes.
///
/// Contains the origin if and only if the shapes intersect.
pub struct MinkowskiDiff<'a, A: ?Sized, B: ?Sized> {
    pub a: &'a A,
    pub b: &'a B,
}

impl<'a, A: SupportMap + ?Sized, B: SupportMap + ?Sized> MinkowskiDiff<'a, A, B> {
    pub fn new(a: &'a A, b: &'a B) -> Self {
        Self { a, b }
    }

    /// The point of the difference furthest along `dir`.
    #[inline]
    pub fn support(&self, dir: m::Vec2) -> m::Vec2 {
        self.a.max_along(dir) - self.b.min_along(dir)
    }

    /// A point inside the difference.
    #[inline]
    pub fn center(&self) -> m::Vec2 {
        self.a.center() - self.b.center()
    }
}
