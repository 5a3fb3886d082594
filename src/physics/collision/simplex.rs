//! The working state of the simplex-based narrow phase algorithms.

use crate::math as m;

/// Up to three points in Minkowski difference space, the current search direction,
/// and whether the origin was found inside.
///
/// Points are stored oldest first. `dir` is only meaningful once a solver has returned.
#[derive(Clone, Copy, Debug)]
pub struct Simplex {
    points: [m::Vec2; 3],
    len: usize,
    pub dir: m::Vec2,
    pub is_colliding: bool,
}

impl Default for Simplex {
    fn default() -> Self {
        Self::new()
    }
}

impl Simplex {
    pub fn new() -> Self {
        Self {
            points: [m::Vec2::zero(); 3],
            len: 0,
            dir: m::Vec2::zero(),
            is_colliding: false,
        }
    }

    pub fn from_points(points: &[m::Vec2]) -> Self {
        let mut simplex = Self::new();
        for &p in points {
            simplex.push(p);
        }
        simplex
    }

    #[inline]
    pub fn points(&self) -> &[m::Vec2] {
        &self.points[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The most recently added point.
    #[inline]
    pub fn newest(&self) -> Option<m::Vec2> {
        self.points().last().copied()
    }

    /// Add a point as the newest.
    ///
    /// # Panics
    ///
    /// Panics if the simplex already has three points.
    pub fn push(&mut self, p: m::Vec2) {
        assert!(self.len < 3, "Tried to add a fourth point to a 2D simplex");
        self.points[self.len] = p;
        self.len += 1;
    }

    /// Remove the point at `idx`, keeping the order of the rest.
    pub fn remove(&mut self, idx: usize) {
        assert!(idx < self.len, "Simplex index {} out of bounds", idx);
        for i in idx..self.len - 1 {
            self.points[i] = self.points[i + 1];
        }
        self.len -= 1;
    }

    /// Drop everything but the `n` newest points.
    pub fn keep_newest(&mut self, n: usize) {
        if n >= self.len {
            return;
        }
        let drop = self.len - n;
        for i in 0..n {
            self.points[i] = self.points[i + drop];
        }
        self.len = n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_kept() {
        let a = m::Vec2::new(1.0, 0.0);
        let b = m::Vec2::new(2.0, 0.0);
        let c = m::Vec2::new(3.0, 0.0);
        let mut s = Simplex::from_points(&[a, b, c]);
        s.remove(1);
        assert_eq!(s.points(), &[a, c]);
        s.push(b);
        s.keep_newest(1);
        assert_eq!(s.points(), &[b]);
        assert_eq!(s.newest(), Some(b));
    }

    #[test]
    #[should_panic]
    fn fourth_point_panics() {
        let mut s = Simplex::from_points(&[m::Vec2::zero(); 3]);
        s.push(m::Vec2::unit_x());
    }
}
