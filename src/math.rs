//! Types, aliases and helper operations for doing 2D math with `ultraviolet`.
use std::f64::consts::PI;
pub use ultraviolet as uv;

pub type Vec2 = uv::DVec2;

/// An angle in either degrees or radians.
/// Default conversion from f64 is in degrees.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde-types", derive(serde::Deserialize, serde::Serialize))]
pub enum Angle {
    Rad(f64),
    Deg(f64),
}
impl Angle {
    /// Get the angle as degrees.
    #[inline]
    pub fn deg(&self) -> f64 {
        match self {
            Angle::Rad(rad) => rad * 180.0 / PI,
            Angle::Deg(deg) => *deg,
        }
    }

    /// Get the angle as radians.
    #[inline]
    pub fn rad(&self) -> f64 {
        match self {
            Angle::Rad(rad) => *rad,
            Angle::Deg(deg) => deg * PI / 180.0,
        }
    }
}
impl Default for Angle {
    fn default() -> Self {
        Angle::Rad(0.0)
    }
}
impl From<f64> for Angle {
    fn from(deg: f64) -> Self {
        Angle::Deg(deg)
    }
}

/// Rotate a vector counterclockwise around the origin.
#[inline]
pub fn rotate(v: Vec2, angle: Angle) -> Vec2 {
    let (sin, cos) = angle.rad().sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// A wrapper type to indicate a vector should always be normalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Unit<T>(T);

impl Unit<Vec2> {
    pub fn new_normalize(v: Vec2) -> Self {
        Unit(v.normalized())
    }

    /// Normalize a vector, returning `None` if it's too short to have a direction.
    pub fn try_new(v: Vec2, min_len: f64) -> Option<Self> {
        let len = v.mag();
        if len <= min_len || !len.is_finite() {
            None
        } else {
            Some(Unit(v / len))
        }
    }

    pub const fn new_unchecked(v: Vec2) -> Self {
        Unit(v)
    }

    pub fn unit_x() -> Self {
        Unit(Vec2::unit_x())
    }

    pub fn unit_y() -> Self {
        Unit(Vec2::unit_y())
    }
}

impl<T> std::ops::Deref for Unit<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> std::ops::Neg for Unit<T>
where
    T: std::ops::Neg,
{
    type Output = Unit<<T as std::ops::Neg>::Output>;

    fn neg(self) -> Self::Output {
        Unit(-self.0)
    }
}

// Vec2 utils

#[inline]
pub fn left_normal(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}
#[inline]
pub fn right_normal(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}

/// The z component of the 3D cross product of two vectors on the xy plane.
/// Positive if `b` is counterclockwise from `a`.
#[inline]
pub fn perp_dot(a: Vec2, b: Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Vector projection of `v` onto `onto`. Zero if `onto` is zero.
#[inline]
pub fn project_onto(v: Vec2, onto: Vec2) -> Vec2 {
    let len_sq = onto.mag_sq();
    if len_sq == 0.0 {
        Vec2::zero()
    } else {
        onto * (v.dot(onto) / len_sq)
    }
}

/// Exact component-wise equality. `-0.0` and `0.0` compare equal.
#[inline]
pub fn vec_eq(a: Vec2, b: Vec2) -> bool {
    a.x == b.x && a.y == b.y
}

/// Component-wise equality within a tolerance.
#[inline]
pub fn vec_approx_eq(a: Vec2, b: Vec2, tolerance: f64) -> bool {
    (a.x - b.x).abs() <= tolerance && (a.y - b.y).abs() <= tolerance
}

/// The point on the segment from `a` to `b` closest to the origin.
pub fn closest_to_origin(a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.mag_sq();
    if len_sq == 0.0 {
        return a;
    }
    let t = (-a).dot(ab) / len_sq;
    a + ab * t.clamp(0.0, 1.0)
}
