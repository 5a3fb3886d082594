use super::{
    collision::{SupportMap, AABB},
    Mass, Material,
};
use crate::math as m;

use std::{f64::consts::PI, fmt};

/// Errors that can occur when constructing a [`Shape`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("A polygon needs at least 3 distinct vertices, got {0}")]
    TooFewVertices(usize),
    #[error("Polygon vertices are collinear")]
    Degenerate,
    #[error("Shape dimensions must be positive and finite, got {0}")]
    InvalidSize(f64),
    #[error("Material density must be positive and finite, got {0}")]
    InvalidDensity(f64),
    #[error("Shape coordinates must be finite")]
    NonFinite,
}

/// The geometric kind of a shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShapeKind {
    /// A circle around the shape's single point.
    Circle { radius: f64 },
    /// A convex polygon with vertices in clockwise order.
    Polygon,
}

/// A rigid body: its geometry in world space along with its dynamic state.
///
/// Shapes never rotate. Polygons can be rotated once at construction time.
///
/// A shape with infinite mass is immovable: translation, impulses and integration
/// are all ignored, and its velocity is always zero.
#[derive(Clone, Debug)]
pub struct Shape {
    kind: ShapeKind,
    // world-space vertices in clockwise order, or the center for circles
    points: Vec<m::Vec2>,
    center_of_mass: m::Vec2,
    // center of mass at the start of the current tick
    prev_center: m::Vec2,
    velocity: m::Vec2,
    // accumulated impulse, consumed by the next integration step
    net_force: m::Vec2,
    mass: Mass,
    material: Material,
    area: f64,
}

//
// Construction
//

impl Shape {
    /// Create a circle. Mass is computed from the area and material density.
    pub fn circle(center: m::Vec2, radius: f64, material: Material) -> Result<Self, ShapeError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(ShapeError::InvalidSize(radius));
        }
        check_finite(&[center])?;
        let area = PI * radius * radius;
        Ok(Self::from_parts(
            ShapeKind::Circle { radius },
            vec![center],
            center,
            area,
            mass_from_density(area, &material)?,
            material,
        ))
    }

    /// Create a convex polygon from vertices in any order.
    ///
    /// The vertices are rearranged into clockwise order.
    /// Mass is computed from the area and material density.
    pub fn polygon(
        points: impl IntoIterator<Item = m::Vec2>,
        material: Material,
    ) -> Result<Self, ShapeError> {
        let points: Vec<m::Vec2> = points.into_iter().collect();
        if points.len() < 3 {
            return Err(ShapeError::TooFewVertices(points.len()));
        }
        check_finite(&points)?;
        let points = arrange_clockwise(points);
        if points.len() < 3 {
            return Err(ShapeError::TooFewVertices(points.len()));
        }
        let (signed_area, centroid) = area_and_centroid(&points);
        let area = signed_area.abs();
        if area < 1e-12 {
            return Err(ShapeError::Degenerate);
        }
        Ok(Self::from_parts(
            ShapeKind::Polygon,
            points,
            centroid,
            area,
            mass_from_density(area, &material)?,
            material,
        ))
    }

    /// Create a rectangle centered at `center`, rotated counterclockwise by `angle`.
    pub fn rectangle(
        center: m::Vec2,
        width: f64,
        height: f64,
        angle: m::Angle,
        material: Material,
    ) -> Result<Self, ShapeError> {
        for size in [width, height] {
            if !(size.is_finite() && size > 0.0) {
                return Err(ShapeError::InvalidSize(size));
            }
        }
        let (hw, hh) = (width / 2.0, height / 2.0);
        let corners = [
            m::Vec2::new(-hw, hh),
            m::Vec2::new(hw, hh),
            m::Vec2::new(hw, -hh),
            m::Vec2::new(-hw, -hh),
        ];
        Self::polygon(
            corners.iter().map(|&c| center + m::rotate(c, angle)),
            material,
        )
    }

    /// Create an axis-aligned square.
    pub fn square(center: m::Vec2, side: f64, material: Material) -> Result<Self, ShapeError> {
        Self::rectangle(center, side, side, m::Angle::default(), material)
    }

    /// Create an immovable axis-aligned rectangle to bound the world with.
    pub fn world_bound(center: m::Vec2, width: f64, height: f64) -> Result<Self, ShapeError> {
        let shape = Self::rectangle(
            center,
            width,
            height,
            m::Angle::default(),
            Material::REFLECTIUM,
        )?;
        Ok(shape.with_mass(Mass::Infinite))
    }

    fn from_parts(
        kind: ShapeKind,
        points: Vec<m::Vec2>,
        center_of_mass: m::Vec2,
        area: f64,
        mass: Mass,
        material: Material,
    ) -> Self {
        Self {
            kind,
            points,
            center_of_mass,
            prev_center: center_of_mass,
            velocity: m::Vec2::zero(),
            net_force: m::Vec2::zero(),
            mass,
            material,
            area,
        }
    }

    /// Set the velocity of the shape in a builder-like chain.
    pub fn with_velocity(mut self, velocity: m::Vec2) -> Self {
        self.set_velocity(velocity);
        self
    }

    /// Override the mass computed from density in a builder-like chain.
    /// Setting an infinite mass makes the shape immovable.
    pub fn with_mass(mut self, mass: Mass) -> Self {
        self.mass = mass;
        if self.is_immovable() {
            self.velocity = m::Vec2::zero();
            self.net_force = m::Vec2::zero();
        }
        self
    }
}

fn check_finite(points: &[m::Vec2]) -> Result<(), ShapeError> {
    if points.iter().all(|p| p.x.is_finite() && p.y.is_finite()) {
        Ok(())
    } else {
        Err(ShapeError::NonFinite)
    }
}

fn mass_from_density(area: f64, material: &Material) -> Result<Mass, ShapeError> {
    if !(material.density.is_finite() && material.density > 0.0) {
        return Err(ShapeError::InvalidDensity(material.density));
    }
    Ok(Mass::from(area * material.density))
}

/// Order the vertices of a convex polygon clockwise.
///
/// Vertices are split by the line from the leftmost to the rightmost vertex;
/// the ones above it come first from left to right, then the ones below from right to left.
/// Duplicate vertices are dropped.
pub(crate) fn arrange_clockwise(mut points: Vec<m::Vec2>) -> Vec<m::Vec2> {
    points.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    points.dedup_by(|a, b| m::vec_eq(*a, *b));
    if points.len() < 3 {
        return points;
    }

    let left = points[0];
    let right = points[points.len() - 1];
    let axis = right - left;
    let (upper, mut lower): (Vec<m::Vec2>, Vec<m::Vec2>) = points[1..points.len() - 1]
        .iter()
        .copied()
        .partition(|&p| m::perp_dot(axis, p - left) > 0.0);
    lower.reverse();

    let mut arranged = Vec::with_capacity(points.len());
    arranged.push(left);
    arranged.extend(upper);
    arranged.push(right);
    arranged.extend(lower);
    arranged
}

/// Signed area (negative for clockwise winding) and centroid of a polygon.
fn area_and_centroid(points: &[m::Vec2]) -> (f64, m::Vec2) {
    let mut area = 0.0;
    let mut weighted = m::Vec2::zero();
    for (i, &p) in points.iter().enumerate() {
        let next = points[(i + 1) % points.len()];
        let cross = m::perp_dot(p, next);
        area += cross;
        weighted += (p + next) * cross;
    }
    area /= 2.0;
    if area == 0.0 {
        return (0.0, points[0]);
    }
    (area, weighted / (6.0 * area))
}

//
// Accessors
//

impl Shape {
    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Current world-space vertices in clockwise order, or the center point of a circle.
    #[inline]
    pub fn points(&self) -> &[m::Vec2] {
        &self.points
    }

    /// The vertices as they were at the start of the current tick.
    pub fn prev_points(&self) -> Vec<m::Vec2> {
        self.interpolated_points(0.0)
    }

    /// Vertices linearly interpolated between the start of the tick (`alpha == 0`)
    /// and the current state (`alpha == 1`), for drawing between ticks.
    pub fn interpolated_points(&self, alpha: f64) -> Vec<m::Vec2> {
        let offset = (self.prev_center - self.center_of_mass) * (1.0 - alpha);
        self.points.iter().map(|&p| p + offset).collect()
    }

    #[inline]
    pub fn center_of_mass(&self) -> m::Vec2 {
        self.center_of_mass
    }

    /// Center of mass at the start of the current tick.
    #[inline]
    pub fn prev_center(&self) -> m::Vec2 {
        self.prev_center
    }

    #[inline]
    pub fn interpolated_center(&self, alpha: f64) -> m::Vec2 {
        self.prev_center + (self.center_of_mass - self.prev_center) * alpha
    }

    #[inline]
    pub fn velocity(&self) -> m::Vec2 {
        self.velocity
    }

    /// Impulse accumulated since the last integration step.
    #[inline]
    pub fn net_force(&self) -> m::Vec2 {
        self.net_force
    }

    #[inline]
    pub fn mass(&self) -> Mass {
        self.mass
    }

    #[inline]
    pub fn inv_mass(&self) -> f64 {
        self.mass.inv()
    }

    #[inline]
    pub fn is_immovable(&self) -> bool {
        self.mass.inv() == 0.0
    }

    #[inline]
    pub fn material(&self) -> &Material {
        &self.material
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Radius of a circle, `None` for polygons.
    #[inline]
    pub fn radius(&self) -> Option<f64> {
        match self.kind {
            ShapeKind::Circle { radius } => Some(radius),
            ShapeKind::Polygon => None,
        }
    }

    /// Outward unit normals of a polygon's edges, in vertex order.
    /// Empty for circles.
    pub fn edge_normals(&self) -> Vec<m::Unit<m::Vec2>> {
        match self.kind {
            ShapeKind::Circle { .. } => Vec::new(),
            ShapeKind::Polygon => (0..self.points.len())
                .map(|i| {
                    let edge = self.points[(i + 1) % self.points.len()] - self.points[i];
                    // left is outward for clockwise winding
                    m::Unit::new_normalize(m::left_normal(edge))
                })
                .collect(),
        }
    }

    /// Axis-aligned bounding box at the current position.
    pub fn aabb(&self) -> AABB {
        match self.kind {
            ShapeKind::Circle { radius } => {
                let r = m::Vec2::new(radius, radius);
                AABB {
                    min: self.center_of_mass - r,
                    max: self.center_of_mass + r,
                }
            }
            ShapeKind::Polygon => AABB::from_points(&self.points),
        }
    }

    /// Bounding box covering the shape over a tick of length `dt` at its current velocity.
    pub fn swept_aabb(&self, dt: f64) -> AABB {
        let aabb = self.aabb();
        aabb.union(&aabb.translated(self.velocity * dt))
    }

    /// A short human-readable description for debugging.
    pub fn repr(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ShapeKind::Circle { radius } => write!(f, "Circle(r={radius:.3})")?,
            ShapeKind::Polygon => write!(f, "Polygon({} vertices)", self.points.len())?,
        }
        let c = self.center_of_mass;
        let v = self.velocity;
        write!(f, " at ({:.3}, {:.3}) v=({:.3}, {:.3})", c.x, c.y, v.x, v.y)?;
        match self.mass {
            Mass::Finite { mass, .. } => write!(f, " m={mass:.3}"),
            Mass::Infinite => write!(f, " immovable"),
        }
    }
}

impl SupportMap for Shape {
    fn max_along(&self, dir: m::Vec2) -> m::Vec2 {
        match self.kind {
            ShapeKind::Circle { radius } => match m::Unit::try_new(dir, 0.0) {
                Some(dir) => self.center_of_mass + *dir * radius,
                None => self.center_of_mass,
            },
            ShapeKind::Polygon => {
                let mut best = self.points[0];
                let mut best_proj = best.dot(dir);
                for &p in &self.points[1..] {
                    let proj = p.dot(dir);
                    if proj > best_proj {
                        best = p;
                        best_proj = proj;
                    }
                }
                best
            }
        }
    }

    #[inline]
    fn center(&self) -> m::Vec2 {
        self.center_of_mass
    }
}

//
// Mutation
//

impl Shape {
    /// Set the velocity. Ignored for immovable shapes.
    pub fn set_velocity(&mut self, velocity: m::Vec2) {
        if !self.is_immovable() {
            self.velocity = velocity;
        }
    }

    /// Move the shape without affecting its velocity. Ignored for immovable shapes.
    pub fn translate(&mut self, offset: m::Vec2) {
        if self.is_immovable() {
            return;
        }
        for p in &mut self.points {
            *p += offset;
        }
        self.center_of_mass += offset;
    }

    /// Accumulate an impulse to be applied at the next integration step.
    pub fn add_force(&mut self, impulse: m::Vec2) {
        if !self.is_immovable() {
            self.net_force += impulse;
        }
    }

    /// Change velocity immediately by an impulse.
    pub fn apply_impulse(&mut self, impulse: m::Vec2) {
        if !self.is_immovable() {
            self.velocity += impulse * self.inv_mass();
        }
    }

    /// Turn the accumulated impulse into velocity.
    pub fn flush_forces(&mut self) {
        self.velocity += self.net_force * self.inv_mass();
        self.net_force = m::Vec2::zero();
    }

    /// Apply accumulated impulses and advance the position by `fraction` of a tick of length `dt`.
    pub fn integrate(&mut self, dt: f64, fraction: f64) {
        self.flush_forces();
        self.translate(self.velocity * dt * fraction);
    }

    /// Record the current position as the start of a new tick.
    pub fn begin_tick(&mut self) {
        self.prev_center = self.center_of_mass;
    }
}
