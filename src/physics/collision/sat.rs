//! Separating axis test for circles and convex polygons.

use crate::{
    math as m,
    physics::{Shape, ShapeKind},
};

/// Extent of a shape projected onto an axis.
fn project(shape: &Shape, axis: m::Vec2) -> (f64, f64) {
    match shape.kind() {
        ShapeKind::Circle { radius } => {
            let c = shape.center_of_mass().dot(axis);
            (c - radius, c + radius)
        }
        ShapeKind::Polygon => shape
            .points()
            .iter()
            .map(|p| p.dot(axis))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| {
                (lo.min(d), hi.max(d))
            }),
    }
}

/// The axis through a circle's center and the polygon vertex nearest to it,
/// which separates them when no edge normal does.
fn vertex_axis(circle: &Shape, polygon: &Shape) -> Option<m::Unit<m::Vec2>> {
    let center = circle.center_of_mass();
    let nearest = polygon
        .points()
        .iter()
        .copied()
        .min_by(|p, q| (*p - center).mag_sq().total_cmp(&(*q - center).mag_sq()))?;
    m::Unit::try_new(center - nearest, 0.0)
}

fn axes(a: &Shape, b: &Shape) -> Vec<m::Unit<m::Vec2>> {
    match (a.kind(), b.kind()) {
        (ShapeKind::Circle { .. }, ShapeKind::Circle { .. }) => {
            let between = b.center_of_mass() - a.center_of_mass();
            vec![m::Unit::try_new(between, 0.0).unwrap_or_else(m::Unit::unit_x)]
        }
        (ShapeKind::Circle { .. }, ShapeKind::Polygon) => {
            let mut axes = b.edge_normals();
            axes.extend(vertex_axis(a, b));
            axes
        }
        (ShapeKind::Polygon, ShapeKind::Circle { .. }) => {
            let mut axes = a.edge_normals();
            axes.extend(vertex_axis(b, a));
            axes
        }
        (ShapeKind::Polygon, ShapeKind::Polygon) => {
            let mut axes = a.edge_normals();
            axes.extend(b.edge_normals());
            axes
        }
    }
}

/// Whether any candidate axis separates the shapes. Touching counts as intersecting.
pub fn is_separated(a: &Shape, b: &Shape) -> bool {
    axes(a, b).into_iter().any(|axis| {
        let (min_a, max_a) = project(a, *axis);
        let (min_b, max_b) = project(b, *axis);
        max_a < min_b || max_b < min_a
    })
}

/// The smallest translation of B, as a normal pointing from A toward B and a depth,
/// that separates two intersecting shapes. `None` if they don't intersect.
pub fn penetration(a: &Shape, b: &Shape) -> Option<(m::Unit<m::Vec2>, f64)> {
    let mut best: Option<(m::Unit<m::Vec2>, f64)> = None;
    for axis in axes(a, b) {
        let (min_a, max_a) = project(a, *axis);
        let (min_b, max_b) = project(b, *axis);
        // pushing B forward along the axis, or backward
        let forward = max_a - min_b;
        let backward = max_b - min_a;
        if forward < 0.0 || backward < 0.0 {
            return None;
        }
        let candidate = if forward <= backward {
            (axis, forward)
        } else {
            (m::Unit::new_unchecked(-*axis), backward)
        };
        if best.map_or(true, |(_, depth)| candidate.1 < depth) {
            best = Some(candidate);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::Material;

    #[test]
    fn polygon_pairs() {
        let a = Shape::square(m::Vec2::zero(), 2.0, Material::WOOD).unwrap();
        let b = Shape::square(m::Vec2::new(1.7, 0.1), 2.0, Material::WOOD).unwrap();
        let (normal, depth) = penetration(&a, &b).unwrap();
        assert!((depth - 0.3).abs() < 1e-9);
        assert!((normal.x - 1.0).abs() < 1e-9);
        // and the other way around
        let (normal, _) = penetration(&b, &a).unwrap();
        assert!((normal.x + 1.0).abs() < 1e-9);

        let far = Shape::square(m::Vec2::new(2.5, 0.0), 2.0, Material::WOOD).unwrap();
        assert!(is_separated(&a, &far));
        assert!(penetration(&a, &far).is_none());
        // exactly touching
        let touching = Shape::square(m::Vec2::new(2.0, 0.0), 2.0, Material::WOOD).unwrap();
        assert!(!is_separated(&a, &touching));
    }

    #[test]
    fn circle_pairs() {
        let a = Shape::circle(m::Vec2::zero(), 1.0, Material::WOOD).unwrap();
        let b = Shape::circle(m::Vec2::new(0.0, -1.5), 1.0, Material::WOOD).unwrap();
        let (normal, depth) = penetration(&a, &b).unwrap();
        assert!((depth - 0.5).abs() < 1e-9);
        assert!((normal.y + 1.0).abs() < 1e-9);

        // concentric circles still get a direction
        let (_, depth) = penetration(&a, &a.clone()).unwrap();
        assert!((depth - 2.0).abs() < 1e-9);
    }

    #[test]
    fn circle_near_a_corner() {
        let square = Shape::square(m::Vec2::zero(), 2.0, Material::WOOD).unwrap();
        // diagonally off the corner at (1, 1): inside on both edge axes, but not touching
        let circle = Shape::circle(m::Vec2::new(1.5, 1.5), 0.6, Material::WOOD).unwrap();
        assert!(is_separated(&square, &circle));
        assert!(is_separated(&circle, &square));

        let closer = Shape::circle(m::Vec2::new(1.3, 1.3), 0.6, Material::WOOD).unwrap();
        let (normal, depth) = penetration(&square, &closer).unwrap();
        let diagonal = 0.3 * std::f64::consts::SQRT_2;
        assert!((depth - (0.6 - diagonal)).abs() < 1e-9);
        assert!((normal.x - normal.y).abs() < 1e-9 && normal.x > 0.0);
    }
}
