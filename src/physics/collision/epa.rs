//! Penetration depth and separation distance from a finished simplex.
//!
//! Both results are expressed as a unit normal pointing from shape A toward shape B
//! plus a non-negative distance along it. For penetration, moving B by `normal * depth`
//! relative to A separates the shapes. For separation, `normal * distance` is the
//! vector from the closest point on A to the closest point on B.

use super::{MinkowskiDiff, Simplex, SolverError, SupportMap};
use crate::math as m;

/// How close the polytope must get to the true boundary before EPA stops.
pub const EPA_TOLERANCE: f64 = 1e-3;
pub const EPA_MAX_ITERATIONS: usize = 20;
/// How little the separation estimate may improve before the march stops.
pub const SEPARATION_TOLERANCE: f64 = 1e-3;
pub const SEPARATION_MAX_ITERATIONS: usize = 50;

// distances below this count as touching
const TOUCH_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug)]
struct Edge {
    index: usize,
    normal: m::Unit<m::Vec2>,
    distance: f64,
}

/// Expanding Polytope Algorithm.
///
/// Given a simplex enclosing the origin, returns the collision normal and penetration depth.
/// If the iteration limit is hit, logs a warning and returns the best estimate so far.
pub fn penetration<A, B>(
    md: &MinkowskiDiff<'_, A, B>,
    simplex: &Simplex,
) -> (m::Unit<m::Vec2>, f64)
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    let _span = tracy_span!("epa", "penetration");

    let mut polytope: Vec<m::Vec2> = simplex.points().to_vec();
    complete_triangle(md, &mut polytope);
    if polytope.len() < 3 {
        return (fallback_normal(md), 0.0);
    }
    let ccw = m::perp_dot(polytope[1] - polytope[0], polytope[2] - polytope[0]) > 0.0;

    let mut best: Option<Edge> = None;
    for _ in 0..EPA_MAX_ITERATIONS {
        let edge = match closest_edge(&polytope, ccw) {
            Some(edge) => edge,
            None => break,
        };
        best = Some(edge);
        let new = md.support(*edge.normal);
        if new.dot(*edge.normal) - edge.distance < EPA_TOLERANCE {
            return (edge.normal, edge.distance);
        }
        polytope.insert(edge.index + 1, new);
    }

    log::warn!(
        "{}",
        SolverError::NonConvergence {
            algorithm: "EPA",
            iterations: EPA_MAX_ITERATIONS,
        }
    );
    match best {
        Some(edge) => (edge.normal, edge.distance),
        None => (fallback_normal(md), 0.0),
    }
}

/// Find the polytope edge closest to the origin.
fn closest_edge(polytope: &[m::Vec2], ccw: bool) -> Option<Edge> {
    let mut closest: Option<Edge> = None;
    for i in 0..polytope.len() {
        let a = polytope[i];
        let b = polytope[(i + 1) % polytope.len()];
        let edge = b - a;
        let outward = if ccw {
            m::right_normal(edge)
        } else {
            m::left_normal(edge)
        };
        let normal = match m::Unit::try_new(outward, TOUCH_EPSILON) {
            Some(n) => n,
            None => continue,
        };
        // slightly negative if the origin is on the boundary
        let distance = normal.dot(a).max(0.0);
        if closest.map_or(true, |c| distance < c.distance) {
            closest = Some(Edge {
                index: i,
                normal,
                distance,
            });
        }
    }
    closest
}

/// Grow a point or a segment into a non-degenerate triangle if the shapes allow it.
fn complete_triangle<A, B>(md: &MinkowskiDiff<'_, A, B>, polytope: &mut Vec<m::Vec2>)
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    if polytope.is_empty() {
        polytope.push(md.support(m::Vec2::unit_x()));
    }
    if polytope.len() == 1 {
        let first = polytope[0];
        let dirs = [
            m::Vec2::unit_x(),
            -m::Vec2::unit_x(),
            m::Vec2::unit_y(),
            -m::Vec2::unit_y(),
        ];
        if let Some(p) = dirs
            .iter()
            .map(|&d| md.support(d))
            .find(|&p| (p - first).mag_sq() > TOUCH_EPSILON)
        {
            polytope.push(p);
        }
    }
    if polytope.len() == 2 {
        let (a, b) = (polytope[0], polytope[1]);
        let edge = b - a;
        if let Some(p) = [m::left_normal(edge), m::right_normal(edge)]
            .iter()
            .map(|&d| md.support(d))
            .find(|&p| m::perp_dot(edge, p - a).abs() > TOUCH_EPSILON)
        {
            polytope.push(p);
        }
    }
    polytope.truncate(3);
}

/// March toward the origin along the boundary of the Minkowski difference,
/// starting from a simplex that doesn't contain it.
///
/// Returns the separating normal and distance. Shapes that touch return a zero distance
/// with a normal estimated from the contact feature.
pub fn separation<A, B>(
    md: &MinkowskiDiff<'_, A, B>,
    simplex: &Simplex,
) -> Result<(m::Unit<m::Vec2>, f64), SolverError>
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    let _span = tracy_span!("separation march", "separation");

    let (mut p0, mut p1) = match simplex.points() {
        [] => {
            let p = md.support(-md.center());
            (p, p)
        }
        [p] => (*p, *p),
        [.., a, b] => (*a, *b),
    };

    for _ in 0..SEPARATION_MAX_ITERATIONS {
        let closest = m::closest_to_origin(p0, p1);
        let distance = closest.mag();
        if distance < TOUCH_EPSILON {
            return Ok((contact_normal(md, p0, p1), 0.0));
        }
        let dir = -closest / distance;
        let new = md.support(dir);
        // how much closer to the origin the boundary could still get in this direction
        let progress = new.dot(dir) + distance;
        if progress <= SEPARATION_TOLERANCE {
            return Ok((m::Unit::new_unchecked(dir), distance));
        }
        if p0.mag_sq() > p1.mag_sq() {
            p0 = new;
        } else {
            p1 = new;
        }
    }

    Err(SolverError::NonConvergence {
        algorithm: "separation march",
        iterations: SEPARATION_MAX_ITERATIONS,
    })
}

/// Normal of the boundary feature the origin lies on, oriented from A toward B.
fn contact_normal<A, B>(md: &MinkowskiDiff<'_, A, B>, p0: m::Vec2, p1: m::Vec2) -> m::Unit<m::Vec2>
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    let edge = p1 - p0;
    let toward_b = -md.center();
    match m::Unit::try_new(m::left_normal(edge), TOUCH_EPSILON) {
        Some(n) if n.dot(toward_b) < 0.0 => -n,
        Some(n) => n,
        None => fallback_normal(md),
    }
}

/// Direction from the center of A to the center of B, or +x if they coincide.
fn fallback_normal<A, B>(md: &MinkowskiDiff<'_, A, B>) -> m::Unit<m::Vec2>
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    m::Unit::try_new(-md.center(), TOUCH_EPSILON).unwrap_or_else(m::Unit::unit_x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{collision::gjk::compute_simplex, Material, Shape};

    fn resolve(a: &Shape, b: &Shape) -> (bool, m::Unit<m::Vec2>, f64) {
        let md = MinkowskiDiff::new(a, b);
        let simplex = compute_simplex(&md).unwrap();
        if simplex.is_colliding {
            let (n, d) = penetration(&md, &simplex);
            (true, n, d)
        } else {
            let (n, d) = separation(&md, &simplex).unwrap();
            (false, n, d)
        }
    }

    #[test]
    fn overlapping_squares_along_x() {
        let a = Shape::square(m::Vec2::zero(), 2.0, Material::WOOD).unwrap();
        let b = Shape::square(m::Vec2::new(1.5, 0.0), 2.0, Material::WOOD).unwrap();
        let (colliding, n, depth) = resolve(&a, &b);
        assert!(colliding);
        assert!((depth - 0.5).abs() < 1e-2);
        assert!((n.x - 1.0).abs() < 1e-6, "normal was {:?}", n);
        // reversed order flips the normal
        let (_, n, depth) = resolve(&b, &a);
        assert!((depth - 0.5).abs() < 1e-2);
        assert!((n.x + 1.0).abs() < 1e-6);
    }

    #[test]
    fn overlapping_squares_along_y() {
        let a = Shape::square(m::Vec2::zero(), 2.0, Material::WOOD).unwrap();
        let b = Shape::square(m::Vec2::new(0.3, -1.75), 2.0, Material::WOOD).unwrap();
        let (colliding, n, depth) = resolve(&a, &b);
        assert!(colliding);
        assert!((depth - 0.25).abs() < 1e-2);
        assert!((n.y + 1.0).abs() < 1e-6, "normal was {:?}", n);
    }

    #[test]
    fn overlapping_circles() {
        let a = Shape::circle(m::Vec2::zero(), 1.0, Material::WOOD).unwrap();
        let b = Shape::circle(m::Vec2::new(1.2, 1.2), 1.0, Material::WOOD).unwrap();
        let (colliding, n, depth) = resolve(&a, &b);
        assert!(colliding);
        let expected = 2.0 - (1.2_f64 * 1.2 * 2.0).sqrt();
        assert!((depth - expected).abs() < 1e-2, "depth was {}", depth);
        let diag = m::Vec2::new(1.0, 1.0).normalized();
        assert!(n.dot(diag) > 0.99);
    }

    #[test]
    fn circle_separation() {
        let (r1, r2) = (1.0, 0.5);
        let a = Shape::circle(m::Vec2::new(-1.0, 2.0), r1, Material::WOOD).unwrap();
        let b = Shape::circle(m::Vec2::new(3.0, -1.0), r2, Material::WOOD).unwrap();
        let center_dist = 5.0;
        let (colliding, n, dist) = resolve(&a, &b);
        assert!(!colliding);
        assert!((dist - (center_dist - r1 - r2)).abs() < 1e-2, "distance was {}", dist);
        let toward_b = (b.center_of_mass() - a.center_of_mass()).normalized();
        assert!(n.dot(toward_b) > 0.99);
    }

    #[test]
    fn polygon_separation() {
        let a = Shape::square(m::Vec2::zero(), 2.0, Material::WOOD).unwrap();
        let b = Shape::rectangle(
            m::Vec2::new(0.5, 4.0),
            1.0,
            2.0,
            m::Angle::default(),
            Material::WOOD,
        )
        .unwrap();
        let (colliding, n, dist) = resolve(&a, &b);
        assert!(!colliding);
        assert!((dist - 2.0).abs() < 1e-2);
        assert!((n.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn touching_shapes_have_zero_distance() {
        let a = Shape::square(m::Vec2::zero(), 2.0, Material::WOOD).unwrap();
        let b = Shape::square(m::Vec2::new(2.0, 0.5), 2.0, Material::WOOD).unwrap();
        let (_, n, dist) = resolve(&a, &b);
        assert!(dist < 1e-2);
        assert!(n.x > 0.9);
    }

    /// A disc around the origin that gets bigger every time it's asked for a support point.
    struct Inflating {
        calls: std::cell::Cell<usize>,
    }

    impl SupportMap for Inflating {
        fn max_along(&self, dir: m::Vec2) -> m::Vec2 {
            let radius = 1.0 + self.calls.get() as f64;
            self.calls.set(self.calls.get() + 1);
            dir.normalized() * radius
        }

        fn center(&self) -> m::Vec2 {
            m::Vec2::zero()
        }
    }

    /// A single point at the origin.
    struct Origin;

    impl SupportMap for Origin {
        fn max_along(&self, _dir: m::Vec2) -> m::Vec2 {
            m::Vec2::zero()
        }

        fn center(&self) -> m::Vec2 {
            m::Vec2::zero()
        }
    }

    #[test]
    fn penetration_gives_best_estimate_when_out_of_iterations() {
        let inflating = Inflating {
            calls: std::cell::Cell::new(0),
        };
        let md = MinkowskiDiff::new(&inflating, &Origin);
        let simplex = Simplex::from_points(&[
            m::Vec2::new(1.0, 0.0),
            m::Vec2::new(-1.0, 1.0),
            m::Vec2::new(-1.0, -1.0),
        ]);
        let (normal, depth) = penetration(&md, &simplex);
        assert_eq!(inflating.calls.get(), EPA_MAX_ITERATIONS);
        assert!(depth.is_finite() && depth >= 0.0, "depth was {}", depth);
        assert!((normal.mag() - 1.0).abs() < 1e-9);
    }

    /// A shape whose outline has been corrupted into NaNs.
    struct Corrupt;

    impl SupportMap for Corrupt {
        fn max_along(&self, _dir: m::Vec2) -> m::Vec2 {
            m::Vec2::new(f64::NAN, f64::NAN)
        }

        fn center(&self) -> m::Vec2 {
            m::Vec2::new(1.0, 0.0)
        }
    }

    #[test]
    fn separation_of_nan_outline_fails() {
        let md = MinkowskiDiff::new(&Corrupt, &Origin);
        let simplex = Simplex::from_points(&[m::Vec2::new(f64::NAN, f64::NAN)]);
        assert_eq!(
            separation(&md, &simplex),
            Err(SolverError::NonConvergence {
                algorithm: "separation march",
                iterations: SEPARATION_MAX_ITERATIONS,
            })
        );
    }
}
