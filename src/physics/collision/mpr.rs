//! Minkowski Portal Refinement, an alternative intersection test to GJK.
//!
//! A ray is cast from a point inside the Minkowski difference toward the origin,
//! and a portal (an edge of the difference the ray passes through) is refined
//! until the origin is known to be on one side of it.

use super::{MinkowskiDiff, Simplex, SolverError, SupportMap};
use crate::math as m;

pub const MPR_MAX_ITERATIONS: usize = 50;
/// How far the boundary must be from the portal for refinement to continue.
pub const MPR_TOLERANCE: f64 = 1e-9;

/// Find the portal the origin ray passes through.
///
/// The returned simplex holds the two portal points, with `dir` set to the portal's
/// outward normal. If the shapes are found not to collide, it may hold only the last
/// support point that failed to pass the origin.
///
/// Returns [`SolverError::DegeneratePortal`] if no portal with a nonzero width could be
/// found, which happens when the ray passes exactly through a vertex.
pub fn compute_portal<A, B>(md: &MinkowskiDiff<'_, A, B>) -> Result<Simplex, SolverError>
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    let _span = tracy_span!("mpr", "compute_portal");

    let v0 = md.center();
    if v0.mag_sq() == 0.0 {
        // the interior point is the origin
        return Err(SolverError::DegeneratePortal);
    }

    let to_origin = -v0;
    let mut v1 = md.support(to_origin);
    if v1.dot(to_origin) <= 0.0 {
        return Ok(not_colliding(&[v1], to_origin));
    }

    let mut n = m::left_normal(v1 - v0);
    if n.dot(to_origin) < 0.0 {
        n = -n;
    }
    if n.mag_sq() == 0.0 || n.dot(to_origin) == 0.0 {
        // origin is on the ray toward v1
        return Err(SolverError::DegeneratePortal);
    }
    let mut v2 = md.support(n);
    if v2.dot(n) <= 0.0 {
        return Ok(not_colliding(&[v1, v2], n));
    }

    for _ in 0..MPR_MAX_ITERATIONS {
        let portal_normal = match m::Unit::try_new(m::left_normal(v2 - v1), 0.0) {
            Some(n) if n.dot(v1 - v0) < 0.0 => -n,
            Some(n) => n,
            None => return Err(SolverError::DegeneratePortal),
        };
        let pn = *portal_normal;

        if pn.dot(-v1) <= 0.0 {
            // origin is on the inner side of the portal
            let mut simplex = Simplex::from_points(&[v1, v2]);
            simplex.dir = pn;
            simplex.is_colliding = true;
            return Ok(simplex);
        }

        let v3 = md.support(pn);
        if v3.dot(pn) <= 0.0 || (v3 - v1).dot(pn) < MPR_TOLERANCE {
            return Ok(not_colliding(&[v1, v2], pn));
        }

        // keep the endpoint on the same side of the ray v0 -> v3 as the origin
        let ray = v3 - v0;
        if m::perp_dot(ray, to_origin) * m::perp_dot(ray, v1 - v0) > 0.0 {
            v2 = v3;
        } else {
            v1 = v3;
        }
    }

    Err(SolverError::NonConvergence {
        algorithm: "MPR",
        iterations: MPR_MAX_ITERATIONS,
    })
}

fn not_colliding(points: &[m::Vec2], dir: m::Vec2) -> Simplex {
    let mut simplex = Simplex::from_points(points);
    simplex.dir = dir;
    simplex.is_colliding = false;
    simplex
}

/// Turn a colliding portal into a triangle around the origin for EPA,
/// by adding the support point on the far side of the difference.
///
/// Returns `None` if the triangle doesn't enclose the origin.
pub fn portal_triangle<A, B>(md: &MinkowskiDiff<'_, A, B>, portal: &Simplex) -> Option<Simplex>
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    let (v1, v2) = match portal.points() {
        [v1, v2] => (*v1, *v2),
        _ => return None,
    };
    let v3 = md.support(-portal.dir);
    let tri = [v1, v2, v3];
    let signs: Vec<f64> = (0..3)
        .map(|i| m::perp_dot(tri[(i + 1) % 3] - tri[i], -tri[i]))
        .collect();
    let encloses = signs.iter().all(|&s| s >= 0.0) || signs.iter().all(|&s| s <= 0.0);
    let area = m::perp_dot(v2 - v1, v3 - v1);
    if encloses && area != 0.0 {
        let mut simplex = Simplex::from_points(&tri);
        simplex.is_colliding = true;
        Some(simplex)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{
        collision::{epa, gjk},
        Material, Shape,
    };
    use rand::{Rng, SeedableRng};

    fn mpr_collides(a: &Shape, b: &Shape) -> Option<bool> {
        compute_portal(&MinkowskiDiff::new(a, b))
            .ok()
            .map(|s| s.is_colliding)
    }

    #[test]
    fn basic_cases() {
        let a = Shape::square(m::Vec2::zero(), 2.0, Material::WOOD).unwrap();
        let b = Shape::square(m::Vec2::new(1.5, 0.3), 2.0, Material::WOOD).unwrap();
        assert_eq!(mpr_collides(&a, &b), Some(true));
        let c = Shape::circle(m::Vec2::new(3.0, 3.0), 1.0, Material::WOOD).unwrap();
        assert_eq!(mpr_collides(&a, &c), Some(false));
        assert_eq!(mpr_collides(&c, &a), Some(false));
        // concentric shapes have no ray to cast
        let d = Shape::circle(m::Vec2::zero(), 0.5, Material::WOOD).unwrap();
        assert!(matches!(
            compute_portal(&MinkowskiDiff::new(&a, &d)),
            Err(SolverError::DegeneratePortal)
        ));
    }

    #[test]
    fn portal_triangle_encloses_origin() {
        let a = Shape::circle(m::Vec2::zero(), 1.0, Material::WOOD).unwrap();
        let b = Shape::circle(m::Vec2::new(0.7, 0.9), 1.0, Material::WOOD).unwrap();
        let md = MinkowskiDiff::new(&a, &b);
        let portal = compute_portal(&md).unwrap();
        assert!(portal.is_colliding);
        let tri = portal_triangle(&md, &portal).unwrap();
        assert_eq!(tri.len(), 3);
    }

    #[test]
    fn agrees_with_gjk() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(99);
        let mut compared = 0;
        for _ in 0..300 {
            let a = Shape::rectangle(
                m::Vec2::zero(),
                rng.gen_range(0.5..3.0),
                rng.gen_range(0.5..3.0),
                m::Angle::Deg(rng.gen_range(0.0..90.0)),
                Material::WOOD,
            )
            .unwrap();
            let b = Shape::circle(
                m::Vec2::new(rng.gen_range(-4.0..4.0), rng.gen_range(-4.0..4.0)),
                rng.gen_range(0.2..1.5),
                Material::WOOD,
            )
            .unwrap();
            let md = MinkowskiDiff::new(&a, &b);
            let (portal, simplex) = match (compute_portal(&md), gjk::compute_simplex(&md)) {
                (Ok(portal), Ok(simplex)) => (portal, simplex),
                _ => continue,
            };
            // skip near-touching pairs where rounding could go either way
            let gap = if simplex.is_colliding {
                epa::penetration(&md, &simplex).1
            } else {
                epa::separation(&md, &simplex).map_or(0.0, |(_, d)| d)
            };
            if gap < 1e-3 {
                continue;
            }
            compared += 1;
            assert_eq!(portal.is_colliding, simplex.is_colliding, "{} vs {}", a, b);
        }
        assert!(compared > 200);
    }
}
