//! The Gilbert-Johnson-Keerthi intersection test.

use super::{MinkowskiDiff, Simplex, SolverError, SupportMap};
use crate::math as m;

/// Maximum number of support points fetched before giving up.
pub const GJK_MAX_ITERATIONS: usize = 20;

/// Find out whether the origin is inside the Minkowski difference of two shapes.
///
/// Returns the final simplex. If it's colliding, the simplex is a triangle containing
/// the origin, suitable for seeding [`penetration`][super::epa::penetration].
/// Otherwise it has one or two points on the side of the difference closest to the origin,
/// suitable for seeding [`separation`][super::epa::separation].
pub fn compute_simplex<A, B>(md: &MinkowskiDiff<'_, A, B>) -> Result<Simplex, SolverError>
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    let _span = tracy_span!("gjk", "compute_simplex");

    let mut simplex = Simplex::new();
    let mut seed = md.b.center() - md.a.center();
    if seed.mag_sq() == 0.0 {
        seed = m::Vec2::unit_x();
    }
    let first = md.support(seed);
    simplex.push(first);
    simplex.dir = -first;

    for _ in 0..GJK_MAX_ITERATIONS {
        let new = md.support(simplex.dir);
        // no progress past the origin, or no progress at all
        if new.dot(simplex.dir) <= 0.0 || simplex.points().iter().any(|&p| m::vec_eq(p, new)) {
            simplex.is_colliding = false;
            return Ok(simplex);
        }
        simplex.push(new);
        if evolve(&mut simplex) {
            simplex.is_colliding = true;
            return Ok(simplex);
        }
    }

    Err(SolverError::NonConvergence {
        algorithm: "GJK",
        iterations: GJK_MAX_ITERATIONS,
    })
}

/// Reduce the simplex to the feature closest to the origin and point the search direction
/// at the origin. Returns true if the origin is enclosed.
fn evolve(simplex: &mut Simplex) -> bool {
    match simplex.len() {
        2 => {
            evolve_line(simplex);
            false
        }
        3 => evolve_triangle(simplex),
        n => unreachable!("GJK simplex must have 2 or 3 points during evolution, had {}", n),
    }
}

fn evolve_line(simplex: &mut Simplex) {
    let (b, a) = (simplex.points()[0], simplex.points()[1]);
    let ab = b - a;
    let ao = -a;
    if ab.dot(ao) > 0.0 {
        let mut normal = m::left_normal(ab);
        if normal.dot(ao) < 0.0 {
            normal = -normal;
        }
        simplex.dir = normal;
    } else {
        simplex.keep_newest(1);
        simplex.dir = ao;
    }
}

fn evolve_triangle(simplex: &mut Simplex) -> bool {
    let (c, b, a) = (
        simplex.points()[0],
        simplex.points()[1],
        simplex.points()[2],
    );
    let ab = b - a;
    let ac = c - a;
    let ao = -a;

    let winding = m::perp_dot(ab, ac);
    if winding == 0.0 {
        // collinear, carry on with the newer edge
        simplex.remove(0);
        evolve_line(simplex);
        return false;
    }
    let (ab_out, ac_out) = if winding > 0.0 {
        (m::right_normal(ab), m::left_normal(ac))
    } else {
        (m::left_normal(ab), m::right_normal(ac))
    };

    if ab_out.dot(ao) > 0.0 {
        if ab.dot(ao) > 0.0 {
            simplex.remove(0);
            simplex.dir = ab_out;
        } else {
            simplex.keep_newest(1);
            simplex.dir = ao;
        }
        false
    } else if ac_out.dot(ao) > 0.0 {
        if ac.dot(ao) > 0.0 {
            simplex.remove(1);
            simplex.dir = ac_out;
        } else {
            simplex.keep_newest(1);
            simplex.dir = ao;
        }
        false
    } else {
        true
    }
}
