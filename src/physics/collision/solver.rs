use super::{epa, gjk, mpr, sat, MinkowskiDiff, Simplex};
use crate::{math as m, physics::Shape};

/// Failures of the iterative narrow phase algorithms.
///
/// These are never returned from a [`CollisionSolver`]; they're logged
/// and the pair is treated as not colliding.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("{algorithm} did not converge within {iterations} iterations")]
    NonConvergence {
        algorithm: &'static str,
        iterations: usize,
    },
    #[error("MPR could not find a portal with nonzero width")]
    DegeneratePortal,
}

/// The outcome of a narrow phase query on a pair of shapes A and B.
///
/// Normals always point from A toward B.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolution {
    /// The shapes overlap. Moving B by `normal * depth` relative to A separates them.
    Penetrating {
        normal: m::Unit<m::Vec2>,
        depth: f64,
    },
    /// The shapes are apart, and `normal * distance` is the shortest vector
    /// from A to B.
    Separated {
        normal: m::Unit<m::Vec2>,
        distance: f64,
    },
    /// The solver failed to converge. Treated as not colliding.
    Unresolved,
}

impl Resolution {
    #[inline]
    pub fn is_colliding(&self) -> bool {
        matches!(self, Resolution::Penetrating { .. })
    }

    /// The normal scaled by depth or distance, zero if unresolved.
    pub fn vector(&self) -> m::Vec2 {
        match *self {
            Resolution::Penetrating { normal, depth } => *normal * depth,
            Resolution::Separated { normal, distance } => *normal * distance,
            Resolution::Unresolved => m::Vec2::zero(),
        }
    }
}

/// A narrow phase algorithm.
pub trait CollisionSolver {
    /// Check whether two shapes intersect.
    fn is_colliding(&self, a: &Shape, b: &Shape) -> bool;

    /// Find the penetration vector if the shapes intersect,
    /// or the separation vector if they don't.
    fn collision_resolution(&self, a: &Shape, b: &Shape) -> Resolution;
}

fn resolve_from_simplex(md: &MinkowskiDiff<'_, Shape, Shape>, simplex: &Simplex) -> Resolution {
    if simplex.is_colliding {
        let (normal, depth) = epa::penetration(md, simplex);
        Resolution::Penetrating { normal, depth }
    } else {
        match epa::separation(md, simplex) {
            Ok((normal, distance)) => Resolution::Separated { normal, distance },
            Err(err) => {
                log::warn!("{}", err);
                Resolution::Unresolved
            }
        }
    }
}

/// GJK for intersection, EPA for penetration depth
/// and a boundary march for separation distance. The default solver.
#[derive(Clone, Copy, Debug, Default)]
pub struct GjkEpa;

impl CollisionSolver for GjkEpa {
    fn is_colliding(&self, a: &Shape, b: &Shape) -> bool {
        match gjk::compute_simplex(&MinkowskiDiff::new(a, b)) {
            Ok(simplex) => simplex.is_colliding,
            Err(err) => {
                log::warn!("{}", err);
                false
            }
        }
    }

    fn collision_resolution(&self, a: &Shape, b: &Shape) -> Resolution {
        let md = MinkowskiDiff::new(a, b);
        match gjk::compute_simplex(&md) {
            Ok(simplex) => resolve_from_simplex(&md, &simplex),
            Err(err) => {
                log::warn!("{}", err);
                Resolution::Unresolved
            }
        }
    }
}

/// Minkowski Portal Refinement for intersection, with the same resolution
/// routines as [`GjkEpa`] seeded from the portal.
///
/// Falls back to GJK when the portal is degenerate.
#[derive(Clone, Copy, Debug, Default)]
pub struct Mpr;

impl Mpr {
    fn gjk_fallback(md: &MinkowskiDiff<'_, Shape, Shape>) -> Option<Simplex> {
        log::debug!("degenerate MPR portal, falling back to GJK");
        match gjk::compute_simplex(md) {
            Ok(simplex) => Some(simplex),
            Err(err) => {
                log::warn!("{}", err);
                None
            }
        }
    }
}

impl CollisionSolver for Mpr {
    fn is_colliding(&self, a: &Shape, b: &Shape) -> bool {
        let md = MinkowskiDiff::new(a, b);
        match mpr::compute_portal(&md) {
            Ok(portal) => portal.is_colliding,
            Err(SolverError::DegeneratePortal) => {
                Self::gjk_fallback(&md).map_or(false, |s| s.is_colliding)
            }
            Err(err) => {
                log::warn!("{}", err);
                false
            }
        }
    }

    fn collision_resolution(&self, a: &Shape, b: &Shape) -> Resolution {
        let md = MinkowskiDiff::new(a, b);
        let simplex = match mpr::compute_portal(&md) {
            Ok(portal) if portal.is_colliding => match mpr::portal_triangle(&md, &portal) {
                Some(triangle) => Some(triangle),
                None => Self::gjk_fallback(&md),
            },
            Ok(portal) => Some(portal),
            Err(SolverError::DegeneratePortal) => Self::gjk_fallback(&md),
            Err(err) => {
                log::warn!("{}", err);
                return Resolution::Unresolved;
            }
        };
        match simplex {
            Some(simplex) => resolve_from_simplex(&md, &simplex),
            None => Resolution::Unresolved,
        }
    }
}

/// Separating axis test for intersection and penetration depth.
///
/// Exact for circles and polygons and cheaper than [`GjkEpa`] for small polygons,
/// but has no notion of distance, so separated pairs are measured with GJK.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sat;

impl CollisionSolver for Sat {
    fn is_colliding(&self, a: &Shape, b: &Shape) -> bool {
        !sat::is_separated(a, b)
    }

    fn collision_resolution(&self, a: &Shape, b: &Shape) -> Resolution {
        if let Some((normal, depth)) = sat::penetration(a, b) {
            return Resolution::Penetrating { normal, depth };
        }
        GjkEpa.collision_resolution(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::Material;

    fn solvers() -> [Box<dyn CollisionSolver>; 3] {
        [Box::new(GjkEpa), Box::new(Mpr), Box::new(Sat)]
    }

    #[test]
    fn square_overlap_depth() {
        let a = Shape::square(m::Vec2::zero(), 2.0, Material::WOOD).unwrap();
        let b = Shape::square(m::Vec2::new(0.2, 1.6), 2.0, Material::WOOD).unwrap();
        for solver in solvers() {
            assert!(solver.is_colliding(&a, &b));
            match solver.collision_resolution(&a, &b) {
                Resolution::Penetrating { normal, depth } => {
                    assert!((depth - 0.4).abs() < 1e-2);
                    assert!((normal.y - 1.0).abs() < 1e-6);
                }
                other => panic!("Expected penetration, got {:?}", other),
            }
        }
    }

    #[test]
    fn circle_separation_distance() {
        let (r1, r2) = (0.75, 1.25);
        let a = Shape::circle(m::Vec2::new(1.0, 1.0), r1, Material::WOOD).unwrap();
        let b = Shape::circle(m::Vec2::new(-3.0, 4.0), r2, Material::WOOD).unwrap();
        for solver in solvers() {
            assert!(!solver.is_colliding(&a, &b));
            match solver.collision_resolution(&a, &b) {
                Resolution::Separated { normal, distance } => {
                    assert!((distance - (5.0 - r1 - r2)).abs() < 1e-2);
                    let toward_b = m::Vec2::new(-4.0, 3.0) / 5.0;
                    assert!(normal.dot(toward_b) > 0.99);
                }
                other => panic!("Expected separation, got {:?}", other),
            }
        }
    }

    #[test]
    fn concentric_shapes() {
        let a = Shape::square(m::Vec2::zero(), 2.0, Material::WOOD).unwrap();
        let b = Shape::circle(m::Vec2::zero(), 0.5, Material::WOOD).unwrap();
        for solver in solvers() {
            let res = solver.collision_resolution(&a, &b);
            assert!(res.is_colliding());
            assert!((res.vector().mag() - 1.5).abs() < 1e-2);
        }
    }

    #[test]
    fn resolution_vector() {
        assert_eq!(Resolution::Unresolved.vector(), m::Vec2::zero());
        let r = Resolution::Separated {
            normal: m::Unit::unit_y(),
            distance: 2.0,
        };
        assert_eq!(r.vector(), m::Vec2::new(0.0, 2.0));
        assert!(!r.is_colliding());
    }

    #[test]
    fn sat_agrees_with_gjk() {
        use rand::{Rng, SeedableRng};

        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let shape = |rng: &mut rand::rngs::StdRng| {
            let pos = m::Vec2::new(rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0));
            if rng.gen_bool(0.4) {
                Shape::circle(pos, rng.gen_range(0.2..1.5), Material::WOOD).unwrap()
            } else {
                Shape::rectangle(
                    pos,
                    rng.gen_range(0.2..2.5),
                    rng.gen_range(0.2..2.5),
                    m::Angle::Deg(rng.gen_range(0.0..180.0)),
                    Material::WOOD,
                )
                .unwrap()
            }
        };

        let mut compared = 0;
        for _ in 0..300 {
            let (a, b) = (shape(&mut rng), shape(&mut rng));
            let (exact, reference) = (
                Sat.collision_resolution(&a, &b),
                GjkEpa.collision_resolution(&a, &b),
            );
            // grazing contacts are up to the tolerances of either side
            if reference.vector().mag() < 1e-2 {
                continue;
            }
            compared += 1;
            assert_eq!(Sat.is_colliding(&a, &b), reference.is_colliding());
            // EPA only approximates curves, so depths are compared for polygons only
            let polygons = a.radius().is_none() && b.radius().is_none();
            if let (Resolution::Penetrating { depth, .. }, true) = (exact, polygons) {
                let ref_depth = reference.vector().mag();
                assert!((depth - ref_depth).abs() < 1e-2, "{} vs {}", depth, ref_depth);
            }
        }
        assert!(compared > 200);
    }
}
