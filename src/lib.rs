//! A 2D rigid body collision pipeline for circles and convex polygons.
//!
//! Bodies live in a [`BodySet`][physics::BodySet] and are stepped forward one fixed timestep
//! at a time by a [`CollisionManager`][physics::CollisionManager], which runs a
//! broad phase ([`BspTree`][physics::collision::BspTree],
//! [`QuadTree`][physics::collision::QuadTree] or [`Grid`][physics::collision::Grid]),
//! a narrow phase ([`GjkEpa`][physics::collision::GjkEpa], [`Mpr`][physics::collision::Mpr]
//! or [`Sat`][physics::collision::Sat])
//! and speculative contact resolution every tick.

/// Open a profiling zone when the `tracy` feature is enabled, no-op otherwise.
/// Bind the result to keep the zone open until the end of the scope.
macro_rules! tracy_span {
    ($name:expr, $fn_name:expr) => {{
        #[cfg(feature = "tracy")]
        let span = tracy_client::Client::running()
            .map(|client| client.span_alloc(Some($name), $fn_name, file!(), line!(), 0));
        #[cfg(not(feature = "tracy"))]
        let span = ();
        span
    }};
}

pub mod math;
pub use math::{uv, Angle, Unit, Vec2};

pub mod physics;
pub use physics::{
    collision::{
        self, BspTree, CollisionSolver, GjkEpa, Grid, Mpr, QuadTree, Resolution, Sat,
        SpatialIndex, Sweep, AABB,
    },
    forcefield::{self, ForceField},
    BodySet, CollisionManager, IndexKind, ManagerParams, Mass, Material, ParamsError, Shape,
    ShapeError, ShapeKey, ShapeKind, SolverKind,
};
