//! Rigid bodies, their storage, and the per-tick collision pipeline.

pub mod collision;

pub mod forcefield;
pub use forcefield::ForceField;

mod body_set;
pub use body_set::{BodySet, ShapeKey};

mod impulse;

mod manager;
pub use manager::{CollisionManager, IndexKind, ManagerParams, ParamsError, SolverKind, TickStats};

mod material;
pub use material::Material;

mod shape;
pub use shape::{Shape, ShapeError, ShapeKind};

//

/// Mass of a body, which can be infinite.
///
/// This stores both a mass value and its inverse, because calculating inverse mass
/// is expensive and needed a lot in physics calculations.
/// Bodies with infinite mass are immovable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mass {
    Finite { mass: f64, inverse: f64 },
    Infinite,
}

impl From<f64> for Mass {
    #[inline]
    fn from(mass: f64) -> Self {
        Mass::Finite {
            mass,
            inverse: 1.0 / mass,
        }
    }
}

impl Mass {
    /// Get the inverse of the mass, which is zero if the mass is infinite.
    #[inline]
    pub fn inv(&self) -> f64 {
        match self {
            Mass::Finite { inverse, .. } => *inverse,
            Mass::Infinite => 0.0,
        }
    }

    /// Get the mass, or `None` if it's infinite.
    #[inline]
    pub fn finite(&self) -> Option<f64> {
        match self {
            Mass::Finite { mass, .. } => Some(*mass),
            Mass::Infinite => None,
        }
    }
}
