use crate::math as m;

/// A (possibly) position-dependent acceleration that the collision manager
/// applies to every movable body, one tick's worth per tick.
///
/// Uniform [`Gravity`] is used unless the manager is given something else
/// with [`CollisionManager::with_force_field`][crate::physics::CollisionManager::with_force_field].
pub trait ForceField {
    fn value_at(&self, position: m::Vec2) -> m::Vec2;
}

/// Constant gravity field over all of space.
#[derive(Clone, Copy, Debug)]
pub struct Gravity(pub m::Vec2);

impl ForceField for Gravity {
    fn value_at(&self, _pos: m::Vec2) -> m::Vec2 {
        self.0
    }
}

impl<F: Fn(m::Vec2) -> m::Vec2> ForceField for F {
    fn value_at(&self, position: m::Vec2) -> m::Vec2 {
        self(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gravity_is_uniform() {
        let field = Gravity(m::Vec2::new(0.0, -9.81));
        assert_eq!(field.value_at(m::Vec2::new(100.0, 3.0)), field.value_at(m::Vec2::zero()));
    }

    #[test]
    fn closures_are_fields() {
        // pulls everything toward the y axis
        let field = |p: m::Vec2| m::Vec2::new(-p.x, 0.0);
        assert_eq!(field.value_at(m::Vec2::new(2.0, 5.0)), m::Vec2::new(-2.0, 0.0));
    }
}
