//! Velocity response of two shapes in contact: restitution and Coulomb friction.

use crate::{math as m, physics::Shape};

/// Tangential speed below which a body in contact stops sliding entirely.
pub const REST_SPEED_THRESHOLD: f64 = 0.01;

/// Impulse magnitudes applied by [`resolve`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ContactImpulse {
    /// Along the contact normal. Negative when anything was applied.
    pub normal: f64,
    /// Along the direction of relative sliding.
    pub tangent: f64,
}

/// Apply collision and friction impulses to two shapes touching along `normal`,
/// which points from A toward B.
///
/// Pending forces are flushed into velocity first.
/// Nothing is applied if the shapes aren't approaching each other along the normal.
pub fn resolve(a: &mut Shape, b: &mut Shape, normal: m::Unit<m::Vec2>) -> ContactImpulse {
    let inv_mass_sum = a.inv_mass() + b.inv_mass();
    if inv_mass_sum == 0.0 {
        return ContactImpulse::default();
    }
    a.flush_forces();
    b.flush_forces();

    let relative_vel = a.velocity() - b.velocity();
    let normal_vel = relative_vel.dot(*normal);
    if normal_vel <= 0.0 {
        return ContactImpulse::default();
    }

    let (mat_a, mat_b) = (*a.material(), *b.material());

    // restitution

    let restitution = mat_a.combined_restitution(&mat_b);
    let normal_impulse = -(1.0 + restitution) * normal_vel / inv_mass_sum;
    a.apply_impulse(*normal * normal_impulse);
    b.apply_impulse(*normal * -normal_impulse);

    // friction

    let tangent_vel = relative_vel - *normal * normal_vel;
    let mut tangent_impulse = 0.0;
    if let Some(tangent) = m::Unit::try_new(tangent_vel, 0.0) {
        let stopping_impulse = -tangent_vel.mag() / inv_mass_sum;
        let max_static = normal_impulse.abs() * mat_a.combined_static_friction(&mat_b);
        tangent_impulse = if stopping_impulse.abs() <= max_static {
            stopping_impulse
        } else {
            -normal_impulse.abs() * mat_a.combined_dynamic_friction(&mat_b)
        };
        a.apply_impulse(*tangent * tangent_impulse);
        b.apply_impulse(*tangent * -tangent_impulse);
    }

    clamp_resting(a, normal);
    clamp_resting(b, normal);

    log::trace!(
        "contact impulse {:.4} normal, {:.4} tangent",
        normal_impulse,
        tangent_impulse
    );
    ContactImpulse {
        normal: normal_impulse,
        tangent: tangent_impulse,
    }
}

/// Zero out tiny tangential velocities left over from floating point error.
fn clamp_resting(shape: &mut Shape, normal: m::Unit<m::Vec2>) {
    let vel = shape.velocity();
    let normal_part = *normal * vel.dot(*normal);
    let tangent_speed = (vel - normal_part).mag();
    if tangent_speed > 0.0 && tangent_speed < REST_SPEED_THRESHOLD {
        shape.set_velocity(normal_part);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::Material;

    fn ball(x: f64, y: f64, vel: m::Vec2, material: Material) -> Shape {
        Shape::circle(m::Vec2::new(x, y), 0.5, material)
            .unwrap()
            .with_velocity(vel)
    }

    fn floor() -> Shape {
        Shape::world_bound(m::Vec2::new(0.0, -1.0), 20.0, 1.0).unwrap()
    }

    #[test]
    fn equal_masses_swap_velocities() {
        let mut a = ball(0.0, 0.0, m::Vec2::new(1.0, 0.0), Material::REFLECTIUM);
        let mut b = ball(1.0, 0.0, m::Vec2::new(-1.0, 0.0), Material::REFLECTIUM);
        let imp = resolve(&mut a, &mut b, m::Unit::unit_x());
        assert!(imp.normal < 0.0);
        assert!(m::vec_approx_eq(a.velocity(), m::Vec2::new(-1.0, 0.0), 1e-9));
        assert!(m::vec_approx_eq(b.velocity(), m::Vec2::new(1.0, 0.0), 1e-9));
    }

    #[test]
    fn separating_shapes_are_left_alone() {
        let mut a = ball(0.0, 0.0, m::Vec2::new(-1.0, 0.0), Material::WOOD);
        let mut b = ball(1.0, 0.0, m::Vec2::new(1.0, 0.0), Material::WOOD);
        let imp = resolve(&mut a, &mut b, m::Unit::unit_x());
        assert_eq!(imp, ContactImpulse::default());
        assert_eq!(a.velocity(), m::Vec2::new(-1.0, 0.0));
        assert_eq!(b.velocity(), m::Vec2::new(1.0, 0.0));
    }

    #[test]
    fn elastic_bounce_off_immovable() {
        let mut floor = floor();
        let mut b = ball(0.0, 0.0, m::Vec2::new(0.0, -5.0), Material::REFLECTIUM);
        resolve(&mut floor, &mut b, m::Unit::unit_y());
        assert!(m::vec_approx_eq(b.velocity(), m::Vec2::new(0.0, 5.0), 1e-9));
        assert_eq!(floor.velocity(), m::Vec2::zero());

        // two immovable shapes never get anything
        let mut other = floor.clone();
        assert_eq!(
            resolve(&mut floor, &mut other, m::Unit::unit_y()),
            ContactImpulse::default()
        );
    }

    #[test]
    fn static_friction_stops_sliding() {
        let mut floor = floor();
        let mut b = ball(0.0, 0.0, m::Vec2::new(0.5, -5.0), Material::WOOD);
        let imp = resolve(&mut floor, &mut b, m::Unit::unit_y());
        // restitution is the smaller of 0.6 and 1
        assert!((b.velocity().y - 3.0).abs() < 1e-9);
        assert!(b.velocity().x.abs() < 1e-9);
        assert!(imp.tangent < 0.0);
    }

    #[test]
    fn dynamic_friction_slows_fast_sliding() {
        let mut floor = floor();
        let mut b = ball(0.0, 0.0, m::Vec2::new(20.0, -1.0), Material::WOOD);
        resolve(&mut floor, &mut b, m::Unit::unit_y());
        // normal impulse 1.6 per unit mass, dynamic coefficient 0.3
        assert!((b.velocity().x - (20.0 - 1.6 * 0.3)).abs() < 1e-9);
        assert!((b.velocity().y - 0.6).abs() < 1e-9);
    }

    #[test]
    fn tiny_tangential_speed_is_clamped() {
        let mut floor = floor();
        let mut b = ball(0.0, 0.0, m::Vec2::new(0.005, -1.0), Material::REFLECTIUM);
        resolve(&mut floor, &mut b, m::Unit::unit_y());
        assert_eq!(b.velocity().x, 0.0);
        assert!((b.velocity().y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pending_forces_count_toward_the_collision() {
        let mut floor = floor();
        let mut b = ball(0.0, 0.0, m::Vec2::zero(), Material::REFLECTIUM);
        let mass = b.mass().finite().unwrap();
        // gravity for one tick, not yet integrated
        b.add_force(m::Vec2::new(0.0, -2.0) * mass);
        resolve(&mut floor, &mut b, m::Unit::unit_y());
        assert_eq!(b.net_force(), m::Vec2::zero());
        assert!(m::vec_approx_eq(b.velocity(), m::Vec2::new(0.0, 2.0), 1e-9));
    }
}
