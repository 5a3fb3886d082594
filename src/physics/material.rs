/// Surface and bulk properties of a body, consumed as plain data by the collision manager.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-types", serde(default))]
pub struct Material {
    /// Coefficient of restitution. 1 for a perfectly elastic bounce, 0 for none at all.
    /// The smaller of two colliding materials' values is used.
    pub restitution: f64,
    /// Mass per unit of area, in kg/m².
    pub density: f64,
    /// Friction coefficient that must be overcome to start sliding.
    pub static_friction: f64,
    /// Friction coefficient while sliding.
    pub dynamic_friction: f64,
}

impl Material {
    pub const RUBBER: Material = Material::new(0.828, 1.1, 1.0, 0.8);
    /// Perfectly elastic and frictionless. Used for world bounds.
    pub const REFLECTIUM: Material = Material::new(1.0, 1.0, 0.0, 0.0);
    pub const STEEL: Material = Material::new(0.597, 7.82, 0.74, 0.57);
    pub const BUTTER: Material = Material::new(0.05, 0.87, 0.1, 0.05);
    pub const DIRT: Material = Material::new(0.25, 2.1, 0.6, 0.5);
    pub const GRASS: Material = Material::new(0.18, 2.1, 0.55, 0.45);
    pub const FLESH: Material = Material::new(0.13, 1.1, 0.7, 0.5);
    pub const WOOD: Material = Material::new(0.6, 0.8, 0.5, 0.3);
    pub const GLASS: Material = Material::new(0.66, 2.5, 0.9, 0.4);
    /// Heavy and completely inelastic.
    pub const INERTIUM: Material = Material::new(0.0, 100.0, 0.6, 0.4);

    pub const fn new(
        restitution: f64,
        density: f64,
        static_friction: f64,
        dynamic_friction: f64,
    ) -> Self {
        Self {
            restitution,
            density,
            static_friction,
            dynamic_friction,
        }
    }

    /// Set the friction coefficients in a builder-like chain.
    pub const fn with_friction(mut self, static_friction: f64, dynamic_friction: f64) -> Self {
        self.static_friction = static_friction;
        self.dynamic_friction = dynamic_friction;
        self
    }

    /// Set the restitution in a builder-like chain.
    pub const fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    /// Restitution used for a collision between two materials.
    #[inline]
    pub fn combined_restitution(&self, other: &Material) -> f64 {
        self.restitution.min(other.restitution)
    }

    /// Static friction coefficient of a contact, combined as the root of the sum of squares.
    #[inline]
    pub fn combined_static_friction(&self, other: &Material) -> f64 {
        (self.static_friction.powi(2) + other.static_friction.powi(2)).sqrt()
    }

    /// Dynamic friction coefficient of a contact, combined as the root of the sum of squares.
    #[inline]
    pub fn combined_dynamic_friction(&self, other: &Material) -> f64 {
        (self.dynamic_friction.powi(2) + other.dynamic_friction.powi(2)).sqrt()
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::WOOD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combination_rules() {
        let a = Material::RUBBER;
        let b = Material::STEEL;
        assert_eq!(a.combined_restitution(&b), 0.597);
        let mu = Material::new(0.5, 1.0, 0.3, 0.0).combined_static_friction(&Material::new(
            0.5, 1.0, 0.4, 0.0,
        ));
        assert!((mu - 0.5).abs() < 0.001);
        assert_eq!(
            Material::REFLECTIUM.combined_dynamic_friction(&Material::REFLECTIUM),
            0.0
        );
    }

    #[cfg(feature = "serde-types")]
    #[test]
    fn deserialize_partial_material() {
        let mat: Material = ron::from_str("(restitution: 0.25, density: 3.0)").unwrap();
        assert_eq!(mat.restitution, 0.25);
        assert_eq!(mat.density, 3.0);
        // unspecified fields come from the default material
        assert_eq!(mat.static_friction, Material::WOOD.static_friction);
    }
}
