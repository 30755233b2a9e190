//! Defines physical material properties.

use serde::{Deserialize, Serialize};

/// Surface properties of a body that affect how collisions are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Coefficient of restitution. Range [0, 1].
    /// The restitution of a contact is the product of both bodies' values.
    pub bounciness: f64,
    /// Coulomb friction coefficient. Range [0, infinity).
    /// A contact uses the smaller of the two bodies' values.
    pub friction: f64,
}

impl Material {
    /// Creates a new material with the given bounciness and friction.
    pub fn new(bounciness: f64, friction: f64) -> Self {
        Material {
            // Clamp values to reasonable ranges
            bounciness: bounciness.clamp(0.0, 1.0),
            friction: friction.max(0.0),
        }
    }

    /// Restitution of a contact between two materials.
    pub fn combined_bounciness(&self, other: &Material) -> f64 {
        self.bounciness * other.bounciness
    }

    /// Friction of a contact between two materials.
    pub fn combined_friction(&self, other: &Material) -> f64 {
        self.friction.min(other.friction)
    }
}

impl Default for Material {
    /// A slightly bouncy, very grippy surface.
    fn default() -> Self {
        Material {
            bounciness: 0.2,
            friction: 0.99,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_material_clamps_inputs() {
        let m = Material::new(1.5, -0.3);
        assert!((m.bounciness - 1.0).abs() < EPSILON);
        assert!(m.friction.abs() < EPSILON);
    }

    #[test]
    fn test_material_combination() {
        let rubber = Material::new(0.8, 0.9);
        let ice = Material::new(0.5, 0.05);
        assert!((rubber.combined_bounciness(&ice) - 0.4).abs() < EPSILON);
        assert!((rubber.combined_friction(&ice) - 0.05).abs() < EPSILON);
    }
}
