use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::collision::group::CollisionGroup;
use crate::common::config::BodyConfig;
use crate::common::Material;
use crate::math::{Transform, Vec2};

/// How a body takes part in collision resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CollisionType {
    /// Never collides.
    #[default]
    PreventCollision,
    /// Reports contacts but is never moved by them.
    Passive,
    /// Fully simulated.
    Active,
    /// Infinite mass: pushes, but is never pushed.
    Fixed,
}

bitflags! {
    /// Motion axes a body is not allowed to use.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DegreeOfFreedom: u8 {
        const X = 0b001;
        const Y = 0b010;
        const ROTATION = 0b100;
    }
}

/// Kinematic state of an entity, integrated every step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Motion {
    pub vel: Vec2,
    pub acc: Vec2,
    /// Radians per second.
    pub angular_velocity: f64,
    pub torque: f64,
}

/// Physical properties of an entity. Position and rotation live in the
/// entity's transform, velocities in its [`Motion`].
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub mass: f64,
    pub collision_type: CollisionType,
    pub group: CollisionGroup,
    pub material: Material,
    pub use_gravity: bool,
    pub limit_degree_of_freedom: DegreeOfFreedom,
    pub can_sleep: bool,
    pub sleeping: bool,
    /// Running average of squared speed, used to decide when to sleep.
    pub sleep_motion: f64,
    pub old_pos: Vec2,
    pub old_rotation: f64,
}

impl Body {
    /// A body with the default body configuration.
    pub fn new(collision_type: CollisionType) -> Self {
        Self::with_config(collision_type, &BodyConfig::default())
    }

    pub fn with_config(collision_type: CollisionType, config: &BodyConfig) -> Self {
        Body {
            mass: config.default_mass,
            collision_type,
            group: CollisionGroup::ALL,
            material: Material::default(),
            use_gravity: true,
            limit_degree_of_freedom: DegreeOfFreedom::empty(),
            can_sleep: config.can_sleep_by_default,
            sleeping: false,
            sleep_motion: config.sleep_epsilon * 5.0,
            old_pos: Vec2::ZERO,
            old_rotation: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.collision_type == CollisionType::Active
    }

    pub fn is_fixed(&self) -> bool {
        self.collision_type == CollisionType::Fixed
    }

    pub fn is_passive(&self) -> bool {
        self.collision_type == CollisionType::Passive
    }

    pub fn inverse_mass(&self) -> f64 {
        if self.is_fixed() || self.mass <= 0.0 {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    /// Inverse of the given moment of inertia, 0 when the body cannot rotate.
    pub fn inverse_inertia(&self, inertia: f64) -> f64 {
        if self.is_fixed() || self.limit_degree_of_freedom.contains(DegreeOfFreedom::ROTATION) || inertia <= 0.0 {
            0.0
        } else {
            1.0 / inertia
        }
    }

    /// Puts the body to sleep (stopping it) or wakes it with a little
    /// motion budget so it does not fall straight back asleep.
    pub fn set_sleeping(&mut self, sleeping: bool, motion: &mut Motion, config: &BodyConfig) {
        self.sleeping = sleeping;
        if sleeping {
            motion.vel = Vec2::ZERO;
            motion.acc = Vec2::ZERO;
            motion.angular_velocity = 0.0;
            self.sleep_motion = 0.0;
        } else {
            self.sleep_motion = config.sleep_epsilon * 5.0;
        }
    }

    /// Folds this frame's motion into the sleep average and sleeps the body
    /// once it has been still for long enough.
    pub fn update_motion(&mut self, motion: &mut Motion, config: &BodyConfig) {
        if self.sleeping {
            self.set_sleeping(true, motion, config);
        }
        let current = motion.vel.magnitude_squared() + motion.angular_velocity * motion.angular_velocity;
        let bias = config.sleep_bias;
        self.sleep_motion = bias * self.sleep_motion + (1.0 - bias) * current;
        self.sleep_motion = self.sleep_motion.clamp(0.0, 10.0 * config.sleep_epsilon);
        if self.can_sleep && self.sleep_motion < config.sleep_epsilon {
            self.set_sleeping(true, motion, config);
        }
    }

    /// Remembers where the body was before integration.
    pub fn capture_old_transform(&mut self, transform: &Transform) {
        self.old_pos = transform.position;
        self.old_rotation = transform.rotation;
    }

    /// Velocity change from an impulse at `point`, honoring locked axes.
    /// Only active bodies respond.
    ///
    /// # Arguments
    /// * `center` - World position of the body.
    /// * `inverse_inertia` - From [`Body::inverse_inertia`].
    pub fn apply_impulse(&self, motion: &mut Motion, center: Vec2, inverse_inertia: f64, point: Vec2, impulse: Vec2) {
        if !self.is_active() {
            return;
        }
        let mut linear = impulse * self.inverse_mass();
        if self.limit_degree_of_freedom.contains(DegreeOfFreedom::X) {
            linear.x = 0.0;
        }
        if self.limit_degree_of_freedom.contains(DegreeOfFreedom::Y) {
            linear.y = 0.0;
        }
        motion.vel += linear;

        if !self.limit_degree_of_freedom.contains(DegreeOfFreedom::ROTATION) {
            motion.angular_velocity += inverse_inertia * (point - center).cross(impulse);
        }
    }
}
