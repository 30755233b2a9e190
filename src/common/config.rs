//! Simulation configuration.
//!
//! A [`PhysicsConfig`] is built once (from defaults, struct update syntax or
//! an INI file) and handed to the world by value. Nothing reads it from
//! global state.
//!
//! # Configuration File Format
//!
//! ```ini
//! [physics]
//! enabled = true
//! gravity_x = 0
//! gravity_y = 800
//! solver = realistic
//! substep = 1
//!
//! [colliders]
//! composite_strategy = together
//!
//! [continuous]
//! check_for_fast_bodies = true
//! disable_minimum_speed_for_fast_body = false
//! surface_epsilon = 0.1
//!
//! [bodies]
//! default_mass = 10
//! sleep_epsilon = 0.07
//! wake_threshold = 0.21
//! sleep_bias = 0.9
//! can_sleep_by_default = false
//!
//! [dynamic_tree]
//! bounds_padding = 5
//! velocity_multiplier = 2
//!
//! [realistic]
//! position_iterations = 3
//! velocity_iterations = 8
//! slop = 1
//! steering_factor = 0.2
//! warm_start = true
//! contact_solve_bias = vertical-first
//! ```
//!
//! Missing sections or keys keep their default values.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use configparser::ini::Ini;
use log::info;

use crate::error::{CollisionError, Result};
use crate::math::{BoundingBox, Vec2};

/// Which collision solver resolves contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverStrategy {
    /// Push bodies apart and cancel inward velocity. No rotation, no bounce.
    #[default]
    Arcade,
    /// Sequential impulses with friction, restitution and warm starting.
    Realistic,
}

/// How contacts between parts of a composite collider are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeStrategy {
    /// All parts share one contact lifecycle.
    #[default]
    Together,
    /// Every part starts and ends its own contacts.
    Separate,
}

/// Order in which contacts are solved within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContactSolveBias {
    #[default]
    None,
    /// Resolve top/bottom contacts before left/right ones.
    VerticalFirst,
    /// Resolve left/right contacts before top/bottom ones.
    HorizontalFirst,
}

macro_rules! keyword_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = CollisionError;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($ty::$variant),)+
                    other => Err(CollisionError::Config(format!(
                        "unknown {} '{}'",
                        stringify!($ty),
                        other
                    ))),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let name = match self {
                    $($ty::$variant => $name,)+
                };
                f.write_str(name)
            }
        }
    };
}

keyword_enum!(SolverStrategy { Arcade => "arcade", Realistic => "realistic" });
keyword_enum!(CompositeStrategy { Together => "together", Separate => "separate" });
keyword_enum!(ContactSolveBias {
    None => "none",
    VerticalFirst => "vertical-first",
    HorizontalFirst => "horizontal-first",
});

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColliderConfig {
    pub composite_strategy: CompositeStrategy,
}

/// Tunneling prevention for fast bodies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContinuousConfig {
    pub check_for_fast_bodies: bool,
    /// Sweep every active body, however slow.
    pub disable_minimum_speed_for_fast_body: bool,
    /// Distance a swept body is kept away from the surface it would hit.
    pub surface_epsilon: f64,
}

impl Default for ContinuousConfig {
    fn default() -> Self {
        ContinuousConfig {
            check_for_fast_bodies: true,
            disable_minimum_speed_for_fast_body: false,
            surface_epsilon: 0.1,
        }
    }
}

/// Body defaults and sleep tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyConfig {
    pub default_mass: f64,
    /// Bodies whose averaged motion drops below this fall asleep.
    pub sleep_epsilon: f64,
    /// Motion a partner needs to wake a sleeping body on contact.
    pub wake_threshold: f64,
    /// Weight of the previous motion in the running average.
    pub sleep_bias: f64,
    pub can_sleep_by_default: bool,
}

impl Default for BodyConfig {
    fn default() -> Self {
        BodyConfig {
            default_mass: 10.0,
            sleep_epsilon: 0.07,
            wake_threshold: 0.07 * 3.0,
            sleep_bias: 0.9,
            can_sleep_by_default: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicTreeConfig {
    /// Padding added around a leaf when it is reinserted.
    pub bounds_padding: f64,
    /// Scales how far the leaf is stretched along the body's velocity.
    pub velocity_multiplier: f64,
    /// Colliders leaving this box are no longer tracked.
    pub world_bounds: BoundingBox,
}

impl Default for DynamicTreeConfig {
    fn default() -> Self {
        DynamicTreeConfig {
            bounds_padding: 5.0,
            velocity_multiplier: 2.0,
            world_bounds: BoundingBox::new(-f64::MAX, -f64::MAX, f64::MAX, f64::MAX),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ArcadeConfig {
    pub contact_solve_bias: ContactSolveBias,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RealisticConfig {
    pub contact_solve_bias: ContactSolveBias,
    pub position_iterations: usize,
    pub velocity_iterations: usize,
    /// Penetration allowed before positional correction kicks in.
    pub slop: f64,
    /// Fraction of the remaining overlap corrected per position iteration.
    pub steering_factor: f64,
    pub warm_start: bool,
}

impl Default for RealisticConfig {
    fn default() -> Self {
        RealisticConfig {
            contact_solve_bias: ContactSolveBias::None,
            position_iterations: 3,
            velocity_iterations: 8,
            slop: 1.0,
            steering_factor: 0.2,
            warm_start: true,
        }
    }
}

/// Every tunable of the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsConfig {
    pub enabled: bool,
    /// Acceleration applied to bodies that use gravity, in units/s².
    pub gravity: Vec2,
    pub solver: SolverStrategy,
    /// Narrowphase and solve rounds per step.
    pub substep: usize,
    pub colliders: ColliderConfig,
    pub continuous: ContinuousConfig,
    pub bodies: BodyConfig,
    pub dynamic_tree: DynamicTreeConfig,
    pub arcade: ArcadeConfig,
    pub realistic: RealisticConfig,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            enabled: true,
            gravity: Vec2::ZERO,
            solver: SolverStrategy::Arcade,
            substep: 1,
            colliders: ColliderConfig::default(),
            continuous: ContinuousConfig::default(),
            bodies: BodyConfig::default(),
            dynamic_tree: DynamicTreeConfig::default(),
            arcade: ArcadeConfig::default(),
            realistic: RealisticConfig::default(),
        }
    }
}

impl PhysicsConfig {
    /// Loads a configuration from an INI file on top of the defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load(path)
            .map_err(|e| CollisionError::Config(format!("Failed to load config file {:?}: {}", path, e)))?;
        let config = Self::from_ini(&ini)?;
        info!("Loaded physics config from {:?}: solver={}, substep={}", path, config.solver, config.substep);
        Ok(config)
    }

    /// Parses a configuration from INI text on top of the defaults.
    pub fn load_from_str(text: &str) -> Result<Self> {
        let mut ini = Ini::new();
        ini.read(text.to_string())
            .map_err(|e| CollisionError::Config(format!("Failed to parse config: {}", e)))?;
        Self::from_ini(&ini)
    }

    /// Writes every value to an INI file, creating it if needed.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.to_ini()
            .write(path)
            .map_err(|e| CollisionError::Config(format!("Failed to save config file {:?}: {}", path, e)))?;
        info!("Saved physics config to {:?}", path);
        Ok(())
    }

    /// The configuration as INI text.
    pub fn to_ini_string(&self) -> String {
        self.to_ini().writes()
    }

    fn from_ini(ini: &Ini) -> Result<Self> {
        let mut config = PhysicsConfig::default();

        // [physics] section
        read_bool(ini, "physics", "enabled", &mut config.enabled)?;
        read_f64(ini, "physics", "gravity_x", &mut config.gravity.x)?;
        read_f64(ini, "physics", "gravity_y", &mut config.gravity.y)?;
        read_keyword(ini, "physics", "solver", &mut config.solver)?;
        read_usize(ini, "physics", "substep", &mut config.substep)?;
        config.substep = config.substep.max(1);

        // [colliders] section
        read_keyword(ini, "colliders", "composite_strategy", &mut config.colliders.composite_strategy)?;

        // [continuous] section
        let continuous = &mut config.continuous;
        read_bool(ini, "continuous", "check_for_fast_bodies", &mut continuous.check_for_fast_bodies)?;
        read_bool(
            ini,
            "continuous",
            "disable_minimum_speed_for_fast_body",
            &mut continuous.disable_minimum_speed_for_fast_body,
        )?;
        read_f64(ini, "continuous", "surface_epsilon", &mut continuous.surface_epsilon)?;

        // [bodies] section
        let bodies = &mut config.bodies;
        read_f64(ini, "bodies", "default_mass", &mut bodies.default_mass)?;
        read_f64(ini, "bodies", "sleep_epsilon", &mut bodies.sleep_epsilon)?;
        read_f64(ini, "bodies", "wake_threshold", &mut bodies.wake_threshold)?;
        read_f64(ini, "bodies", "sleep_bias", &mut bodies.sleep_bias)?;
        read_bool(ini, "bodies", "can_sleep_by_default", &mut bodies.can_sleep_by_default)?;

        // [dynamic_tree] section
        let tree = &mut config.dynamic_tree;
        read_f64(ini, "dynamic_tree", "bounds_padding", &mut tree.bounds_padding)?;
        read_f64(ini, "dynamic_tree", "velocity_multiplier", &mut tree.velocity_multiplier)?;
        let mut world = tree.world_bounds;
        read_f64(ini, "dynamic_tree", "world_left", &mut world.left)?;
        read_f64(ini, "dynamic_tree", "world_top", &mut world.top)?;
        read_f64(ini, "dynamic_tree", "world_right", &mut world.right)?;
        read_f64(ini, "dynamic_tree", "world_bottom", &mut world.bottom)?;
        tree.world_bounds = BoundingBox::new(world.left, world.top, world.right, world.bottom);

        // [arcade] section
        read_keyword(ini, "arcade", "contact_solve_bias", &mut config.arcade.contact_solve_bias)?;

        // [realistic] section
        let realistic = &mut config.realistic;
        read_keyword(ini, "realistic", "contact_solve_bias", &mut realistic.contact_solve_bias)?;
        read_usize(ini, "realistic", "position_iterations", &mut realistic.position_iterations)?;
        read_usize(ini, "realistic", "velocity_iterations", &mut realistic.velocity_iterations)?;
        read_f64(ini, "realistic", "slop", &mut realistic.slop)?;
        read_f64(ini, "realistic", "steering_factor", &mut realistic.steering_factor)?;
        read_bool(ini, "realistic", "warm_start", &mut realistic.warm_start)?;

        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        let mut set = |section: &str, key: &str, value: String| {
            ini.set(section, key, Some(value));
        };

        set("physics", "enabled", self.enabled.to_string());
        set("physics", "gravity_x", self.gravity.x.to_string());
        set("physics", "gravity_y", self.gravity.y.to_string());
        set("physics", "solver", self.solver.to_string());
        set("physics", "substep", self.substep.to_string());

        set("colliders", "composite_strategy", self.colliders.composite_strategy.to_string());

        let continuous = &self.continuous;
        set("continuous", "check_for_fast_bodies", continuous.check_for_fast_bodies.to_string());
        set(
            "continuous",
            "disable_minimum_speed_for_fast_body",
            continuous.disable_minimum_speed_for_fast_body.to_string(),
        );
        set("continuous", "surface_epsilon", continuous.surface_epsilon.to_string());

        let bodies = &self.bodies;
        set("bodies", "default_mass", bodies.default_mass.to_string());
        set("bodies", "sleep_epsilon", bodies.sleep_epsilon.to_string());
        set("bodies", "wake_threshold", bodies.wake_threshold.to_string());
        set("bodies", "sleep_bias", bodies.sleep_bias.to_string());
        set("bodies", "can_sleep_by_default", bodies.can_sleep_by_default.to_string());

        let tree = &self.dynamic_tree;
        set("dynamic_tree", "bounds_padding", tree.bounds_padding.to_string());
        set("dynamic_tree", "velocity_multiplier", tree.velocity_multiplier.to_string());
        set("dynamic_tree", "world_left", tree.world_bounds.left.to_string());
        set("dynamic_tree", "world_top", tree.world_bounds.top.to_string());
        set("dynamic_tree", "world_right", tree.world_bounds.right.to_string());
        set("dynamic_tree", "world_bottom", tree.world_bounds.bottom.to_string());

        set("arcade", "contact_solve_bias", self.arcade.contact_solve_bias.to_string());

        let realistic = &self.realistic;
        set("realistic", "contact_solve_bias", realistic.contact_solve_bias.to_string());
        set("realistic", "position_iterations", realistic.position_iterations.to_string());
        set("realistic", "velocity_iterations", realistic.velocity_iterations.to_string());
        set("realistic", "slop", realistic.slop.to_string());
        set("realistic", "steering_factor", realistic.steering_factor.to_string());
        set("realistic", "warm_start", realistic.warm_start.to_string());

        ini
    }
}

// --- INI Helpers ---

fn config_error(section: &str, key: &str, e: String) -> CollisionError {
    CollisionError::Config(format!("[{}] {}: {}", section, key, e))
}

fn read_f64(ini: &Ini, section: &str, key: &str, target: &mut f64) -> Result<()> {
    if let Some(value) = ini.getfloat(section, key).map_err(|e| config_error(section, key, e))? {
        *target = value;
    }
    Ok(())
}

fn read_bool(ini: &Ini, section: &str, key: &str, target: &mut bool) -> Result<()> {
    if let Some(value) = ini.getbool(section, key).map_err(|e| config_error(section, key, e))? {
        *target = value;
    }
    Ok(())
}

fn read_usize(ini: &Ini, section: &str, key: &str, target: &mut usize) -> Result<()> {
    if let Some(value) = ini.getuint(section, key).map_err(|e| config_error(section, key, e))? {
        *target = value as usize;
    }
    Ok(())
}

fn read_keyword<T: FromStr<Err = CollisionError>>(ini: &Ini, section: &str, key: &str, target: &mut T) -> Result<()> {
    if let Some(value) = ini.get(section, key) {
        *target = value.parse()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_config_defaults() {
        let config = PhysicsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.solver, SolverStrategy::Arcade);
        assert_eq!(config.substep, 1);
        assert_eq!(config.colliders.composite_strategy, CompositeStrategy::Together);
        assert!((config.bodies.wake_threshold - 0.21).abs() < EPSILON);
        assert!((config.dynamic_tree.bounds_padding - 5.0).abs() < EPSILON);
        assert_eq!(config.realistic.velocity_iterations, 8);
        assert!(config.realistic.warm_start);
    }

    #[test]
    fn test_config_partial_ini_keeps_defaults() {
        let text = "[physics]\ngravity_y = 800\nsolver = Realistic\n\n[realistic]\nwarm_start = false\ncontact_solve_bias = vertical-first\n";
        let config = PhysicsConfig::load_from_str(text).unwrap();
        assert!((config.gravity.y - 800.0).abs() < EPSILON);
        assert_eq!(config.solver, SolverStrategy::Realistic);
        assert!(!config.realistic.warm_start);
        assert_eq!(config.realistic.contact_solve_bias, ContactSolveBias::VerticalFirst);
        // Untouched keys
        assert_eq!(config.realistic.position_iterations, 3);
        assert!((config.continuous.surface_epsilon - 0.1).abs() < EPSILON);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(matches!(
            PhysicsConfig::load_from_str("[physics]\nsolver = verlet\n"),
            Err(CollisionError::Config(_))
        ));
        assert!(matches!(
            PhysicsConfig::load_from_str("[bodies]\ndefault_mass = heavy\n"),
            Err(CollisionError::Config(_))
        ));
    }

    #[test]
    fn test_config_ini_round_trip() {
        let config = PhysicsConfig {
            gravity: Vec2::new(0.0, 981.0),
            solver: SolverStrategy::Realistic,
            substep: 4,
            colliders: ColliderConfig {
                composite_strategy: CompositeStrategy::Separate,
            },
            dynamic_tree: DynamicTreeConfig {
                world_bounds: BoundingBox::new(-5000.0, -5000.0, 5000.0, 5000.0),
                ..DynamicTreeConfig::default()
            },
            realistic: RealisticConfig {
                contact_solve_bias: ContactSolveBias::HorizontalFirst,
                slop: 0.5,
                ..RealisticConfig::default()
            },
            ..PhysicsConfig::default()
        };
        let parsed = PhysicsConfig::load_from_str(&config.to_ini_string()).unwrap();
        assert_eq!(parsed, config);

        // Unbounded worlds survive the trip too
        let defaults = PhysicsConfig::default();
        assert_eq!(PhysicsConfig::load_from_str(&defaults.to_ini_string()).unwrap(), defaults);
    }

    #[test]
    fn test_config_file_round_trip() {
        let _ = env_logger::builder().is_test(true).try_init();
        let path = std::env::temp_dir().join(format!("collision_engine_config_{}.ini", std::process::id()));
        let config = PhysicsConfig {
            enabled: false,
            substep: 2,
            ..PhysicsConfig::default()
        };
        config.save_to_file(&path).unwrap();
        let loaded = PhysicsConfig::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }
}
