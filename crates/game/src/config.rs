//! Game configuration (window + simulation tunables). Loaded from config.ron at startup.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config syntax: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("`{field}` must be finite, got {value}")]
    NotFinite { field: &'static str, value: f32 },
    #[error("`{field}` must be positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("`{field}` must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("`{field}` must be in (0, 1], got {value}")]
    NotAFraction { field: &'static str, value: f32 },
    #[error("`{field}` must be in (0, 1), got {value}")]
    NotADecay { field: &'static str, value: f32 },
    #[error("`{field}` must be at least 1")]
    Zero { field: &'static str },
}

/// Persistent game settings. Loaded from `config.ron` in the current directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Window width in logical pixels.
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    /// Window height in logical pixels.
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    /// Enable vsync (recommended to avoid tearing).
    #[serde(default = "default_true")]
    pub vsync: bool,
    #[serde(default)]
    pub sim: SimConfig,
}

fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}
fn default_true() -> bool {
    true
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            vsync: default_true(),
            sim: SimConfig::default(),
        }
    }
}

impl GameConfig {
    /// Load config from `config.ron`. If the file is invalid, returns default config;
    /// if it is missing, the defaults are also written out for editing.
    pub fn load() -> Self {
        let path = config_path();
        match std::fs::read_to_string(&path) {
            Ok(data) => match Self::from_ron(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            },
            Err(_) => {
                let config = Self::default();
                config.save();
                return config;
            }
        }
        Self::default()
    }

    /// Parse and validate a RON document. Missing fields take their defaults.
    pub fn from_ron(data: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(data)?;
        config.sim.validate()?;
        Ok(config)
    }

    /// Save current config to `config.ron`. Logs on error.
    pub fn save(&self) {
        let path = config_path();
        if let Ok(s) = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            if let Err(e) = std::fs::write(&path, s) {
                log::warn!("Could not write config to {:?}: {}", path, e);
            }
        }
    }
}

fn config_path() -> std::path::PathBuf {
    std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from(".")).join("config.ron")
}

/// All simulation tunables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub drive: DriveConfig,
    pub vehicle: VehicleConfig,
    pub projectile: ProjectileConfig,
    pub camera: CameraConfig,
    pub arena: ArenaConfig,
    pub physics: PhysicsConfig,
}

/// Arcade driving model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Horizontal speed while forward/backward is held (m/s).
    pub desired_speed: f32,
    /// Yaw rate while a turn key is held (rad/s).
    pub turn_rate: f32,
    /// Per-tick horizontal velocity multiplier when coasting.
    pub decay: f32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            desired_speed: 5.0,
            turn_rate: 1.5,
            decay: 0.95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub half_extents: [f32; 3],
    pub mass: f32,
    /// How far below the box centre the centre of mass sits.
    pub center_of_mass_drop: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub player_spawn: [f32; 3],
    pub target_spawn: [f32; 3],
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            half_extents: [1.0, 0.25, 2.0],
            mass: 150.0,
            center_of_mass_drop: 0.5,
            linear_damping: 0.1,
            angular_damping: 0.5,
            player_spawn: [0.0, 0.5, 0.0],
            target_spawn: [0.0, 0.5, -20.0],
        }
    }
}

impl VehicleConfig {
    pub fn half_extents(&self) -> Vec3 {
        Vec3::from(self.half_extents)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    /// Minimum time between two successful fires.
    pub cooldown_secs: f32,
    pub speed: f32,
    /// Spawn distance ahead of the firing vehicle.
    pub spawn_offset: f32,
    pub radius: f32,
    pub mass: f32,
    /// Distance from the firing vehicle beyond which a projectile expires.
    pub max_range: f32,
    pub hit_distance: f32,
    /// Magnitude of the impulse applied to a hit vehicle.
    pub impulse: f32,
    pub gravity_scale: f32,
    pub max_live_projectiles: usize,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 1.5,
            speed: 50.0,
            spawn_offset: 3.0,
            radius: 0.3,
            mass: 1.0,
            max_range: 100.0,
            hit_distance: 2.0,
            impulse: 400.0,
            gravity_scale: 0.0,
            max_live_projectiles: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Offset from the tracked vehicle in its local frame (+Z is behind).
    pub offset: [f32; 3],
    /// Fraction of the remaining distance covered per tick.
    pub blend: f32,
    pub initial_position: [f32; 3],
    pub fov_degrees: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            offset: [0.0, 3.0, 8.0],
            blend: 0.1,
            initial_position: [0.0, 10.0, 15.0],
            fov_degrees: 75.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Side length of the square ground.
    pub ground_size: f32,
    pub wall_height: f32,
    pub wall_thickness: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            ground_size: 100.0,
            wall_height: 2.0,
            wall_thickness: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Fixed simulation step in seconds.
    pub timestep: f32,
    pub gravity: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            timestep: 1.0 / 60.0,
            gravity: physics::DEFAULT_GRAVITY,
        }
    }
}

impl SimConfig {
    /// Reject tunables the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.drive;
        positive("drive.desired_speed", d.desired_speed)?;
        positive("drive.turn_rate", d.turn_rate)?;
        decay("drive.decay", d.decay)?;

        let v = &self.vehicle;
        for extent in v.half_extents {
            positive("vehicle.half_extents", extent)?;
        }
        positive("vehicle.mass", v.mass)?;
        non_negative("vehicle.center_of_mass_drop", v.center_of_mass_drop)?;
        non_negative("vehicle.linear_damping", v.linear_damping)?;
        non_negative("vehicle.angular_damping", v.angular_damping)?;
        for c in v.player_spawn.iter().chain(&v.target_spawn) {
            finite("vehicle.spawn", *c)?;
        }

        let p = &self.projectile;
        non_negative("projectile.cooldown_secs", p.cooldown_secs)?;
        positive("projectile.speed", p.speed)?;
        non_negative("projectile.spawn_offset", p.spawn_offset)?;
        positive("projectile.radius", p.radius)?;
        positive("projectile.mass", p.mass)?;
        positive("projectile.max_range", p.max_range)?;
        positive("projectile.hit_distance", p.hit_distance)?;
        non_negative("projectile.impulse", p.impulse)?;
        finite("projectile.gravity_scale", p.gravity_scale)?;
        if p.max_live_projectiles == 0 {
            return Err(ConfigError::Zero {
                field: "projectile.max_live_projectiles",
            });
        }

        let c = &self.camera;
        for o in c.offset.iter().chain(&c.initial_position) {
            finite("camera.offset", *o)?;
        }
        fraction("camera.blend", c.blend)?;
        positive("camera.fov_degrees", c.fov_degrees)?;

        let a = &self.arena;
        positive("arena.ground_size", a.ground_size)?;
        positive("arena.wall_height", a.wall_height)?;
        positive("arena.wall_thickness", a.wall_thickness)?;

        positive("physics.timestep", self.physics.timestep)?;
        finite("physics.gravity", self.physics.gravity)?;
        Ok(())
    }
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field, value })
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn fraction(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::NotAFraction { field, value })
    }
}

/// A per-tick multiplier that must shrink what it scales.
fn decay(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::NotADecay { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = GameConfig::default();
        config.sim.validate().unwrap();
        assert_eq!(config.sim.drive.decay, 0.95);
        assert_eq!(config.sim.projectile.cooldown_secs, 1.5);
        assert_eq!(config.sim.camera.offset, [0.0, 3.0, 8.0]);
    }

    #[test]
    fn defaults_survive_ron() {
        let config = GameConfig::default();
        let text = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default()).unwrap();
        assert_eq!(GameConfig::from_ron(&text).unwrap(), config);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config = GameConfig::from_ron("(window_width: 800, sim: (drive: (desired_speed: 7.0)))").unwrap();
        assert_eq!(config.window_width, 800);
        assert_eq!(config.window_height, 720);
        assert_eq!(config.sim.drive.desired_speed, 7.0);
        assert_eq!(config.sim.drive.turn_rate, 1.5);
        assert_eq!(config.sim.projectile, ProjectileConfig::default());
    }

    #[test]
    fn rejects_bad_tunables() {
        let err = GameConfig::from_ron("(sim: (drive: (decay: 1.5)))").unwrap_err();
        assert!(matches!(err, ConfigError::NotADecay { field: "drive.decay", .. }));

        // Coasting must lose speed.
        let err = GameConfig::from_ron("(sim: (drive: (decay: 1.0)))").unwrap_err();
        assert!(matches!(err, ConfigError::NotADecay { field: "drive.decay", .. }));

        // A blend of 1 snaps the camera, which is allowed.
        let config = GameConfig::from_ron("(sim: (camera: (blend: 1.0)))").unwrap();
        assert_eq!(config.sim.camera.blend, 1.0);

        let err = GameConfig::from_ron("(sim: (physics: (timestep: 0.0)))").unwrap_err();
        assert!(matches!(err, ConfigError::NotPositive { field: "physics.timestep", .. }));

        let err = GameConfig::from_ron("(sim: (projectile: (max_live_projectiles: 0)))").unwrap_err();
        assert!(matches!(err, ConfigError::Zero { .. }));
    }

    #[test]
    fn rejects_malformed_ron() {
        assert!(matches!(GameConfig::from_ron("(window_width: "), Err(ConfigError::Parse(_))));
    }
}
