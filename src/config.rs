//! Shatter configuration.
//!
//! Every tunable the fracture pipeline, the fragment spawner and the pellet
//! launcher read lives here. Configs are validated once, up front: a bad
//! value is a setup bug, so construction of the simulation fails instead of
//! producing odd fractures at runtime.

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::logging::TracingConfig;

/// Error type for configuration loading and validation
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("fracture point count must be at least 1")]
    ZeroFracturePoints,
    #[error("fracture point count {count} exceeds the limit of {max}")]
    TooManyFracturePoints { count: usize, max: usize },
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f32 },
    #[error("{field} must be greater than zero, got {value}")]
    NonPositive { field: &'static str, value: f32 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("{field} must lie in [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f32 },
    #[error("{field}: lower bound {min} is above upper bound {max}")]
    InvertedRange {
        field: &'static str,
        min: f32,
        max: f32,
    },
    #[error("Config file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// How fragment surfaces are coloured
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum TintMode {
    /// Sample the destroyed node's tint; fall back to the default tint if it has none
    #[default]
    SourceMaterial,
    /// Random colour with every channel drawn from [min, max]
    Random { min: f32, max: f32 },
}

impl TintMode {
    /// Random tint over the default brightness band
    pub fn random() -> Self {
        TintMode::Random {
            min: RANDOM_TINT_MIN,
            max: RANDOM_TINT_MAX,
        }
    }
}

/// Seed cloud and tessellation bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FractureConfig {
    /// Random seeds on top of the fixed seed at the impact point
    pub points: usize,
    pub seed_radius: f32,
    /// Clip box around the impact point
    pub clip_half_extents: Vec3,
    /// Use the source mesh's bounds instead of `clip_half_extents` when available
    pub fit_clip_to_source: bool,
    pub tint: TintMode,
}

impl Default for FractureConfig {
    fn default() -> Self {
        Self {
            points: FRACTURE_POINTS,
            seed_radius: SEED_RADIUS,
            clip_half_extents: Vec3::splat(CLIP_HALF_EXTENT),
            fit_clip_to_source: false,
            tint: TintMode::SourceMaterial,
        }
    }
}

/// Rigid-body parameters for every spawned fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentConfig {
    pub jitter: f32,
    pub impulse_min: Vec3,
    pub impulse_max: Vec3,
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for FragmentConfig {
    fn default() -> Self {
        Self {
            jitter: FRAGMENT_JITTER,
            impulse_min: Vec3::splat(-FRAGMENT_IMPULSE),
            impulse_max: Vec3::splat(FRAGMENT_IMPULSE),
            mass: FRAGMENT_MASS,
            friction: FRAGMENT_FRICTION,
            restitution: FRAGMENT_RESTITUTION,
        }
    }
}

/// Pellet launcher parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    pub speed: f32,
    pub radius: f32,
    pub mass: f32,
    pub fire_cooldown: f32,
    pub max_travel: f32,
    pub hitscan_range: f32,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            speed: PROJECTILE_SPEED,
            radius: PROJECTILE_RADIUS,
            mass: PROJECTILE_MASS,
            fire_cooldown: FIRE_COOLDOWN_SECS,
            max_travel: MAX_PROJECTILE_TRAVEL,
            hitscan_range: HITSCAN_RANGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShatterConfig {
    pub fracture: FractureConfig,
    pub fragments: FragmentConfig,
    pub projectiles: ProjectileConfig,
    pub gravity: Vec3,
    pub fixed_timestep: f32,
    /// Fixed RNG seed for replayable fractures; entropy when unset
    pub rng_seed: Option<u64>,
    pub logging: TracingConfig,
}

impl Default for ShatterConfig {
    fn default() -> Self {
        Self {
            fracture: FractureConfig::default(),
            fragments: FragmentConfig::default(),
            projectiles: ProjectileConfig::default(),
            gravity: Vec3::from_array(GRAVITY),
            fixed_timestep: FIXED_TIMESTEP_SECS,
            rng_seed: None,
            logging: TracingConfig::default(),
        }
    }
}

impl ShatterConfig {
    /// Parse a RON document. Missing fields take their defaults.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: ShatterConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a RON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fracture = &self.fracture;
        if fracture.points == 0 {
            return Err(ConfigError::ZeroFracturePoints);
        }
        if fracture.points > MAX_FRACTURE_POINTS {
            return Err(ConfigError::TooManyFracturePoints {
                count: fracture.points,
                max: MAX_FRACTURE_POINTS,
            });
        }
        positive("fracture.seed_radius", fracture.seed_radius)?;
        for value in fracture.clip_half_extents.to_array() {
            positive("fracture.clip_half_extents", value)?;
        }
        if let TintMode::Random { min, max } = fracture.tint {
            unit("fracture.tint.min", min)?;
            unit("fracture.tint.max", max)?;
            ordered("fracture.tint", min, max)?;
        }

        let fragments = &self.fragments;
        non_negative("fragments.jitter", fragments.jitter)?;
        for (min, max) in fragments
            .impulse_min
            .to_array()
            .into_iter()
            .zip(fragments.impulse_max.to_array())
        {
            finite("fragments.impulse", min)?;
            finite("fragments.impulse", max)?;
            ordered("fragments.impulse", min, max)?;
        }
        positive("fragments.mass", fragments.mass)?;
        unit("fragments.friction", fragments.friction)?;
        unit("fragments.restitution", fragments.restitution)?;

        let projectiles = &self.projectiles;
        positive("projectiles.speed", projectiles.speed)?;
        positive("projectiles.radius", projectiles.radius)?;
        positive("projectiles.mass", projectiles.mass)?;
        non_negative("projectiles.fire_cooldown", projectiles.fire_cooldown)?;
        positive("projectiles.max_travel", projectiles.max_travel)?;
        positive("projectiles.hitscan_range", projectiles.hitscan_range)?;

        for value in self.gravity.to_array() {
            finite("gravity", value)?;
        }
        positive("fixed_timestep", self.fixed_timestep)?;
        Ok(())
    }
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field, value })
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
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

fn unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { field, value })
    }
}

fn ordered(field: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
    if min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvertedRange { field, min, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ShatterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fracture.points, 12);
        assert!((config.fragments.mass - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.fracture.tint, TintMode::SourceMaterial);
    }

    #[test]
    fn test_zero_points_rejected() {
        let mut config = ShatterConfig::default();
        config.fracture.points = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroFracturePoints)
        ));
    }

    #[test]
    fn test_negative_mass_rejected() {
        let mut config = ShatterConfig::default();
        config.fragments.mass = -1.0;
        match config.validate() {
            Err(ConfigError::NonPositive { field, .. }) => assert_eq!(field, "fragments.mass"),
            other => panic!("expected NonPositive, got {other:?}"),
        }
    }

    #[test]
    fn test_friction_out_of_range_rejected() {
        let mut config = ShatterConfig::default();
        config.fragments.friction = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfUnitRange { .. })
        ));
    }

    #[test]
    fn test_inverted_impulse_rejected() {
        let mut config = ShatterConfig::default();
        config.fragments.impulse_min = Vec3::new(0.0, 5.0, 0.0);
        config.fragments.impulse_max = Vec3::new(1.0, 1.0, 1.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedRange { .. })
        ));
    }

    #[test]
    fn test_nan_jitter_rejected() {
        let mut config = ShatterConfig::default();
        config.fragments.jitter = f32::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::NonFinite { .. })));
    }

    #[test]
    fn test_zero_jitter_allowed() {
        let mut config = ShatterConfig::default();
        config.fragments.jitter = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_random_tint_band_checked() {
        let mut config = ShatterConfig::default();
        config.fracture.tint = TintMode::Random { min: 0.8, max: 0.2 };
        assert!(config.validate().is_err());
        config.fracture.tint = TintMode::Random { min: 0.2, max: 0.8 };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_logging_section_parsed() {
        let config = ShatterConfig::from_ron_str(
            r#"(logging: (default_level: Debug, module_filters: [("shatter_core::impact", Trace)]))"#,
        )
        .unwrap();
        assert_eq!(
            config.logging.to_env_filter_string(),
            "debug,shatter_core::impact=trace"
        );
        assert!(config.logging.show_targets);
        assert_eq!(config.fracture, FractureConfig::default());
    }

    #[test]
    fn test_tint_mode_defaults() {
        assert_eq!(TintMode::default(), TintMode::SourceMaterial);
        assert_eq!(ShatterConfig::default().fracture.tint, TintMode::SourceMaterial);
        let TintMode::Random { min, max } = TintMode::random() else {
            panic!("random() must build a random tint");
        };
        assert_eq!((min, max), (RANDOM_TINT_MIN, RANDOM_TINT_MAX));
        let mut config = ShatterConfig::default();
        config.fracture.tint = TintMode::random();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_ron_fills_defaults() {
        let config =
            ShatterConfig::from_ron_str("(fracture: (points: 128), rng_seed: Some(7))").unwrap();
        assert_eq!(config.fracture.points, 128);
        assert_eq!(config.rng_seed, Some(7));
        assert!((config.fragments.jitter - FRAGMENT_JITTER).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_ron_value_rejected() {
        let err = ShatterConfig::from_ron_str("(fragments: (mass: -0.5))").unwrap_err();
        assert!(matches!(err, ConfigError::NonPositive { .. }));
    }

    #[test]
    fn test_malformed_ron_is_parse_error() {
        let err = ShatterConfig::from_ron_str("(fracture: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_ron_roundtrip() {
        let mut config = ShatterConfig::default();
        config.fracture.points = 64;
        config.fracture.tint = TintMode::Random { min: 0.4, max: 0.9 };
        let text = config.to_ron_string().unwrap();
        let restored = ShatterConfig::from_ron_str(&text).unwrap();
        assert_eq!(restored, config);
    }
}
