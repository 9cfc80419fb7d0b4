//! Centralized shatter tunables.
//!
//! These are the defaults behind `ShatterConfig::default()`. Everything here
//! can be overridden from a RON config file; nothing in the pipeline reads
//! these directly except through the config.

// =====================================================
// Fracture
// =====================================================

/// Random seeds scattered around the impact point (plus one fixed at the origin)
pub const FRACTURE_POINTS: usize = 12;

/// Radius of the ball the random seeds are drawn from
pub const SEED_RADIUS: f32 = 0.5;

/// Half-extents of the tessellation clip box when not fitted to the source mesh
pub const CLIP_HALF_EXTENT: f32 = 0.5;

/// Upper bound on the seed count; past this a single fracture stalls a frame
pub const MAX_FRACTURE_POINTS: usize = 1024;

// =====================================================
// Fragment physics
// =====================================================

/// Per-axis spawn jitter around the impact point
pub const FRAGMENT_JITTER: f32 = 0.3;

/// Per-axis impulse magnitude bound (impulses drawn from [-IMPULSE, IMPULSE])
pub const FRAGMENT_IMPULSE: f32 = 10.0;

pub const FRAGMENT_MASS: f32 = 0.1;
pub const FRAGMENT_FRICTION: f32 = 0.5;
pub const FRAGMENT_RESTITUTION: f32 = 0.3;

/// Fallback tint when the destroyed node carries no colour
pub const DEFAULT_FRAGMENT_TINT: [f32; 4] = [0.85, 0.9, 0.95, 1.0];

/// Brightness band for `TintMode::Random`
pub const RANDOM_TINT_MIN: f32 = 0.3;
pub const RANDOM_TINT_MAX: f32 = 1.0;

// =====================================================
// Projectiles
// =====================================================

pub const PROJECTILE_SPEED: f32 = 50.0;
pub const PROJECTILE_RADIUS: f32 = 0.1;
pub const PROJECTILE_MASS: f32 = 1.0;

/// Seconds between shots
pub const FIRE_COOLDOWN_SECS: f32 = 0.2;

/// Pellets are despawned once this far from where they were fired
pub const MAX_PROJECTILE_TRAVEL: f32 = 200.0;

/// Reach of a hitscan (click-to-break) ray
pub const HITSCAN_RANGE: f32 = 1000.0;

// =====================================================
// World
// =====================================================

/// Y-up gravity
pub const GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

pub const FIXED_TIMESTEP_SECS: f32 = 1.0 / 60.0;

/// Bottle colour scales (ROYGBIV)
pub const BOTTLE_PALETTE: [[f32; 4]; 7] = [
    [1.0, 0.0, 0.0, 1.0],
    [1.0, 0.5, 0.0, 1.0],
    [1.0, 1.0, 0.0, 1.0],
    [0.0, 1.0, 0.0, 1.0],
    [0.0, 0.0, 1.0, 1.0],
    [0.29, 0.0, 0.51, 1.0],
    [0.58, 0.0, 0.83, 1.0],
];
