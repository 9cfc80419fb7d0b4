//! Bottle Shatter - Fracture Core Library
//!
//! Destructible objects that shatter into convex physics fragments on impact:
//! - Spatial tessellation (3D Voronoi cells clipped to a box)
//! - Fragment meshes and convex collision hulls
//! - Fragment rigid bodies with jitter and randomized impulse
//! - Destructible lifecycle (Alive → Destroyed, idempotent cleanup)
//! - Projectile impact detection (segment probes, hitscan)
//! - Bevy plugin running the whole thing on the fixed timestep

pub mod config;
pub mod constants;
pub mod destructible;
pub mod fracture;
pub mod impact;
pub mod logging;
pub mod plugin;
pub mod sim;
pub mod world;

pub use config::{ConfigError, ShatterConfig};
pub use plugin::ShatterPlugin;
pub use sim::{FractureReport, ShatterSim};
