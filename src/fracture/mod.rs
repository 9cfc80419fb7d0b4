//! Fracture pipeline: seed cloud → tessellation → fragment meshes → fragment bodies.
//!
//! Runs to completion inside the call. Geometry is built in the impact-local
//! frame (impact point at the origin) and each fragment body is placed at the
//! impact point plus jitter, so the shards start out reassembling the cell
//! layout and then fly apart under their impulses.
//!
//! Degenerate cells and hulls the physics world refuses are skipped and
//! counted; zero fragments is a valid outcome.

pub mod mesh;
pub mod seeds;
pub mod spawn;
pub mod tessellate;

use bevy::prelude::*;
use rand::Rng;
use tracing::{debug, info, warn};

pub use mesh::{build, FragmentMesh};
pub use seeds::FractureSeedSet;
pub use spawn::Fragment;
pub use tessellate::{tessellate, Cell, ClipBox};

use crate::config::{ShatterConfig, TintMode};
use crate::logging::TimingSpan;
use crate::world::{PhysicsWorld, SceneGraph};

/// What to shatter, and where
#[derive(Debug, Clone, Default)]
pub struct FractureRequest {
    /// World-space impact point
    pub impact_point: Vec3,
    /// Tint of the destroyed node, if it had one
    pub source_tint: Option<Color>,
    /// World-space bounds of the destroyed mesh
    pub source_bounds: Option<ClipBox>,
}

#[derive(Debug, Clone, Default)]
pub struct FractureOutcome {
    pub seeds: usize,
    pub cells: usize,
    /// Cells that produced no fragment
    pub skipped: usize,
    pub fragments: Vec<Fragment>,
}

/// Tessellation bounds in the impact-local frame
pub fn clip_bounds(request: &FractureRequest, config: &ShatterConfig) -> ClipBox {
    match request.source_bounds {
        Some(source) if config.fracture.fit_clip_to_source => source.translated(-request.impact_point),
        _ => ClipBox::from_half_extents(Vec3::ZERO, config.fracture.clip_half_extents),
    }
}

/// Run the whole pipeline for one impact
pub fn shatter<P, S, R>(
    request: &FractureRequest,
    config: &ShatterConfig,
    rng: &mut R,
    physics: &mut P,
    scene: &mut S,
) -> FractureOutcome
where
    P: PhysicsWorld + ?Sized,
    S: SceneGraph + ?Sized,
    R: Rng + ?Sized,
{
    let _span = TimingSpan::new("shatter");

    let seeds = FractureSeedSet::generate(
        Vec3::ZERO,
        config.fracture.points,
        config.fracture.seed_radius,
        rng,
    );
    let bounds = clip_bounds(request, config);
    let cells = tessellate(seeds.points(), &bounds);

    let tint_mode = config.fracture.tint;
    if tint_mode == TintMode::SourceMaterial && request.source_tint.is_none() {
        warn!("destroyed node has no tint, using default fragment tint");
    }

    let mut outcome = FractureOutcome {
        seeds: seeds.len(),
        cells: cells.len(),
        ..Default::default()
    };
    for cell in &cells {
        let tint = mesh::pick_tint(tint_mode, request.source_tint, rng);
        let Some(fragment_mesh) = build(cell, tint) else {
            debug!(seed = cell.seed_index, "degenerate cell skipped");
            outcome.skipped += 1;
            continue;
        };
        let index = outcome.fragments.len();
        match spawn::spawn(
            index,
            fragment_mesh,
            request.impact_point,
            &config.fragments,
            rng,
            physics,
            scene,
        ) {
            Some(fragment) => outcome.fragments.push(fragment),
            None => outcome.skipped += 1,
        }
    }

    info!(
        point = ?request.impact_point,
        seeds = outcome.seeds,
        cells = outcome.cells,
        fragments = outcome.fragments.len(),
        skipped = outcome.skipped,
        "shattered"
    );
    outcome
}
