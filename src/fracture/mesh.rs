//! Cell → render mesh + collision hull.
//!
//! Each boundary polygon is fanned from its first vertex with a flat face
//! normal. The hull is the cell's unique vertex set, so the collider built
//! from it encloses exactly the rendered surface.

use bevy::prelude::*;
use rand::Rng;

use super::tessellate::Cell;
use crate::config::TintMode;
use crate::constants::DEFAULT_FRAGMENT_TINT;
use crate::world::MeshData;

/// Cells thinner than this (in volume) would give the collider a flat hull
const MIN_FRAGMENT_VOLUME: f32 = 1.0e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentMesh {
    pub mesh: MeshData,
    /// Collision hull points, same frame as `mesh`
    pub hull: Vec<Vec3>,
    pub tint: Color,
    pub volume: f32,
}

/// Triangulate `cell`. `None` for cells with fewer than three vertices, no faces or no volume.
pub fn build(cell: &Cell, tint: Color) -> Option<FragmentMesh> {
    if cell.is_degenerate() {
        return None;
    }
    if !cell.vertices.iter().all(|v| v.is_finite()) {
        return None;
    }
    let volume = cell.volume();
    if volume < MIN_FRAGMENT_VOLUME {
        return None;
    }

    let mut mesh = MeshData::default();
    for face in cell.faces.iter().filter(|f| f.len() >= 3) {
        let Some(normal) = face_normal(cell, face) else {
            continue;
        };
        let base = mesh.positions.len() as u32;
        for &index in face {
            mesh.positions.push(cell.vertices[index].to_array());
            mesh.normals.push(normal.to_array());
        }
        for k in 1..face.len() as u32 - 1 {
            mesh.indices.extend_from_slice(&[base, base + k, base + k + 1]);
        }
    }
    if mesh.is_empty() {
        return None;
    }

    Some(FragmentMesh {
        mesh,
        hull: cell.vertices.clone(),
        tint,
        volume,
    })
}

/// Newell normal of a polygon; `None` if it has no area
fn face_normal(cell: &Cell, face: &[usize]) -> Option<Vec3> {
    let mut normal = Vec3::ZERO;
    for i in 0..face.len() {
        let a = cell.vertices[face[i]];
        let b = cell.vertices[face[(i + 1) % face.len()]];
        normal += a.cross(b);
    }
    normal.try_normalize()
}

/// Per-fragment tint for the configured mode. `source` is the destroyed node's tint.
pub fn pick_tint<R: Rng + ?Sized>(mode: TintMode, source: Option<Color>, rng: &mut R) -> Color {
    match mode {
        TintMode::SourceMaterial => source.unwrap_or_else(default_tint),
        TintMode::Random { min, max } => Color::srgb(
            rng.gen_range(min..=max),
            rng.gen_range(min..=max),
            rng.gen_range(min..=max),
        ),
    }
}

pub fn default_tint() -> Color {
    let [r, g, b, a] = DEFAULT_FRAGMENT_TINT;
    Color::srgba(r, g, b, a)
}
