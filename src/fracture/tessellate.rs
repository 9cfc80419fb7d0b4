//! 3D Voronoi tessellation by half-space clipping.
//!
//! Each seed's cell starts as the clip box and is cut by the bisector plane
//! against every other seed, nearest first. Once the nearest remaining seed
//! is more than twice as far away as the cell's furthest vertex, no later
//! bisector can reach the cell and clipping stops.
//!
//! The output is a pure function of the seed slice and the bounds: no
//! randomness, no hashing, neighbours visited in (distance, index) order.

use bevy::prelude::*;

/// Relative tolerance, scaled by the clip box diagonal
const RELATIVE_EPSILON: f32 = 1.0e-5;

/// Axis-aligned clip region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl ClipBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Tight box around the points; `None` for an empty iterator
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn volume(&self) -> f32 {
        let size = self.size();
        size.x * size.y * size.z
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// The six faces, each wound counter-clockwise seen from outside
    fn faces(&self) -> Vec<Vec<Vec3>> {
        let (a, b) = (self.min, self.max);
        let p000 = Vec3::new(a.x, a.y, a.z);
        let p100 = Vec3::new(b.x, a.y, a.z);
        let p110 = Vec3::new(b.x, b.y, a.z);
        let p010 = Vec3::new(a.x, b.y, a.z);
        let p001 = Vec3::new(a.x, a.y, b.z);
        let p101 = Vec3::new(b.x, a.y, b.z);
        let p111 = Vec3::new(b.x, b.y, b.z);
        let p011 = Vec3::new(a.x, b.y, b.z);
        vec![
            vec![p000, p010, p110, p100], // -z
            vec![p001, p101, p111, p011], // +z
            vec![p000, p100, p101, p001], // -y
            vec![p010, p011, p111, p110], // +y
            vec![p000, p001, p011, p010], // -x
            vec![p100, p110, p111, p101], // +x
        ]
    }
}

/// One convex region of the tessellation
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Index of the owning seed in the input slice
    pub seed_index: usize,
    pub seed: Vec3,
    /// Unique boundary vertices
    pub vertices: Vec<Vec3>,
    /// Boundary polygons as indices into `vertices`, counter-clockwise seen from outside
    pub faces: Vec<Vec<usize>>,
}

impl Cell {
    fn degenerate(seed_index: usize, seed: Vec3) -> Self {
        Self {
            seed_index,
            seed,
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Fewer than three vertices or no faces: produces no fragment
    pub fn is_degenerate(&self) -> bool {
        self.vertices.len() < 3 || self.faces.is_empty()
    }

    /// Enclosed volume (divergence theorem over fan triangles)
    pub fn volume(&self) -> f32 {
        let Some(&origin) = self.vertices.first() else {
            return 0.0;
        };
        let mut six_volume = 0.0;
        for face in &self.faces {
            for k in 1..face.len().saturating_sub(1) {
                let a = self.vertices[face[0]] - origin;
                let b = self.vertices[face[k]] - origin;
                let c = self.vertices[face[k + 1]] - origin;
                six_volume += a.dot(b.cross(c));
            }
        }
        six_volume / 6.0
    }

    /// Vertex average; always inside a convex cell
    pub fn centroid(&self) -> Vec3 {
        if self.vertices.is_empty() {
            return self.seed;
        }
        self.vertices.iter().copied().sum::<Vec3>() / self.vertices.len() as f32
    }
}

/// Convex polyhedron as a list of polygons, used while clipping
struct Polyhedron {
    faces: Vec<Vec<Vec3>>,
}

impl Polyhedron {
    fn max_distance_from(&self, point: Vec3) -> f32 {
        self.faces
            .iter()
            .flatten()
            .map(|p| p.distance(point))
            .fold(0.0, f32::max)
    }

    /// Keep the half-space `normal · p <= offset`. Returns false once nothing is left.
    fn clip(&mut self, normal: Vec3, offset: f32, eps: f32) -> bool {
        let dist = |p: Vec3| normal.dot(p) - offset;

        let mut any_outside = false;
        let mut any_inside = false;
        for &p in self.faces.iter().flatten() {
            let d = dist(p);
            any_outside |= d > eps;
            any_inside |= d < -eps;
        }
        if !any_outside {
            return true;
        }
        if !any_inside {
            self.faces.clear();
            return false;
        }

        let mut cap = Vec::new();
        let mut face_on_plane = false;
        let mut faces = Vec::with_capacity(self.faces.len() + 1);
        for face in &self.faces {
            let mut clipped = Vec::with_capacity(face.len() + 1);
            let mut on_plane = 0;
            for i in 0..face.len() {
                let a = face[i];
                let b = face[(i + 1) % face.len()];
                let (da, db) = (dist(a), dist(b));
                if da <= eps {
                    clipped.push(a);
                    if da >= -eps {
                        cap.push(a);
                        on_plane += 1;
                    }
                }
                if (da < -eps && db > eps) || (da > eps && db < -eps) {
                    let crossing = a + (b - a) * (da / (da - db));
                    clipped.push(crossing);
                    cap.push(crossing);
                }
            }
            face_on_plane |= on_plane == face.len();
            let clipped = dedup_ring(clipped, eps);
            if clipped.len() >= 3 {
                faces.push(clipped);
            }
        }

        // A face already lying in the cutting plane closes the cut by itself
        if !face_on_plane {
            let cap = dedup_points(cap, eps);
            if cap.len() >= 3 {
                faces.push(order_around(cap, normal));
            }
        }
        self.faces = faces;
        !self.faces.is_empty()
    }

    fn into_cell(self, seed_index: usize, seed: Vec3, eps: f32) -> Cell {
        let mut vertices: Vec<Vec3> = Vec::new();
        let mut faces = Vec::with_capacity(self.faces.len());
        for polygon in self.faces {
            let mut face: Vec<usize> = Vec::with_capacity(polygon.len());
            for p in polygon {
                let index = match vertices.iter().position(|v| v.distance(p) <= eps) {
                    Some(index) => index,
                    None => {
                        vertices.push(p);
                        vertices.len() - 1
                    }
                };
                if face.last() != Some(&index) {
                    face.push(index);
                }
            }
            while face.len() > 1 && face.first() == face.last() {
                face.pop();
            }
            if face.len() >= 3 {
                faces.push(face);
            }
        }
        Cell {
            seed_index,
            seed,
            vertices,
            faces,
        }
    }
}

/// Drop consecutive near-duplicates (including the wrap-around pair)
fn dedup_ring(mut ring: Vec<Vec3>, eps: f32) -> Vec<Vec3> {
    ring.dedup_by(|a, b| a.distance(*b) <= eps);
    while ring.len() > 1 && ring[0].distance(ring[ring.len() - 1]) <= eps {
        ring.pop();
    }
    ring
}

fn dedup_points(points: Vec<Vec3>, eps: f32) -> Vec<Vec3> {
    let mut unique: Vec<Vec3> = Vec::with_capacity(points.len());
    for p in points {
        if !unique.iter().any(|u| u.distance(p) <= eps) {
            unique.push(p);
        }
    }
    unique
}

/// Sort coplanar points counter-clockwise about `normal`
fn order_around(mut points: Vec<Vec3>, normal: Vec3) -> Vec<Vec3> {
    let center = points.iter().copied().sum::<Vec3>() / points.len() as f32;
    let u = normal.any_orthonormal_vector();
    let v = normal.cross(u);
    let angle = |p: &Vec3| {
        let d = *p - center;
        d.dot(v).atan2(d.dot(u))
    };
    points.sort_by(|a, b| angle(a).total_cmp(&angle(b)));
    points
}

/// Voronoi cells of `seeds`, clipped to `bounds`.
///
/// Cells that clip away entirely are omitted. Duplicate or non-finite seeds
/// come back as degenerate cells (no vertices) for the caller to skip; of a
/// group of coincident seeds, the lowest index keeps the region.
pub fn tessellate(seeds: &[Vec3], bounds: &ClipBox) -> Vec<Cell> {
    let eps = (bounds.size().length() * RELATIVE_EPSILON).max(f32::EPSILON);
    let mut cells = Vec::with_capacity(seeds.len());

    for (i, &seed) in seeds.iter().enumerate() {
        if !seed.is_finite() {
            cells.push(Cell::degenerate(i, seed));
            continue;
        }

        let mut neighbours: Vec<(f32, usize)> = seeds
            .iter()
            .enumerate()
            .filter(|&(j, other)| j != i && other.is_finite())
            .map(|(j, other)| (other.distance(seed), j))
            .collect();
        neighbours.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut cell = Polyhedron {
            faces: bounds.faces(),
        };
        let mut alive = true;
        let mut duplicate = false;
        for (distance, j) in neighbours {
            if distance <= eps {
                if j < i {
                    duplicate = true;
                    break;
                }
                continue;
            }
            if distance * 0.5 > cell.max_distance_from(seed) + eps {
                break;
            }
            let other = seeds[j];
            let normal = (other - seed) / distance;
            let offset = normal.dot((seed + other) * 0.5);
            if !cell.clip(normal, offset, eps) {
                alive = false;
                break;
            }
        }

        if duplicate {
            cells.push(Cell::degenerate(i, seed));
        } else if alive {
            cells.push(cell.into_cell(i, seed, eps));
        }
    }
    cells
}
