//! Engine seams: the rigid-body world and the scene graph.
//!
//! The fracture core never reaches for a global engine instance. Everything
//! it touches is one of these two collaborators, handed in by the caller:
//!
//! ```text
//! PhysicsWorld  add/remove body, segment query, step     (RapierWorld)
//! SceneGraph    attach/detach node, transform, tint      (bevy::World)
//! ```

pub mod rapier;
pub mod scene;

use bevy::prelude::*;

pub use rapier::RapierWorld;
pub use scene::{BodyLink, NodeMesh, NodeTint, SceneNodeMarker};

// ============================================================================
// Physics
// ============================================================================

/// Opaque rigid-body identifier, stable for the lifetime of the body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Dynamic,
    Fixed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    /// Convex envelope of the points, in body-local space
    ConvexHull(Vec<Vec3>),
    Ball(f32),
    Cuboid(Vec3),
}

/// Everything needed to insert one rigid body with a single collider
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub shape: ColliderShape,
    pub position: Vec3,
    pub rotation: Quat,
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    pub linear_velocity: Vec3,
    /// Central impulse applied on insertion
    pub impulse: Vec3,
    pub ccd: bool,
}

impl BodyDesc {
    pub fn new(kind: BodyKind, shape: ColliderShape) -> Self {
        Self {
            kind,
            shape,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            mass: 1.0,
            friction: 0.5,
            restitution: 0.0,
            linear_velocity: Vec3::ZERO,
            impulse: Vec3::ZERO,
            ccd: false,
        }
    }

    pub fn fixed(shape: ColliderShape) -> Self {
        Self::new(BodyKind::Fixed, shape)
    }

    pub fn dynamic(shape: ColliderShape) -> Self {
        Self::new(BodyKind::Dynamic, shape)
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_material(mut self, friction: f32, restitution: f32) -> Self {
        self.friction = friction;
        self.restitution = restitution;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.linear_velocity = velocity;
        self
    }

    pub fn with_impulse(mut self, impulse: Vec3) -> Self {
        self.impulse = impulse;
        self
    }

    pub fn with_ccd(mut self, ccd: bool) -> Self {
        self.ccd = ccd;
        self
    }
}

/// Nearest surface struck by a segment query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    pub body: BodyId,
    pub point: Vec3,
    pub normal: Vec3,
    /// Distance from the segment start
    pub distance: f32,
}

/// The rigid-body world the fracture core spawns into and queries
pub trait PhysicsWorld {
    /// Insert a body. `None` when the shape cannot be built (e.g. a flat hull).
    fn add_body(&mut self, desc: &BodyDesc) -> Option<BodyId>;

    /// Remove a body and its collider. Returns false if it was already gone.
    fn remove_body(&mut self, body: BodyId) -> bool;

    fn contains(&self, body: BodyId) -> bool;

    fn body_count(&self) -> usize;

    fn pose(&self, body: BodyId) -> Option<(Vec3, Quat)>;

    fn linear_velocity(&self, body: BodyId) -> Option<Vec3>;

    /// First surface between `from` and `to`, ignoring `exclude`
    fn cast_segment(&self, from: Vec3, to: Vec3, exclude: Option<BodyId>) -> Option<SegmentHit>;

    /// Advance the simulation by `dt` seconds
    fn step(&mut self, dt: f32);
}

// ============================================================================
// Scene
// ============================================================================

/// Triangle soup for one renderable node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// A node to attach to the scene graph
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub tint: Option<Color>,
    pub mesh: Option<MeshData>,
    /// Body whose pose this node follows
    pub body: Option<BodyId>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            tint: None,
            mesh: None,
            body: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = Some(tint);
        self
    }

    pub fn with_mesh(mut self, mesh: MeshData) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn following(mut self, body: BodyId) -> Self {
        self.body = Some(body);
        self
    }
}

/// The scene graph visual nodes are attached to
pub trait SceneGraph {
    fn attach(&mut self, node: SceneNode) -> Entity;

    /// Remove a node. Returns false if it was already gone.
    fn detach(&mut self, node: Entity) -> bool;

    fn contains(&self, node: Entity) -> bool;

    fn set_transform(&mut self, node: Entity, transform: Transform) -> bool;

    fn set_tint(&mut self, node: Entity, tint: Color) -> bool;

    fn tint(&self, node: Entity) -> Option<Color>;
}
