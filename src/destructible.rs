//! Destructible entities and their registry.
//!
//! An entity is `Alive` until the first impact marks it `Destroyed`; that
//! transition is one-way. The registry owns entities by id and keeps destroyed
//! entries around as tombstones so state queries and the destroyed count stay
//! answerable after the body and node are gone.

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use bevy::prelude::*;
use tracing::debug;

use crate::fracture::ClipBox;
use crate::world::{BodyId, BodyKind, MeshData, PhysicsWorld, SceneGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DestructibleId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestructibleState {
    Alive,
    Destroyed,
}

#[derive(Debug, Clone)]
pub struct DestructibleEntity {
    id: DestructibleId,
    name: String,
    state: DestructibleState,
    node: Option<Entity>,
    body: Option<BodyId>,
    /// Body-local hull points
    hull: Vec<Vec3>,
}

impl DestructibleEntity {
    pub fn new(
        id: DestructibleId,
        name: impl Into<String>,
        node: Entity,
        body: BodyId,
        hull: Vec<Vec3>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            state: DestructibleState::Alive,
            node: Some(node),
            body: Some(body),
            hull,
        }
    }

    pub fn id(&self) -> DestructibleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> DestructibleState {
        self.state
    }

    pub fn is_alive(&self) -> bool {
        self.state == DestructibleState::Alive
    }

    pub fn node(&self) -> Option<Entity> {
        self.node
    }

    pub fn body(&self) -> Option<BodyId> {
        self.body
    }

    pub fn hull(&self) -> &[Vec3] {
        &self.hull
    }

    /// World-space bounds of the hull at the body's current pose.
    /// `None` once the body is gone.
    pub fn world_bounds<P: PhysicsWorld + ?Sized>(&self, physics: &P) -> Option<ClipBox> {
        let (position, rotation) = physics.pose(self.body?)?;
        placed_bounds(&self.hull, position, rotation)
    }

    /// Alive → Destroyed. Returns false (and changes nothing) if already destroyed.
    pub fn mark_destroyed(&mut self) -> bool {
        if self.state == DestructibleState::Destroyed {
            return false;
        }
        self.state = DestructibleState::Destroyed;
        true
    }

    /// Detach the node and remove the body. Safe to call any number of times;
    /// returns true only on the call that released something.
    pub fn cleanup<P, S>(&mut self, physics: &mut P, scene: &mut S) -> bool
    where
        P: PhysicsWorld + ?Sized,
        S: SceneGraph + ?Sized,
    {
        let mut released = false;
        if let Some(node) = self.node.take() {
            released |= scene.detach(node);
        }
        if let Some(body) = self.body.take() {
            released |= physics.remove_body(body);
        }
        if released {
            debug!(name = %self.name, "destructible released");
        }
        released
    }
}

/// Placement and shape of a destructible to spawn
#[derive(Debug, Clone)]
pub struct DestructibleDesc {
    pub name: String,
    /// Body-local points; the collider is their convex hull
    pub points: Vec<Vec3>,
    /// Render mesh, body-local
    pub mesh: Option<MeshData>,
    pub position: Vec3,
    pub rotation: Quat,
    pub tint: Option<Color>,
    pub kind: BodyKind,
    pub mass: f32,
}

impl DestructibleDesc {
    pub fn new(name: impl Into<String>, points: Vec<Vec3>) -> Self {
        Self {
            name: name.into(),
            points,
            mesh: None,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            tint: None,
            kind: BodyKind::Fixed,
            mass: 1.0,
        }
    }

    /// Bottle-shaped hull: a body cylinder topped by a narrower neck
    pub fn bottle(name: impl Into<String>, radius: f32, height: f32) -> Self {
        Self::new(name, bottle_points(radius, height, 12))
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
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

    pub fn dynamic(mut self, mass: f32) -> Self {
        self.kind = BodyKind::Dynamic;
        self.mass = mass;
        self
    }

}

/// Bounds of body-local `points` placed at `position` / `rotation`
pub fn placed_bounds(points: &[Vec3], position: Vec3, rotation: Quat) -> Option<ClipBox> {
    ClipBox::from_points(points.iter().map(|p| position + rotation * *p))
}

/// Rings of points outlining a bottle standing on y = 0
pub fn bottle_points(radius: f32, height: f32, segments: usize) -> Vec<Vec3> {
    let segments = segments.max(3);
    let shoulder = height * 0.6;
    let neck = radius * 0.35;
    let rings = [(0.0, radius), (shoulder, radius), (height * 0.75, neck), (height, neck)];

    let mut points = Vec::with_capacity(rings.len() * segments);
    for (y, r) in rings {
        for i in 0..segments {
            let angle = TAU * i as f32 / segments as f32;
            points.push(Vec3::new(r * angle.cos(), y, r * angle.sin()));
        }
    }
    points
}

/// Owns every destructible by id, destroyed ones included
#[derive(Debug, Default)]
pub struct DestructibleRegistry {
    entities: BTreeMap<DestructibleId, DestructibleEntity>,
    next_id: u64,
}

impl DestructibleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        node: Entity,
        body: BodyId,
        hull: Vec<Vec3>,
    ) -> DestructibleId {
        let id = DestructibleId(self.next_id);
        self.next_id += 1;
        self.entities
            .insert(id, DestructibleEntity::new(id, name, node, body, hull));
        id
    }

    pub fn get(&self, id: DestructibleId) -> Option<&DestructibleEntity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: DestructibleId) -> Option<&mut DestructibleEntity> {
        self.entities.get_mut(&id)
    }

    pub fn state(&self, id: DestructibleId) -> Option<DestructibleState> {
        self.get(id).map(DestructibleEntity::state)
    }

    /// See [`DestructibleEntity::mark_destroyed`]; false for unknown ids too
    pub fn mark_destroyed(&mut self, id: DestructibleId) -> bool {
        self.get_mut(id).is_some_and(DestructibleEntity::mark_destroyed)
    }

    pub fn cleanup<P, S>(&mut self, id: DestructibleId, physics: &mut P, scene: &mut S) -> bool
    where
        P: PhysicsWorld + ?Sized,
        S: SceneGraph + ?Sized,
    {
        self.get_mut(id)
            .is_some_and(|entity| entity.cleanup(physics, scene))
    }

    /// Release and forget an entity without destroying it (level reset)
    pub fn remove<P, S>(
        &mut self,
        id: DestructibleId,
        physics: &mut P,
        scene: &mut S,
    ) -> Option<DestructibleEntity>
    where
        P: PhysicsWorld + ?Sized,
        S: SceneGraph + ?Sized,
    {
        let mut entity = self.entities.remove(&id)?;
        entity.cleanup(physics, scene);
        Some(entity)
    }

    /// Release and forget everything. Returns how many entries were dropped.
    pub fn clear<P, S>(&mut self, physics: &mut P, scene: &mut S) -> usize
    where
        P: PhysicsWorld + ?Sized,
        S: SceneGraph + ?Sized,
    {
        let count = self.entities.len();
        for (_, mut entity) in std::mem::take(&mut self.entities) {
            entity.cleanup(physics, scene);
        }
        count
    }

    pub fn alive(&self) -> impl Iterator<Item = &DestructibleEntity> {
        self.entities.values().filter(|e| e.is_alive())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DestructibleEntity> {
        self.entities.values()
    }

    pub fn total_count(&self) -> usize {
        self.entities.len()
    }

    pub fn destroyed_count(&self) -> usize {
        self.entities.values().filter(|e| !e.is_alive()).count()
    }

    pub fn alive_count(&self) -> usize {
        self.total_count() - self.destroyed_count()
    }
}
