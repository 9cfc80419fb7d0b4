//! Impact detection.
//!
//! The detector maps rigid bodies to the things they stand for: destructibles
//! registered on spawn, and projectiles tracked while in flight. Anything else
//! the physics world reports is scenery. Each step a projectile probes the
//! segment it is about to sweep; the first surface on it decides its fate.

use std::collections::{BTreeMap, HashMap};

use bevy::prelude::*;
use tracing::{debug, trace};

use crate::destructible::DestructibleId;
use crate::world::{BodyId, PhysicsWorld, SceneGraph, SegmentHit};

/// Speeds below this don't probe; the pellet is resting
const MIN_PROBE_SPEED: f32 = 1.0e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: ProjectileId,
    pub body: BodyId,
    pub node: Option<Entity>,
    /// Launch position; travel is measured from here
    pub origin: Vec3,
}

/// Raised once per destroyed entity, after its fracture has run
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ImpactEvent {
    pub target: DestructibleId,
    pub point: Vec3,
    pub normal: Option<Vec3>,
    pub direction: Option<Vec3>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Destructible(DestructibleId),
    Projectile(ProjectileId),
    Scenery,
}

/// Result of probing one projectile for this step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Probe {
    /// Nothing on the swept segment
    Clear,
    Hit { hit: SegmentHit, direction: Vec3 },
    /// Past the maximum travel distance
    OutOfRange,
    /// Untracked id, or the body left the physics world
    Lost,
}

#[derive(Debug, Default)]
pub struct ImpactDetector {
    targets: HashMap<BodyId, DestructibleId>,
    projectiles: BTreeMap<ProjectileId, Projectile>,
    projectile_bodies: HashMap<BodyId, ProjectileId>,
    next_projectile: u64,
    max_travel: f32,
    /// Added to the swept length so a pellet's leading edge is covered
    probe_padding: f32,
}

impl ImpactDetector {
    pub fn new(max_travel: f32, probe_padding: f32) -> Self {
        Self {
            max_travel,
            probe_padding,
            ..Default::default()
        }
    }

    pub fn register_target(&mut self, body: BodyId, target: DestructibleId) {
        self.targets.insert(body, target);
    }

    /// Stop resolving `body` to a destructible
    pub fn forget_target(&mut self, body: BodyId) -> Option<DestructibleId> {
        self.targets.remove(&body)
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn resolve(&self, body: BodyId) -> HitTarget {
        if let Some(&target) = self.targets.get(&body) {
            HitTarget::Destructible(target)
        } else if let Some(&projectile) = self.projectile_bodies.get(&body) {
            HitTarget::Projectile(projectile)
        } else {
            HitTarget::Scenery
        }
    }

    pub fn track(&mut self, body: BodyId, node: Option<Entity>, origin: Vec3) -> ProjectileId {
        let id = ProjectileId(self.next_projectile);
        self.next_projectile += 1;
        self.projectiles.insert(
            id,
            Projectile {
                id,
                body,
                node,
                origin,
            },
        );
        self.projectile_bodies.insert(body, id);
        id
    }

    pub fn untrack(&mut self, id: ProjectileId) -> Option<Projectile> {
        let projectile = self.projectiles.remove(&id)?;
        self.projectile_bodies.remove(&projectile.body);
        Some(projectile)
    }

    /// Untrack and remove the projectile's body and node
    pub fn release<P, S>(&mut self, id: ProjectileId, physics: &mut P, scene: &mut S) -> bool
    where
        P: PhysicsWorld + ?Sized,
        S: SceneGraph + ?Sized,
    {
        let Some(projectile) = self.untrack(id) else {
            return false;
        };
        physics.remove_body(projectile.body);
        if let Some(node) = projectile.node {
            scene.detach(node);
        }
        trace!(id = id.0, "projectile released");
        true
    }

    pub fn projectile(&self, id: ProjectileId) -> Option<&Projectile> {
        self.projectiles.get(&id)
    }

    /// Ids in launch order
    pub fn projectile_ids(&self) -> Vec<ProjectileId> {
        self.projectiles.keys().copied().collect()
    }

    pub fn projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.values()
    }

    pub fn active_count(&self) -> usize {
        self.projectiles.len()
    }

    /// Sweep the segment the projectile covers over `dt` at its current velocity
    pub fn probe<P>(&self, id: ProjectileId, physics: &P, dt: f32) -> Probe
    where
        P: PhysicsWorld + ?Sized,
    {
        let Some(projectile) = self.projectiles.get(&id) else {
            return Probe::Lost;
        };
        let Some((position, _)) = physics.pose(projectile.body) else {
            return Probe::Lost;
        };
        if position.distance(projectile.origin) > self.max_travel {
            debug!(id = id.0, "projectile out of range");
            return Probe::OutOfRange;
        }

        let velocity = physics.linear_velocity(projectile.body).unwrap_or(Vec3::ZERO);
        let speed = velocity.length();
        if speed < MIN_PROBE_SPEED {
            return Probe::Clear;
        }
        let direction = velocity / speed;
        let reach = speed * dt.max(0.0) + self.probe_padding;
        match physics.cast_segment(position, position + direction * reach, Some(projectile.body)) {
            Some(hit) => Probe::Hit { hit, direction },
            None => Probe::Clear,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{BodyDesc, ColliderShape, RapierWorld, SceneNode};

    fn pellet(physics: &mut RapierWorld, at: Vec3, velocity: Vec3) -> BodyId {
        physics
            .add_body(
                &BodyDesc::dynamic(ColliderShape::Ball(0.1))
                    .at(at)
                    .with_velocity(velocity)
                    .with_ccd(true),
            )
            .unwrap()
    }

    #[test]
    fn test_resolve_kinds() {
        let mut detector = ImpactDetector::new(200.0, 0.1);
        detector.register_target(BodyId(1), DestructibleId(7));
        let projectile = detector.track(BodyId(2), None, Vec3::ZERO);

        assert_eq!(detector.resolve(BodyId(1)), HitTarget::Destructible(DestructibleId(7)));
        assert_eq!(detector.resolve(BodyId(2)), HitTarget::Projectile(projectile));
        assert_eq!(detector.resolve(BodyId(3)), HitTarget::Scenery);

        assert_eq!(detector.forget_target(BodyId(1)), Some(DestructibleId(7)));
        assert_eq!(detector.resolve(BodyId(1)), HitTarget::Scenery);
    }

    #[test]
    fn test_probe_hits_wall_ahead() {
        let mut physics = RapierWorld::default();
        let wall = physics
            .add_body(&BodyDesc::fixed(ColliderShape::Cuboid(Vec3::new(0.1, 2.0, 2.0))).at(Vec3::X * 1.0))
            .unwrap();
        let body = pellet(&mut physics, Vec3::ZERO, Vec3::X * 50.0);
        physics.step(0.0);

        let mut detector = ImpactDetector::new(200.0, 0.1);
        let id = detector.track(body, None, Vec3::ZERO);
        match detector.probe(id, &physics, 1.0 / 60.0) {
            Probe::Hit { hit, direction } => {
                assert_eq!(hit.body, wall);
                assert!((hit.point.x - 0.9).abs() < 1.0e-3);
                assert!((direction - Vec3::X).length() < 1.0e-5);
            }
            other => panic!("expected hit, got {other:?}"),
        }
    }

    #[test]
    fn test_probe_clear_and_out_of_range() {
        let mut physics = RapierWorld::new(Vec3::ZERO);
        let body = pellet(&mut physics, Vec3::new(0.0, 0.0, 10.0), Vec3::Z);
        physics.step(0.0);

        let mut near = ImpactDetector::new(200.0, 0.1);
        let id = near.track(body, None, Vec3::ZERO);
        assert_eq!(near.probe(id, &physics, 1.0 / 60.0), Probe::Clear);

        let mut far = ImpactDetector::new(5.0, 0.1);
        let id = far.track(body, None, Vec3::ZERO);
        assert_eq!(far.probe(id, &physics, 1.0 / 60.0), Probe::OutOfRange);
    }

    #[test]
    fn test_release_removes_body_and_node() {
        let mut physics = RapierWorld::default();
        let mut scene = World::new();
        let body = pellet(&mut physics, Vec3::ZERO, Vec3::X);
        let node = scene.attach(SceneNode::new("pellet").following(body));

        let mut detector = ImpactDetector::new(200.0, 0.1);
        let id = detector.track(body, Some(node), Vec3::ZERO);
        assert!(detector.release(id, &mut physics, &mut scene));
        assert!(!physics.contains(body));
        assert!(!scene.contains(node));
        assert_eq!(detector.active_count(), 0);
        assert_eq!(detector.resolve(body), HitTarget::Scenery);
        assert!(!detector.release(id, &mut physics, &mut scene));
        assert_eq!(detector.probe(id, &physics, 0.1), Probe::Lost);
    }
}
