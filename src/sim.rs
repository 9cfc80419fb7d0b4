//! The shatter simulation.
//!
//! `ShatterSim` owns the physics world, the destructible registry, the impact
//! detector and the RNG; the scene graph is lent to each call. One `step`
//! advances physics, probes every pellet and runs any resulting fracture to
//! completion before returning.

use bevy::prelude::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{debug, info};

use crate::config::{ConfigError, ShatterConfig};
use crate::destructible::{DestructibleDesc, DestructibleId, DestructibleRegistry, DestructibleState};
use crate::fracture::{self, Fragment, FractureRequest};
use crate::impact::{HitTarget, ImpactDetector, ImpactEvent, Probe, ProjectileId};
use crate::world::{
    BodyDesc, BodyId, BodyKind, ColliderShape, PhysicsWorld, RapierWorld, SceneGraph, SceneNode,
};

/// Everything one fracture did
#[derive(Debug, Clone)]
pub struct FractureReport {
    pub impact: ImpactEvent,
    pub seeds: usize,
    pub cells: usize,
    pub skipped: usize,
    pub fragments: Vec<Fragment>,
}

pub struct ShatterSim<P: PhysicsWorld = RapierWorld> {
    config: ShatterConfig,
    physics: P,
    registry: DestructibleRegistry,
    detector: ImpactDetector,
    rng: Xoshiro256PlusPlus,
    /// (body, node) of every spawned fragment
    fragment_links: Vec<(BodyId, Entity)>,
    elapsed: f32,
    last_shot: Option<f32>,
}

impl ShatterSim<RapierWorld> {
    /// Simulation over a fresh rapier world using the configured gravity
    pub fn with_rapier(config: ShatterConfig) -> Result<Self, ConfigError> {
        let physics = RapierWorld::new(config.gravity);
        Self::new(config, physics)
    }
}

impl<P: PhysicsWorld> ShatterSim<P> {
    pub fn new(config: ShatterConfig, physics: P) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = match config.rng_seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::seed_from_u64(rand::random()),
        };
        let detector = ImpactDetector::new(config.projectiles.max_travel, config.projectiles.radius);
        Ok(Self {
            config,
            physics,
            registry: DestructibleRegistry::new(),
            detector,
            rng,
            fragment_links: Vec::new(),
            elapsed: 0.0,
            last_shot: None,
        })
    }

    pub fn config(&self) -> &ShatterConfig {
        &self.config
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    pub fn registry(&self) -> &DestructibleRegistry {
        &self.registry
    }

    pub fn detector(&self) -> &ImpactDetector {
        &self.detector
    }

    /// Seconds simulated so far
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Add a destructible body and its node. `None` if the hull is degenerate.
    pub fn spawn_destructible<S>(&mut self, scene: &mut S, desc: &DestructibleDesc) -> Option<DestructibleId>
    where
        S: SceneGraph + ?Sized,
    {
        let body_desc = BodyDesc::new(desc.kind, ColliderShape::ConvexHull(desc.points.clone()))
            .at(desc.position)
            .with_rotation(desc.rotation)
            .with_mass(desc.mass);
        let Some(body) = self.physics.add_body(&body_desc) else {
            debug!(name = %desc.name, "destructible hull rejected");
            return None;
        };

        let mut node = SceneNode::new(desc.name.clone())
            .with_transform(Transform::from_translation(desc.position).with_rotation(desc.rotation));
        if let Some(tint) = desc.tint {
            node = node.with_tint(tint);
        }
        if let Some(mesh) = &desc.mesh {
            node = node.with_mesh(mesh.clone());
        }
        if desc.kind == BodyKind::Dynamic {
            node = node.following(body);
        }
        let node = scene.attach(node);

        let id = self.registry.insert(desc.name.clone(), node, body, desc.points.clone());
        self.detector.register_target(body, id);
        debug!(name = %desc.name, id = id.0, "destructible spawned");
        Some(id)
    }

    /// Static scenery: blocks pellets, never fractures
    pub fn add_scenery(&mut self, desc: &BodyDesc) -> Option<BodyId> {
        self.physics.add_body(desc)
    }

    /// Launch a pellet. `None` while the launcher cools down or for a zero direction.
    pub fn fire<S>(&mut self, scene: &mut S, origin: Vec3, direction: Vec3) -> Option<ProjectileId>
    where
        S: SceneGraph + ?Sized,
    {
        let direction = direction.try_normalize()?;
        let projectiles = &self.config.projectiles;
        if let Some(last) = self.last_shot {
            if self.elapsed - last < projectiles.fire_cooldown {
                return None;
            }
        }

        let body = self.physics.add_body(
            &BodyDesc::dynamic(ColliderShape::Ball(projectiles.radius))
                .at(origin)
                .with_mass(projectiles.mass)
                .with_velocity(direction * projectiles.speed)
                .with_ccd(true),
        )?;
        let node = scene.attach(
            SceneNode::new("pellet")
                .with_transform(Transform::from_translation(origin))
                .following(body),
        );
        self.last_shot = Some(self.elapsed);
        let id = self.detector.track(body, Some(node), origin);
        debug!(id = id.0, ?origin, ?direction, "pellet fired");
        Some(id)
    }

    /// Advance physics by `dt`, then probe each pellet in launch order
    pub fn step<S>(&mut self, scene: &mut S, dt: f32) -> Vec<FractureReport>
    where
        S: SceneGraph + ?Sized,
    {
        self.elapsed += dt.max(0.0);
        self.physics.step(dt);
        self.prune_fragments(scene);

        let mut reports = Vec::new();
        for id in self.detector.projectile_ids() {
            match self.detector.probe(id, &self.physics, dt) {
                Probe::Clear => {}
                Probe::Lost | Probe::OutOfRange => {
                    self.detector.release(id, &mut self.physics, scene);
                }
                Probe::Hit { hit, direction } => match self.detector.resolve(hit.body) {
                    HitTarget::Projectile(_) => {}
                    HitTarget::Scenery => {
                        self.detector.release(id, &mut self.physics, scene);
                    }
                    HitTarget::Destructible(target) => {
                        self.detector.release(id, &mut self.physics, scene);
                        if let Some(report) =
                            self.impact(scene, target, hit.point, Some(hit.normal), Some(direction))
                        {
                            reports.push(report);
                        }
                    }
                },
            }
        }
        reports
    }

    /// Destroy `target` and shatter it around `point`.
    ///
    /// Returns `None` without side effects if the target is unknown or already destroyed.
    pub fn impact<S>(
        &mut self,
        scene: &mut S,
        target: DestructibleId,
        point: Vec3,
        normal: Option<Vec3>,
        direction: Option<Vec3>,
    ) -> Option<FractureReport>
    where
        S: SceneGraph + ?Sized,
    {
        let entity = self.registry.get_mut(target)?;
        if !entity.mark_destroyed() {
            debug!(id = target.0, "impact on destroyed entity ignored");
            return None;
        }
        // Current pose, not the spawn pose
        let bounds = entity.world_bounds(&self.physics);
        let (body, node) = (entity.body(), entity.node());
        if let Some(body) = body {
            self.detector.forget_target(body);
        }

        let event = ImpactEvent {
            target,
            point,
            normal,
            direction,
        };
        let request = FractureRequest {
            impact_point: point,
            source_tint: node.and_then(|node| scene.tint(node)),
            source_bounds: bounds,
        };
        // The source body goes first so fragments never spawn inside it
        self.registry.cleanup(target, &mut self.physics, scene);
        let outcome = fracture::shatter(&request, &self.config, &mut self.rng, &mut self.physics, scene);
        self.fragment_links
            .extend(outcome.fragments.iter().map(|f| (f.body, f.node)));

        info!(
            id = target.0,
            fragments = outcome.fragments.len(),
            destroyed = self.registry.destroyed_count(),
            total = self.registry.total_count(),
            "destructible shattered"
        );
        Some(FractureReport {
            impact: event,
            seeds: outcome.seeds,
            cells: outcome.cells,
            skipped: outcome.skipped,
            fragments: outcome.fragments,
        })
    }

    /// Instant ray from `origin`; shatters the first destructible within `max_distance`
    pub fn hitscan<S>(
        &mut self,
        scene: &mut S,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<FractureReport>
    where
        S: SceneGraph + ?Sized,
    {
        let direction = direction.try_normalize()?;
        let hit = self
            .physics
            .cast_segment(origin, origin + direction * max_distance, None)?;
        match self.detector.resolve(hit.body) {
            HitTarget::Destructible(target) => {
                self.impact(scene, target, hit.point, Some(hit.normal), Some(direction))
            }
            _ => None,
        }
    }

    /// Forget fragments whose body is gone and detach their nodes. Returns how many were dropped.
    pub fn prune_fragments<S>(&mut self, scene: &mut S) -> usize
    where
        S: SceneGraph + ?Sized,
    {
        let before = self.fragment_links.len();
        let physics = &self.physics;
        self.fragment_links.retain(|(body, node)| {
            let live = physics.contains(*body);
            if !live {
                scene.detach(*node);
            }
            live
        });
        let pruned = before - self.fragment_links.len();
        if pruned > 0 {
            debug!(pruned, "fragments without bodies dropped");
        }
        pruned
    }

    /// Release a destructible without shattering it
    pub fn remove_destructible<S>(&mut self, scene: &mut S, id: DestructibleId) -> bool
    where
        S: SceneGraph + ?Sized,
    {
        let Some(entity) = self.registry.remove(id, &mut self.physics, scene) else {
            return false;
        };
        if let Some(body) = entity.body() {
            self.detector.forget_target(body);
        }
        true
    }

    /// Drop every destructible, fragment and pellet. Returns how many destructibles were dropped.
    pub fn clear<S>(&mut self, scene: &mut S) -> usize
    where
        S: SceneGraph + ?Sized,
    {
        let ids: Vec<DestructibleId> = self.registry.iter().map(|e| e.id()).collect();
        for &id in &ids {
            self.remove_destructible(scene, id);
        }
        for (body, node) in self.fragment_links.drain(..) {
            self.physics.remove_body(body);
            scene.detach(node);
        }
        for id in self.detector.projectile_ids() {
            self.detector.release(id, &mut self.physics, scene);
        }
        ids.len()
    }

    pub fn state(&self, id: DestructibleId) -> Option<DestructibleState> {
        self.registry.state(id)
    }

    pub fn is_alive(&self, id: DestructibleId) -> bool {
        self.state(id) == Some(DestructibleState::Alive)
    }

    pub fn destroyed_count(&self) -> usize {
        self.registry.destroyed_count()
    }

    pub fn total_count(&self) -> usize {
        self.registry.total_count()
    }

    pub fn active_projectiles(&self) -> usize {
        self.detector.active_count()
    }

    pub fn fragment_count(&self) -> usize {
        self.fragment_links.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> ShatterConfig {
        ShatterConfig {
            rng_seed: Some(3),
            ..ShatterConfig::default()
        }
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut config = ShatterConfig::default();
        config.fracture.points = 0;
        assert!(matches!(
            ShatterSim::with_rapier(config),
            Err(ConfigError::ZeroFracturePoints)
        ));
    }

    #[test]
    fn test_fire_cooldown() {
        let mut sim = ShatterSim::with_rapier(seeded()).unwrap();
        let mut scene = World::new();
        assert!(sim.fire(&mut scene, Vec3::ZERO, Vec3::Z).is_some());
        assert!(sim.fire(&mut scene, Vec3::ZERO, Vec3::Z).is_none());
        sim.step(&mut scene, 0.25);
        assert!(sim.fire(&mut scene, Vec3::ZERO, Vec3::Z).is_some());
        assert!(sim.fire(&mut scene, Vec3::ZERO, Vec3::ZERO).is_none());
    }

    #[test]
    fn test_direct_impact_then_repeat_is_noop() {
        let mut sim = ShatterSim::with_rapier(seeded()).unwrap();
        let mut scene = World::new();
        let id = sim
            .spawn_destructible(&mut scene, &DestructibleDesc::bottle("b", 0.1, 0.4))
            .unwrap();

        let report = sim.impact(&mut scene, id, Vec3::new(0.0, 0.2, 0.0), None, None).unwrap();
        assert!(!report.fragments.is_empty());
        assert_eq!(sim.state(id), Some(DestructibleState::Destroyed));
        let fragments = sim.fragment_count();

        assert!(sim.impact(&mut scene, id, Vec3::ZERO, None, None).is_none());
        assert_eq!(sim.fragment_count(), fragments);
        assert_eq!(sim.destroyed_count(), 1);
    }

    #[test]
    fn test_step_prunes_fragments_without_bodies() {
        let mut sim = ShatterSim::with_rapier(seeded()).unwrap();
        let mut scene = World::new();
        let id = sim
            .spawn_destructible(&mut scene, &DestructibleDesc::bottle("b", 0.1, 0.4))
            .unwrap();
        let report = sim.impact(&mut scene, id, Vec3::new(0.0, 0.2, 0.0), None, None).unwrap();
        let count = report.fragments.len();
        assert!(count > 0);
        let gone = &report.fragments[0];

        assert!(sim.physics_mut().remove_body(gone.body));
        sim.step(&mut scene, 1.0 / 60.0);
        assert_eq!(sim.fragment_count(), count - 1);
        assert!(!scene.contains(gone.node));
        for kept in &report.fragments[1..] {
            assert!(scene.contains(kept.node));
        }
        assert_eq!(sim.prune_fragments(&mut scene), 0);
    }

    #[test]
    fn test_clear_removes_all_bodies() {
        let mut sim = ShatterSim::with_rapier(seeded()).unwrap();
        let mut scene = World::new();
        let id = sim
            .spawn_destructible(&mut scene, &DestructibleDesc::bottle("b", 0.1, 0.4))
            .unwrap();
        sim.spawn_destructible(&mut scene, &DestructibleDesc::bottle("c", 0.1, 0.4).at(Vec3::X))
            .unwrap();
        sim.impact(&mut scene, id, Vec3::new(0.0, 0.2, 0.0), None, None);
        sim.fire(&mut scene, Vec3::new(0.0, 0.0, -5.0), Vec3::Y);
        assert_eq!(sim.clear(&mut scene), 2);
        assert_eq!(sim.physics().body_count(), 0);
        assert_eq!(sim.total_count(), 0);
        assert_eq!(sim.fragment_count(), 0);
        assert_eq!(sim.active_projectiles(), 0);
    }
}
