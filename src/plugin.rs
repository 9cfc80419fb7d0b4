use bevy::prelude::*;
use tracing::error;

use crate::config::{ConfigError, ShatterConfig};
use crate::destructible::{DestructibleDesc, DestructibleId};
use crate::impact::ImpactEvent;
use crate::sim::ShatterSim;
use crate::world::scene::sync_linked_transforms;
use crate::world::{BodyDesc, BodyId};

/// Runs the shatter simulation on the fixed timestep, with the app's `World` as scene graph
pub struct ShatterPlugin {
    config: ShatterConfig,
}

impl ShatterPlugin {
    pub fn new(config: ShatterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl Default for ShatterPlugin {
    fn default() -> Self {
        Self {
            config: ShatterConfig::default(),
        }
    }
}

impl Plugin for ShatterPlugin {
    fn build(&self, app: &mut App) {
        let sim = match ShatterSim::with_rapier(self.config.clone()) {
            Ok(sim) => sim,
            Err(err) => {
                error!(%err, "shatter config rejected, plugin not installed");
                return;
            }
        };

        app.insert_resource(Time::<Fixed>::from_seconds(f64::from(self.config.fixed_timestep)))
            .insert_resource(ShatterResource(sim))
            .init_resource::<ShatterStats>()
            .add_event::<ImpactEvent>()
            .add_event::<FireRequest>()
            .add_event::<HitscanRequest>()
            .add_systems(FixedUpdate, shatter_step_system);
    }
}

#[derive(Resource)]
pub struct ShatterResource(pub ShatterSim);

/// HUD counters, refreshed every fixed step
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShatterStats {
    pub total: usize,
    pub destroyed: usize,
    pub fragments: usize,
    pub projectiles: usize,
}

/// Launch a pellet on the next fixed step
#[derive(Event, Debug, Clone, Copy)]
pub struct FireRequest {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Instant break ray; `max_distance` defaults to the configured hitscan range
#[derive(Event, Debug, Clone, Copy)]
pub struct HitscanRequest {
    pub origin: Vec3,
    pub direction: Vec3,
    pub max_distance: Option<f32>,
}

/// Spawn a destructible into an app running [`ShatterPlugin`]
pub fn spawn_destructible(world: &mut World, desc: &DestructibleDesc) -> Option<DestructibleId> {
    if !world.contains_resource::<ShatterResource>() {
        return None;
    }
    world.resource_scope(|world, mut shatter: Mut<ShatterResource>| {
        shatter.0.spawn_destructible(world, desc)
    })
}

pub fn add_scenery(world: &mut World, desc: &BodyDesc) -> Option<BodyId> {
    world
        .get_resource_mut::<ShatterResource>()
        .and_then(|mut shatter| shatter.0.add_scenery(desc))
}

fn drain_events<E: Event>(world: &mut World) -> Vec<E> {
    world
        .get_resource_mut::<Events<E>>()
        .map(|mut events| events.drain().collect())
        .unwrap_or_default()
}

fn shatter_step_system(world: &mut World) {
    let fires = drain_events::<FireRequest>(world);
    let scans = drain_events::<HitscanRequest>(world);
    if !world.contains_resource::<ShatterResource>() {
        return;
    }

    world.resource_scope(|world, mut shatter: Mut<ShatterResource>| {
        let sim = &mut shatter.0;
        let dt = world
            .get_resource::<Time>()
            .map(|time| time.delta_secs())
            .filter(|dt| *dt > 0.0)
            .unwrap_or(sim.config().fixed_timestep);

        let mut reports = Vec::new();
        for fire in fires {
            sim.fire(world, fire.origin, fire.direction);
        }
        for scan in scans {
            let range = scan
                .max_distance
                .unwrap_or(sim.config().projectiles.hitscan_range);
            reports.extend(sim.hitscan(world, scan.origin, scan.direction, range));
        }
        reports.extend(sim.step(world, dt));
        sync_linked_transforms(world, sim.physics());

        for report in &reports {
            world.send_event(report.impact);
        }
        if let Some(mut stats) = world.get_resource_mut::<ShatterStats>() {
            *stats = ShatterStats {
                total: sim.total_count(),
                destroyed: sim.destroyed_count(),
                fragments: sim.fragment_count(),
                projectiles: sim.active_projectiles(),
            };
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    use crate::world::{ColliderShape, PhysicsWorld};

    fn test_app() -> App {
        let config = ShatterConfig {
            rng_seed: Some(17),
            ..ShatterConfig::default()
        };
        let mut app = App::new();
        app.add_plugins(ShatterPlugin::new(config).unwrap());
        app
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ShatterConfig::default();
        config.fragments.mass = -1.0;
        assert!(ShatterPlugin::new(config).is_err());
    }

    #[test]
    fn test_hitscan_request_shatters_and_reports() {
        let mut app = test_app();
        let world = app.world_mut();
        let id = spawn_destructible(world, &DestructibleDesc::bottle("bottle", 0.1, 0.4).at(Vec3::Z * 3.0))
            .unwrap();
        world.send_event(HitscanRequest {
            origin: Vec3::new(0.0, 0.2, 0.0),
            direction: Vec3::Z,
            max_distance: None,
        });
        world.run_system_once(shatter_step_system).unwrap();

        let stats = *world.resource::<ShatterStats>();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.destroyed, 1);
        assert!(stats.fragments > 0);
        assert_eq!(world.resource::<Events<ImpactEvent>>().len(), 1);
        assert!(!world.resource::<ShatterResource>().0.is_alive(id));
    }

    #[test]
    fn test_helpers_without_plugin_do_nothing() {
        let mut world = World::new();
        let desc = DestructibleDesc::bottle("bottle", 0.1, 0.4);
        assert!(spawn_destructible(&mut world, &desc).is_none());
        assert!(add_scenery(&mut world, &BodyDesc::fixed(ColliderShape::Ball(1.0))).is_none());
        world.run_system_once(shatter_step_system).unwrap();
        assert!(world.get_resource::<ShatterStats>().is_none());
    }

    #[test]
    fn test_scenery_helper_adds_body() {
        let mut app = test_app();
        let world = app.world_mut();
        let body = add_scenery(world, &BodyDesc::fixed(ColliderShape::Ball(1.0))).unwrap();
        assert!(world.resource::<ShatterResource>().0.physics().contains(body));
    }

    #[test]
    fn test_fire_request_tracks_pellet() {
        let mut app = test_app();
        let world = app.world_mut();
        world.send_event(FireRequest {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
        });
        world.run_system_once(shatter_step_system).unwrap();
        assert_eq!(world.resource::<ShatterStats>().projectiles, 1);
    }
}
