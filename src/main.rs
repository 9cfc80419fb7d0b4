//! Headless shooting range: a row of bottles on a shelf, one pellet at a time
//! until every bottle is broken.
//!
//! `SHATTER_CONFIG` may point at a RON config file; `RUST_LOG` overrides the log filter.

use std::time::Duration;

use anyhow::Context;
use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use tracing::{info, warn};

use shatter_core::constants::BOTTLE_PALETTE;
use shatter_core::destructible::{DestructibleDesc, DestructibleId};
use shatter_core::impact::ImpactEvent;
use shatter_core::logging::LoggingPlugin;
use shatter_core::plugin::{self, FireRequest, ShatterResource, ShatterStats};
use shatter_core::world::{BodyDesc, ColliderShape};
use shatter_core::{ShatterConfig, ShatterPlugin};

/// Where the shooter stands
const MUZZLE: Vec3 = Vec3::new(0.0, 1.2, 0.0);
const SHELF_DISTANCE: f32 = 6.0;
const SHELF_HEIGHT: f32 = 1.0;
const BOTTLE_SPACING: f32 = 0.5;
const BOTTLE_RADIUS: f32 = 0.08;
const BOTTLE_HEIGHT: f32 = 0.35;
/// Give up after this long
const TIME_LIMIT_SECS: f32 = 30.0;

#[derive(Resource, Default)]
struct Range {
    bottles: Vec<(DestructibleId, Vec3)>,
}

fn main() -> anyhow::Result<()> {
    let config = match std::env::var("SHATTER_CONFIG") {
        Ok(path) => ShatterConfig::load(&path).with_context(|| format!("loading {path}"))?,
        Err(_) => ShatterConfig::default(),
    };
    let tick = Duration::from_secs_f32(config.fixed_timestep);
    let logging = LoggingPlugin::new(config.logging.clone());
    let shatter = ShatterPlugin::new(config).context("invalid shatter config")?;

    let exit = App::new()
        .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(tick)))
        .add_plugins(logging)
        .add_plugins(shatter)
        .init_resource::<Range>()
        .add_systems(Startup, setup_range)
        .add_systems(Update, (aim_and_fire, report_impacts, finish_when_cleared))
        .run();

    match exit {
        AppExit::Success => Ok(()),
        AppExit::Error(code) => anyhow::bail!("range exited with code {code}"),
    }
}

fn setup_range(world: &mut World) {
    plugin::add_scenery(
        world,
        &BodyDesc::fixed(ColliderShape::Cuboid(Vec3::new(20.0, 0.5, 20.0))).at(Vec3::new(0.0, -0.5, 0.0)),
    );
    plugin::add_scenery(
        world,
        &BodyDesc::fixed(ColliderShape::Cuboid(Vec3::new(2.0, 0.05, 0.3)))
            .at(Vec3::new(0.0, SHELF_HEIGHT - 0.05, SHELF_DISTANCE)),
    );

    let count = BOTTLE_PALETTE.len();
    let mut bottles = Vec::with_capacity(count);
    for (i, [r, g, b, a]) in BOTTLE_PALETTE.into_iter().enumerate() {
        let x = (i as f32 - (count - 1) as f32 * 0.5) * BOTTLE_SPACING;
        let base = Vec3::new(x, SHELF_HEIGHT, SHELF_DISTANCE);
        let desc = DestructibleDesc::bottle(format!("bottle_{i}"), BOTTLE_RADIUS, BOTTLE_HEIGHT)
            .at(base)
            .with_tint(Color::srgba(r, g, b, a));
        match plugin::spawn_destructible(world, &desc) {
            Some(id) => bottles.push((id, base + Vec3::Y * BOTTLE_HEIGHT * 0.4)),
            None => warn!(name = %desc.name, "bottle could not be placed"),
        }
    }
    info!(bottles = bottles.len(), "range ready");
    world.resource_mut::<Range>().bottles = bottles;
}

/// Fire at the first standing bottle; the launcher's cooldown paces the shots
fn aim_and_fire(range: Res<Range>, shatter: Res<ShatterResource>, mut fire: EventWriter<FireRequest>) {
    let target = range
        .bottles
        .iter()
        .find(|(id, _)| shatter.0.is_alive(*id));
    if let Some((_, aim)) = target {
        fire.send(FireRequest {
            origin: MUZZLE,
            direction: *aim - MUZZLE,
        });
    }
}

fn report_impacts(mut impacts: EventReader<ImpactEvent>, stats: Res<ShatterStats>) {
    for impact in impacts.read() {
        info!(
            target = impact.target.0,
            point = ?impact.point,
            destroyed = stats.destroyed,
            total = stats.total,
            "bottle broken"
        );
    }
}

fn finish_when_cleared(time: Res<Time>, stats: Res<ShatterStats>, mut exit: EventWriter<AppExit>) {
    if stats.total > 0 && stats.destroyed == stats.total {
        info!(fragments = stats.fragments, "all bottles broken");
        exit.send(AppExit::Success);
    } else if time.elapsed_secs() > TIME_LIMIT_SECS {
        warn!(destroyed = stats.destroyed, total = stats.total, "time limit reached");
        exit.send(AppExit::error());
    }
}
