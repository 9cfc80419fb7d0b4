//! Fragment rigid bodies.

use bevy::prelude::*;
use rand::Rng;
use tracing::debug;

use super::mesh::FragmentMesh;
use crate::config::FragmentConfig;
use crate::world::{BodyDesc, BodyId, ColliderShape, PhysicsWorld, SceneGraph, SceneNode};

/// One spawned shard: a dynamic body plus the scene node that follows it
#[derive(Debug, Clone)]
pub struct Fragment {
    pub index: usize,
    pub mesh: FragmentMesh,
    /// Spawn position (impact point plus jitter)
    pub position: Vec3,
    pub impulse: Vec3,
    pub body: BodyId,
    pub node: Entity,
}

/// Add one fragment to the physics world and the scene.
///
/// The hull is inserted first; the node is only attached once the body exists,
/// so a rejected hull leaves nothing behind.
pub fn spawn<P, S, R>(
    index: usize,
    mesh: FragmentMesh,
    impact_point: Vec3,
    config: &FragmentConfig,
    rng: &mut R,
    physics: &mut P,
    scene: &mut S,
) -> Option<Fragment>
where
    P: PhysicsWorld + ?Sized,
    S: SceneGraph + ?Sized,
    R: Rng + ?Sized,
{
    let jitter = config.jitter;
    let position = impact_point
        + Vec3::new(
            rng.gen_range(-jitter..=jitter),
            rng.gen_range(-jitter..=jitter),
            rng.gen_range(-jitter..=jitter),
        );
    let (lo, hi) = (config.impulse_min, config.impulse_max);
    let impulse = Vec3::new(
        rng.gen_range(lo.x..=hi.x),
        rng.gen_range(lo.y..=hi.y),
        rng.gen_range(lo.z..=hi.z),
    );

    let desc = BodyDesc::dynamic(ColliderShape::ConvexHull(mesh.hull.clone()))
        .at(position)
        .with_mass(config.mass)
        .with_material(config.friction, config.restitution)
        .with_impulse(impulse);
    let Some(body) = physics.add_body(&desc) else {
        debug!(index, "fragment hull rejected by physics world");
        return None;
    };

    let node = scene.attach(
        SceneNode::new(format!("shard_{index}"))
            .with_transform(Transform::from_translation(position))
            .with_tint(mesh.tint)
            .with_mesh(mesh.mesh.clone())
            .following(body),
    );
    debug!(index, ?position, ?impulse, "fragment spawned");

    Some(Fragment {
        index,
        mesh,
        position,
        impulse,
        body,
        node,
    })
}
