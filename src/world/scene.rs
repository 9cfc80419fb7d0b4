//! `SceneGraph` for a bevy `World`.
//!
//! Every attached node becomes one entity carrying `Name`, `Transform`, a
//! `SceneNodeMarker`, and whichever of `NodeTint` / `NodeMesh` / `BodyLink`
//! the node asked for. When the world also holds mesh and material assets (a
//! rendering app), the node gets `Mesh3d` + `MeshMaterial3d` so it shows up.

use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_asset::RenderAssetUsages;

use super::{BodyId, MeshData, PhysicsWorld, SceneGraph, SceneNode};

/// Tags entities owned by the shatter scene graph
#[derive(Component, Debug, Default)]
pub struct SceneNodeMarker;

#[derive(Component, Debug, Clone, Copy)]
pub struct NodeTint(pub Color);

#[derive(Component, Debug, Clone)]
pub struct NodeMesh(pub MeshData);

/// The node's transform is driven by this rigid body
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLink(pub BodyId);

impl MeshData {
    pub fn to_bevy_mesh(&self) -> Mesh {
        Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
            .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, self.positions.clone())
            .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals.clone())
            .with_inserted_indices(Indices::U32(self.indices.clone()))
    }
}

impl SceneGraph for World {
    fn attach(&mut self, node: SceneNode) -> Entity {
        let SceneNode {
            name,
            transform,
            tint,
            mesh,
            body,
        } = node;

        let render_mesh = mesh
            .as_ref()
            .filter(|m| !m.is_empty())
            .and_then(|m| {
                self.get_resource_mut::<Assets<Mesh>>()
                    .map(|mut meshes| meshes.add(m.to_bevy_mesh()))
            });
        let render_material = render_mesh.as_ref().and_then(|_| {
            self.get_resource_mut::<Assets<StandardMaterial>>()
                .map(|mut materials| materials.add(tint.unwrap_or(Color::WHITE)))
        });

        let mut entity = self.spawn((Name::new(name), transform, SceneNodeMarker));
        if let Some(tint) = tint {
            entity.insert(NodeTint(tint));
        }
        if let Some(mesh) = mesh {
            entity.insert(NodeMesh(mesh));
        }
        if let Some(body) = body {
            entity.insert(BodyLink(body));
        }
        if let (Some(mesh), Some(material)) = (render_mesh, render_material) {
            entity.insert((Mesh3d(mesh), MeshMaterial3d(material)));
        }
        entity.id()
    }

    fn detach(&mut self, node: Entity) -> bool {
        if !SceneGraph::contains(self, node) {
            return false;
        }
        self.despawn(node)
    }

    fn contains(&self, node: Entity) -> bool {
        self.get::<SceneNodeMarker>(node).is_some()
    }

    fn set_transform(&mut self, node: Entity, transform: Transform) -> bool {
        match self.get_mut::<Transform>(node) {
            Some(mut current) => {
                *current = transform;
                true
            }
            None => false,
        }
    }

    fn set_tint(&mut self, node: Entity, tint: Color) -> bool {
        if !SceneGraph::contains(self, node) {
            return false;
        }
        self.entity_mut(node).insert(NodeTint(tint));
        true
    }

    fn tint(&self, node: Entity) -> Option<Color> {
        self.get::<NodeTint>(node).map(|t| t.0)
    }
}

/// Copy body poses onto every node linked to a live body. Returns the number of nodes moved.
pub fn sync_linked_transforms(world: &mut World, physics: &impl PhysicsWorld) -> usize {
    let mut moved = 0;
    let mut query = world.query::<(&BodyLink, &mut Transform)>();
    for (link, mut transform) in query.iter_mut(world) {
        if let Some((translation, rotation)) = physics.pose(link.0) {
            transform.translation = translation;
            transform.rotation = rotation;
            moved += 1;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshData {
        MeshData {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn test_attach_and_detach() {
        let mut world = World::new();
        let node = world.attach(SceneNode::new("bottle").with_tint(Color::srgb(1.0, 0.0, 0.0)));
        assert!(world.contains(node));
        assert_eq!(world.get::<Name>(node).unwrap().as_str(), "bottle");
        assert!(world.detach(node));
        assert!(!world.contains(node));
        assert!(!world.detach(node));
    }

    #[test]
    fn test_tint_roundtrip() {
        let mut world = World::new();
        let node = world.attach(SceneNode::new("plain"));
        assert!(world.tint(node).is_none());
        let red = Color::srgb(1.0, 0.0, 0.0);
        assert!(world.set_tint(node, red));
        assert_eq!(world.tint(node), Some(red));
    }

    #[test]
    fn test_set_transform_on_missing_node() {
        let mut world = World::new();
        let node = world.attach(SceneNode::new("gone"));
        world.detach(node);
        assert!(!world.set_transform(node, Transform::from_xyz(1.0, 2.0, 3.0)));
        assert!(!world.set_tint(node, Color::WHITE));
    }

    #[test]
    fn test_mesh_and_link_components() {
        let mut world = World::new();
        let node = world.attach(SceneNode::new("shard").with_mesh(triangle()).following(BodyId(9)));
        assert_eq!(world.get::<BodyLink>(node), Some(&BodyLink(BodyId(9))));
        assert_eq!(world.get::<NodeMesh>(node).unwrap().0.triangle_count(), 1);
        // No asset storage in a bare world, so no render components either
        assert!(world.get::<Mesh3d>(node).is_none());
    }

    #[test]
    fn test_render_components_with_assets() {
        let mut world = World::new();
        world.init_resource::<Assets<Mesh>>();
        world.init_resource::<Assets<StandardMaterial>>();
        let node = world.attach(SceneNode::new("shard").with_mesh(triangle()));
        assert!(world.get::<Mesh3d>(node).is_some());
        assert!(world.get::<MeshMaterial3d<StandardMaterial>>(node).is_some());
    }

    #[test]
    fn test_bevy_mesh_conversion() {
        let mesh = triangle().to_bevy_mesh();
        assert_eq!(mesh.count_vertices(), 3);
        assert_eq!(mesh.indices().map(|i| i.len()), Some(3));
    }
}
