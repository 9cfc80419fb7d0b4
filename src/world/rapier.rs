//! `PhysicsWorld` backed by rapier.
//!
//! rapier is reached through bevy_rapier3d's re-export so the solver version
//! always matches the one the bevy integration was built against.

use bevy::math::{Quat, Vec3};
use bevy_rapier3d::rapier::na::{Quaternion, UnitQuaternion};
use bevy_rapier3d::rapier::prelude::*;

use super::{BodyDesc, BodyId, BodyKind, ColliderShape, PhysicsWorld, SegmentHit};

/// Segments shorter than this never hit anything
const MIN_SEGMENT_LENGTH: f32 = 1.0e-6;

/// A convex hull needs a tetrahedron's worth of points
const MIN_HULL_POINTS: usize = 4;

/// Point sets thinner than this in any direction count as flat
const MIN_HULL_THICKNESS: f32 = 1.0e-5;

pub struct RapierWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl RapierWorld {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity: to_vector(gravity),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    pub fn gravity(&self) -> Vec3 {
        from_vector(&self.gravity)
    }

    fn collider_for(desc: &BodyDesc) -> Option<Collider> {
        let builder = match &desc.shape {
            ColliderShape::ConvexHull(points) => {
                if points.len() < MIN_HULL_POINTS || !spans_volume(points) {
                    return None;
                }
                let points: Vec<Point<Real>> = points.iter().map(|p| to_point(*p)).collect();
                ColliderBuilder::convex_hull(&points)?
            }
            ColliderShape::Ball(radius) => ColliderBuilder::ball(*radius),
            ColliderShape::Cuboid(half) => ColliderBuilder::cuboid(half.x, half.y, half.z),
        };
        Some(
            builder
                .mass(desc.mass)
                .friction(desc.friction)
                .restitution(desc.restitution)
                .build(),
        )
    }
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new(Vec3::from_array(crate::constants::GRAVITY))
    }
}

impl PhysicsWorld for RapierWorld {
    fn add_body(&mut self, desc: &BodyDesc) -> Option<BodyId> {
        // Build the collider first so a bad shape never leaves an orphan body behind
        let collider = Self::collider_for(desc)?;

        let builder = match desc.kind {
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
            BodyKind::Fixed => RigidBodyBuilder::fixed(),
        };
        // A central impulse on a body of known mass is a velocity change of J/m
        let velocity = match desc.kind {
            BodyKind::Dynamic if desc.mass > 0.0 => desc.linear_velocity + desc.impulse / desc.mass,
            _ => desc.linear_velocity,
        };
        let body = builder
            .position(to_isometry(desc.position, desc.rotation))
            .linvel(to_vector(velocity))
            .ccd_enabled(desc.ccd)
            .build();

        let handle = self.bodies.insert(body);
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        self.query_pipeline.update(&self.colliders);
        Some(body_id(handle))
    }

    fn remove_body(&mut self, body: BodyId) -> bool {
        let removed = self
            .bodies
            .remove(
                handle(body),
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some();
        if removed {
            self.query_pipeline.update(&self.colliders);
        }
        removed
    }

    fn contains(&self, body: BodyId) -> bool {
        self.bodies.contains(handle(body))
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn pose(&self, body: BodyId) -> Option<(Vec3, Quat)> {
        let body = self.bodies.get(handle(body))?;
        let coords = body.rotation().coords;
        Some((
            from_vector(body.translation()),
            Quat::from_xyzw(coords.x, coords.y, coords.z, coords.w),
        ))
    }

    fn linear_velocity(&self, body: BodyId) -> Option<Vec3> {
        self.bodies.get(handle(body)).map(|b| from_vector(b.linvel()))
    }

    fn cast_segment(&self, from: Vec3, to: Vec3, exclude: Option<BodyId>) -> Option<SegmentHit> {
        let delta = to - from;
        let length = delta.length();
        if length < MIN_SEGMENT_LENGTH {
            return None;
        }
        let ray = Ray::new(to_point(from), to_vector(delta / length));
        let mut filter = QueryFilter::default();
        if let Some(excluded) = exclude {
            filter = filter.exclude_rigid_body(handle(excluded));
        }

        let (collider, hit) = self.query_pipeline.cast_ray_and_get_normal(
            &self.bodies,
            &self.colliders,
            &ray,
            length,
            true,
            filter,
        )?;
        let parent = self.colliders.get(collider)?.parent()?;
        let point = ray.point_at(hit.time_of_impact);
        Some(SegmentHit {
            body: body_id(parent),
            point: Vec3::new(point.x, point.y, point.z),
            normal: from_vector(&hit.normal),
            distance: hit.time_of_impact,
        })
    }

    fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }
}

/// True unless the points are all (nearly) coplanar
fn spans_volume(points: &[Vec3]) -> bool {
    let Some(&a) = points.first() else {
        return false;
    };
    let farthest = |score: &dyn Fn(Vec3) -> f32| {
        points
            .iter()
            .copied()
            .max_by(|p, q| score(*p).total_cmp(&score(*q)))
            .unwrap_or(a)
    };
    let b = farthest(&|p| p.distance_squared(a));
    let axis = (b - a).normalize_or_zero();
    let c = farthest(&|p| (p - a).cross(axis).length_squared());
    let normal = (b - a).cross(c - a).normalize_or_zero();
    if normal == Vec3::ZERO {
        return false;
    }
    points
        .iter()
        .any(|p| (*p - a).dot(normal).abs() > MIN_HULL_THICKNESS)
}

fn body_id(handle: RigidBodyHandle) -> BodyId {
    let (index, generation) = handle.into_raw_parts();
    BodyId(((generation as u64) << 32) | index as u64)
}

fn handle(body: BodyId) -> RigidBodyHandle {
    RigidBodyHandle::from_raw_parts(body.0 as u32, (body.0 >> 32) as u32)
}

fn to_vector(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

fn to_point(v: Vec3) -> Point<Real> {
    Point::new(v.x, v.y, v.z)
}

fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_isometry(position: Vec3, rotation: Quat) -> Isometry<Real> {
    let rotation = UnitQuaternion::from_quaternion(Quaternion::new(
        rotation.w, rotation.x, rotation.y, rotation.z,
    ));
    Isometry::from_parts(to_vector(position).into(), rotation)
}
