//! Physics services consumed by the interaction core.
//!
//! The grab, pointer and locomotion logic never talks to a physics engine directly. It
//! goes through [`SceneQuery`] (rays and overlap volumes) and [`BodyControl`] (reading and
//! writing rigid-body state). [`RapierScene`] implements both over rapier3d.

// Re-export Rapier so downstream crates can build colliders without depending on
// `rapier3d` directly.
pub use rapier3d;

use rapier3d::prelude::*;

use crate::types::{Point3, Pose, Vec3};

/// Stable identifier of a rigid body in a scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u64);

impl From<RigidBodyHandle> for BodyId {
    fn from(handle: RigidBodyHandle) -> Self {
        let (index, generation) = handle.into_raw_parts();
        BodyId(((generation as u64) << 32) | index as u64)
    }
}

impl From<BodyId> for RigidBodyHandle {
    fn from(id: BodyId) -> Self {
        RigidBodyHandle::from_raw_parts(id.0 as u32, (id.0 >> 32) as u32)
    }
}

/// Closest hit of a ray cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub body: BodyId,
    pub point: Point3,
    pub normal: Vec3,
    pub distance: f32,
}

/// A body overlapping a query volume, with its anchor (world position).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Overlap {
    pub body: BodyId,
    pub anchor: Point3,
}

/// Simulation inputs that grabbing and teleporting suspend and later restore.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyFlags {
    pub gravity: bool,
    pub kinematic: bool,
}

impl Default for BodyFlags {
    fn default() -> Self {
        Self {
            gravity: true,
            kinematic: false,
        }
    }
}

/// Read-only physics queries.
pub trait SceneQuery {
    /// Closest hit along `dir` (normalized by the implementation) within `max_distance`,
    /// ignoring any body listed in `exclude`.
    fn cast_ray(
        &self,
        origin: Point3,
        dir: Vec3,
        max_distance: f32,
        exclude: &[BodyId],
    ) -> Option<RayHit>;

    fn overlap_sphere(&self, center: Point3, radius: f32) -> Vec<Overlap>;

    /// Oriented box overlap. `pose` places the box center.
    fn overlap_box(&self, pose: &Pose, half_extents: Vec3) -> Vec<Overlap>;

    /// Cylinder overlap, axis along the local +Y of `pose`.
    fn overlap_cylinder(&self, pose: &Pose, radius: f32, half_height: f32) -> Vec<Overlap>;

    /// Does this body carry the grabbable marker?
    fn is_grabbable(&self, body: BodyId) -> bool;
}

/// Mutable access to rigid-body state.
pub trait BodyControl {
    fn pose(&self, body: BodyId) -> Option<Pose>;
    fn set_pose(&mut self, body: BodyId, pose: Pose);
    /// `(linear, angular)` velocity.
    fn velocity(&self, body: BodyId) -> Option<(Vec3, Vec3)>;
    fn set_velocity(&mut self, body: BodyId, linear: Vec3, angular: Vec3);
    fn flags(&self, body: BodyId) -> Option<BodyFlags>;
    fn set_flags(&mut self, body: BodyId, flags: BodyFlags);
}

/// Everything the interaction core needs from a physics world.
pub trait Scene: SceneQuery + BodyControl {}

impl<T: SceneQuery + BodyControl> Scene for T {}

/// Collider `user_data` bit marking a body as grabbable.
pub const GRABBABLE_MARKER: u128 = 1;

/// Supported collider shapes.
#[derive(Clone, Debug)]
pub enum ColliderShapeDef {
    /// Infinite plane (half-space) whose normal is the body's local +Y.
    Plane,

    /// Oriented cuboid with given half-extents (meters).
    Cuboid { half_extents: Vec3 },

    /// Sphere/ball (meters).
    Sphere { radius: f32 },

    /// Y-aligned capsule (meters).
    CapsuleY { radius: f32, half_height: f32 },

    /// Y-aligned cylinder (meters).
    CylinderY { radius: f32, half_height: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    Fixed,
    Dynamic,
    Kinematic,
}

/// Schema-agnostic definition of a scene body.
#[derive(Clone, Debug)]
pub struct BodyDef {
    /// Stable unique identifier used to ensure deterministic insertion order.
    pub id: u32,
    pub pose: Pose,
    pub kind: BodyKind,
    pub shape: ColliderShapeDef,
    pub grabbable: bool,
}

impl BodyDef {
    pub fn fixed(id: u32, pose: Pose, shape: ColliderShapeDef) -> Self {
        Self {
            id,
            pose,
            kind: BodyKind::Fixed,
            shape,
            grabbable: false,
        }
    }

    pub fn grabbable(id: u32, pose: Pose, shape: ColliderShapeDef) -> Self {
        Self {
            id,
            pose,
            kind: BodyKind::Dynamic,
            shape,
            grabbable: true,
        }
    }
}

/// Build a Rapier collider from a shape definition.
///
/// The pose lives on the parent rigid-body, so the collider has an identity local transform.
pub fn collider_from_def(shape: &ColliderShapeDef) -> ColliderBuilder {
    match shape {
        ColliderShapeDef::Plane => ColliderBuilder::halfspace(Vector::y_axis()),
        ColliderShapeDef::Cuboid { half_extents } => {
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }
        ColliderShapeDef::Sphere { radius } => ColliderBuilder::ball(*radius),
        ColliderShapeDef::CapsuleY {
            radius,
            half_height,
        } => ColliderBuilder::capsule_y(*half_height, *radius),
        ColliderShapeDef::CylinderY {
            radius,
            half_height,
        } => ColliderBuilder::cylinder(*half_height, *radius),
    }
}

/// In-memory Rapier world backing the interaction queries.
///
/// `refresh()` must run after inserting or teleporting bodies and before querying, so the
/// broad-phase sees the new poses. `step()` refreshes as part of the simulation.
pub struct RapierScene {
    pub gravity: Vector<f32>,
    pub integration_parameters: IntegrationParameters,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub broad_phase: BroadPhaseBvh,
    pub narrow_phase: NarrowPhase,
    islands: IslandManager,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    physics_pipeline: PhysicsPipeline,
    collision_pipeline: CollisionPipeline,
}

impl Default for RapierScene {
    fn default() -> Self {
        Self::new(Vector::new(0.0, -crate::settings::GRAVITY_MPS2, 0.0))
    }
}

impl RapierScene {
    pub fn new(gravity: Vector<f32>) -> Self {
        Self {
            gravity,
            integration_parameters: IntegrationParameters::default(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            islands: IslandManager::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            physics_pipeline: PhysicsPipeline::new(),
            collision_pipeline: CollisionPipeline::new(),
        }
    }

    /// Build a scene from a list of body definitions.
    ///
    /// Determinism: the input is sorted by `id` before insertion.
    pub fn build(gravity: Vector<f32>, mut defs: Vec<BodyDef>) -> (Self, Vec<(u32, BodyId)>) {
        defs.sort_by_key(|d| d.id);

        let mut scene = Self::new(gravity);
        let ids = defs
            .iter()
            .map(|def| (def.id, scene.insert(def)))
            .collect();
        scene.refresh();
        (scene, ids)
    }

    pub fn insert(&mut self, def: &BodyDef) -> BodyId {
        let iso = def.pose.iso();
        let builder = match def.kind {
            BodyKind::Fixed => RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
            BodyKind::Kinematic => RigidBodyBuilder::kinematic_position_based(),
        };
        let rb_handle = self.bodies.insert(builder.pose(iso).build());

        let user_data = if def.grabbable { GRABBABLE_MARKER } else { 0 };
        let collider = collider_from_def(&def.shape).user_data(user_data).build();
        self.colliders
            .insert_with_parent(collider, rb_handle, &mut self.bodies);

        log::debug!("inserted body {} as {:?}", def.id, BodyId::from(rb_handle));
        rb_handle.into()
    }

    /// Update broad and narrow phases without integrating dynamics.
    pub fn refresh(&mut self) {
        // Using default hooks/events (none).
        let hooks = ();
        let events = ();
        self.collision_pipeline.step(
            0.0,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &hooks,
            &events,
        );
    }

    /// Advance the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            self.refresh();
            return;
        }
        self.integration_parameters.dt = dt;

        let hooks = ();
        let events = ();
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
            &hooks,
            &events,
        );
    }

    /// Create a borrowed `QueryPipeline` view for scene queries.
    pub fn query_pipeline<'a>(&'a self, filter: QueryFilter<'a>) -> QueryPipeline<'a> {
        self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        )
    }

    fn overlaps_with(&self, pose: &Pose, shape: &dyn Shape) -> Vec<Overlap> {
        let pipeline = self.query_pipeline(QueryFilter::default());
        let mut out: Vec<Overlap> = Vec::new();
        for (_handle, collider) in pipeline.intersect_shape(pose.iso(), shape) {
            let Some(parent) = collider.parent() else {
                continue;
            };
            let body = BodyId::from(parent);
            if out.iter().any(|o| o.body == body) {
                continue;
            }
            let Some(rb) = self.bodies.get(parent) else {
                continue;
            };
            out.push(Overlap {
                body,
                anchor: Point3::from(rb.position().translation.vector),
            });
        }
        out
    }
}

impl SceneQuery for RapierScene {
    fn cast_ray(
        &self,
        origin: Point3,
        dir: Vec3,
        max_distance: f32,
        exclude: &[BodyId],
    ) -> Option<RayHit> {
        let len = dir.norm();
        if len <= crate::settings::DIST_EPS || max_distance <= 0.0 {
            return None;
        }
        let dir = dir / len;

        let predicate = |_handle: ColliderHandle, collider: &Collider| {
            collider
                .parent()
                .is_none_or(|parent| !exclude.contains(&BodyId::from(parent)))
        };
        let filter = QueryFilter::default().predicate(&predicate);
        let pipeline = self.query_pipeline(filter);

        let ray = Ray::new(origin, dir);
        let (handle, hit) = pipeline.cast_ray_and_get_normal(&ray, max_distance, true)?;
        let parent = self.colliders.get(handle)?.parent()?;

        Some(RayHit {
            body: parent.into(),
            point: ray.point_at(hit.time_of_impact),
            normal: hit.normal,
            distance: hit.time_of_impact,
        })
    }

    fn overlap_sphere(&self, center: Point3, radius: f32) -> Vec<Overlap> {
        if radius <= 0.0 {
            return Vec::new();
        }
        self.overlaps_with(&Pose::from_translation(center.coords), &Ball::new(radius))
    }

    fn overlap_box(&self, pose: &Pose, half_extents: Vec3) -> Vec<Overlap> {
        self.overlaps_with(pose, &Cuboid::new(half_extents))
    }

    fn overlap_cylinder(&self, pose: &Pose, radius: f32, half_height: f32) -> Vec<Overlap> {
        self.overlaps_with(pose, &Cylinder::new(half_height, radius))
    }

    fn is_grabbable(&self, body: BodyId) -> bool {
        let Some(rb) = self.bodies.get(body.into()) else {
            return false;
        };
        rb.colliders().iter().any(|&handle| {
            self.colliders
                .get(handle)
                .is_some_and(|c| c.user_data & GRABBABLE_MARKER != 0)
        })
    }
}

impl BodyControl for RapierScene {
    fn pose(&self, body: BodyId) -> Option<Pose> {
        self.bodies
            .get(body.into())
            .map(|rb| Pose::from_iso(rb.position()))
    }

    fn set_pose(&mut self, body: BodyId, pose: Pose) {
        let Some(rb) = self.bodies.get_mut(body.into()) else {
            return;
        };
        let iso = pose.iso();
        if rb.is_kinematic() {
            rb.set_next_kinematic_position(iso);
        }
        rb.set_position(iso, true);
    }

    fn velocity(&self, body: BodyId) -> Option<(Vec3, Vec3)> {
        self.bodies
            .get(body.into())
            .map(|rb| (*rb.linvel(), *rb.angvel()))
    }

    fn set_velocity(&mut self, body: BodyId, linear: Vec3, angular: Vec3) {
        let Some(rb) = self.bodies.get_mut(body.into()) else {
            return;
        };
        rb.set_linvel(linear, true);
        rb.set_angvel(angular, true);
    }

    fn flags(&self, body: BodyId) -> Option<BodyFlags> {
        self.bodies.get(body.into()).map(|rb| BodyFlags {
            gravity: rb.gravity_scale() != 0.0,
            kinematic: rb.is_kinematic(),
        })
    }

    fn set_flags(&mut self, body: BodyId, flags: BodyFlags) {
        let Some(rb) = self.bodies.get_mut(body.into()) else {
            return;
        };
        // Fixed bodies stay fixed; only dynamic/kinematic toggle.
        if !rb.is_fixed() {
            let body_type = if flags.kinematic {
                RigidBodyType::KinematicPositionBased
            } else {
                RigidBodyType::Dynamic
            };
            rb.set_body_type(body_type, true);
        }
        rb.set_gravity_scale(if flags.gravity { 1.0 } else { 0.0 }, true);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_id_round_trips_rapier_handle() {
        let handle = RigidBodyHandle::from_raw_parts(7, 3);
        let id = BodyId::from(handle);
        assert_eq!(RigidBodyHandle::from(id), handle);
    }
}
