//! Physics world management with Rapier3D.

use crate::collision::{CollisionGroup, PhysicsBody};
use engine_core::{BVec3, Quat, Transform, Vec3};
use rapier3d::na::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};
use rapier3d::prelude::*;

/// Standard gravity along -Y, in m/s².
pub const DEFAULT_GRAVITY: f32 = -9.82;

/// Collision shape of a body, centred on the body origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyShape {
    Cuboid { half_extents: Vec3 },
    Ball { radius: f32 },
}

impl BodyShape {
    fn collider(&self) -> ColliderBuilder {
        match *self {
            Self::Cuboid { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            Self::Ball { radius } => ColliderBuilder::ball(radius),
        }
    }

    /// Uniform-density mass properties totalling `mass`, with the centre of mass moved to `com`.
    fn mass_properties(&self, mass: f32, com: Vec3) -> MassProperties {
        let mut props = match *self {
            Self::Cuboid { half_extents } => {
                let volume = 8.0 * half_extents.x * half_extents.y * half_extents.z;
                MassProperties::from_cuboid(mass / volume, to_vector(half_extents))
            }
            Self::Ball { radius } => {
                let volume = 4.0 / 3.0 * std::f32::consts::PI * radius.powi(3);
                MassProperties::from_ball(mass / volume, radius)
            }
        };
        props.local_com = point![com.x, com.y, com.z];
        props
    }
}

/// Everything needed to register a body with the world.
#[derive(Debug, Clone, Copy)]
pub struct BodyDesc {
    pub shape: BodyShape,
    /// Mass in kg. Zero makes the body static.
    pub mass: f32,
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Centre-of-mass offset from the shape centre, local frame.
    pub center_of_mass: Vec3,
    pub gravity_scale: f32,
    pub group: CollisionGroup,
    /// Continuous collision detection, for small fast bodies.
    pub ccd: bool,
}

impl BodyDesc {
    pub fn new(shape: BodyShape, mass: f32) -> Self {
        Self {
            shape,
            mass,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            linear_damping: 0.0,
            angular_damping: 0.0,
            center_of_mass: Vec3::ZERO,
            gravity_scale: 1.0,
            group: CollisionGroup::Environment,
            ccd: false,
        }
    }

    pub fn at(mut self, position: Vec3, rotation: Quat) -> Self {
        self.position = position;
        self.rotation = rotation;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.linear_velocity = velocity;
        self
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    pub fn with_center_of_mass(mut self, offset: Vec3) -> Self {
        self.center_of_mass = offset;
        self
    }

    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    pub fn in_group(mut self, group: CollisionGroup) -> Self {
        self.group = group;
        self
    }

    pub fn with_ccd(mut self, enabled: bool) -> Self {
        self.ccd = enabled;
        self
    }

    pub fn is_static(&self) -> bool {
        self.mass <= 0.0
    }
}

/// Main physics world containing all simulation state.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(DEFAULT_GRAVITY)
    }
}

impl PhysicsWorld {
    /// Create a new physics world with gravity `gravity_y` along the Y axis.
    pub fn new(gravity_y: f32) -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            gravity: vector![0.0, gravity_y, 0.0],
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Advance the simulation by exactly `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Register a body and its collider.
    pub fn add_body(&mut self, desc: &BodyDesc) -> PhysicsBody {
        let builder = if desc.is_static() {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        };
        let rigid_body = builder
            .position(to_isometry(desc.position, desc.rotation))
            .linvel(to_vector(desc.linear_velocity))
            .linear_damping(desc.linear_damping)
            .angular_damping(desc.angular_damping)
            .gravity_scale(desc.gravity_scale)
            .ccd_enabled(desc.ccd)
            .build();
        let handle = self.rigid_body_set.insert(rigid_body);

        let mut collider = desc
            .shape
            .collider()
            .collision_groups(desc.group.interaction_groups());
        if !desc.is_static() {
            collider = collider.mass_properties(desc.shape.mass_properties(desc.mass, desc.center_of_mass));
        }
        let collider =
            self.collider_set
                .insert_with_parent(collider.build(), handle, &mut self.rigid_body_set);

        PhysicsBody::new(handle, collider)
    }

    /// Add a ground plane collider (flat Y=0 half-space).
    pub fn add_ground_plane(&mut self) -> ColliderHandle {
        let collider = ColliderBuilder::halfspace(Vector::y_axis())
            .collision_groups(CollisionGroup::Environment.interaction_groups())
            .build();
        self.collider_set.insert(collider)
    }

    /// Add a static cuboid collider (arena walls). No parent body; collider is fixed in world.
    /// `translation`: world position of center. `rotation_y_rad`: rotation around Y axis in radians.
    pub fn add_static_cuboid(
        &mut self,
        translation: Vec3,
        rotation_y_rad: f32,
        half_extents: Vec3,
    ) -> ColliderHandle {
        let tra = vector![translation.x, translation.y, translation.z];
        let axisangle = Vector3::y_axis().into_inner() * (rotation_y_rad as Real);
        let position = Isometry3::new(tra, axisangle);
        let collider = ColliderBuilder::cuboid(
            half_extents.x as Real,
            half_extents.y as Real,
            half_extents.z as Real,
        )
        .position(position)
        .collision_groups(CollisionGroup::Environment.interaction_groups())
        .build();
        self.collider_set.insert(collider)
    }

    /// Remove a rigid body and its colliders.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        let removed = self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        if removed.is_none() {
            log::warn!("remove_body: unknown rigid body {:?}", handle);
        }
    }

    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set.contains(handle)
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// Get the transform of a rigid body.
    pub fn get_body_transform(&self, handle: RigidBodyHandle) -> Option<Transform> {
        self.rigid_body_set.get(handle).map(|body| {
            let pos = body.translation();
            let rot = body.rotation();
            Transform {
                position: Vec3::new(pos.x, pos.y, pos.z),
                rotation: Quat::from_xyzw(rot.i, rot.j, rot.k, rot.w),
                scale: Vec3::ONE,
            }
        })
    }

    /// World-space centre of mass.
    pub fn center_of_mass(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set
            .get(handle)
            .map(|body| {
                let com = body.center_of_mass();
                Vec3::new(com.x, com.y, com.z)
            })
    }

    /// Teleport a body. Velocities are kept.
    pub fn set_body_pose(&mut self, handle: RigidBodyHandle, position: Vec3, rotation: Quat) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_position(to_isometry(position, rotation), true);
        }
    }

    pub fn linear_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set.get(handle).map(|body| from_vector(body.linvel()))
    }

    pub fn angular_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set.get(handle).map(|body| from_vector(body.angvel()))
    }

    pub fn set_linear_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_linvel(to_vector(velocity), true);
        }
    }

    pub fn set_angular_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_angvel(to_vector(velocity), true);
        }
    }

    /// Which rotation axes respond to torque and angular velocity (true = free).
    pub fn rotation_mask(&self, handle: RigidBodyHandle) -> Option<BVec3> {
        self.rigid_body_set.get(handle).map(|body| {
            let locked = body.locked_axes();
            BVec3::new(
                !locked.contains(LockedAxes::ROTATION_LOCKED_X),
                !locked.contains(LockedAxes::ROTATION_LOCKED_Y),
                !locked.contains(LockedAxes::ROTATION_LOCKED_Z),
            )
        })
    }

    pub fn set_rotation_mask(&mut self, handle: RigidBodyHandle, mask: BVec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_enabled_rotations(mask.x, mask.y, mask.z, true);
        }
    }

    /// Apply an impulse to a dynamic body at a world-space point.
    pub fn apply_impulse_at_point(&mut self, handle: RigidBodyHandle, impulse: Vec3, point: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.apply_impulse_at_point(to_vector(impulse), point![point.x, point.y, point.z], true);
        }
    }
}

fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_isometry(position: Vec3, rotation: Quat) -> Isometry<Real> {
    let rotation = UnitQuaternion::from_quaternion(Quaternion::new(
        rotation.w, rotation.x, rotation.y, rotation.z,
    ));
    Isometry3::from_parts(Translation3::new(position.x, position.y, position.z), rotation)
}
