//! Arcade driving: held keys set velocities directly instead of applying forces.

use crate::config::DriveConfig;
use engine_core::{transform::LOCAL_FORWARD, BVec3, Quat, Vec3};
use input::InputSnapshot;
use physics::{PhysicsWorld, RigidBodyHandle};

/// Only yaw is free while the driver is steering or throttling.
pub const DRIVING_ROTATION_MASK: BVec3 = BVec3::new(false, true, false);
/// With no drive input the body tumbles freely.
pub const FREE_ROTATION_MASK: BVec3 = BVec3::TRUE;

/// Velocities and rotation lock to write back to a vehicle body for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveCommand {
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub rotation_mask: BVec3,
}

#[derive(Debug, Clone)]
pub struct VehicleController {
    config: DriveConfig,
}

impl VehicleController {
    pub fn new(config: DriveConfig) -> Self {
        Self { config }
    }

    /// Compute this tick's command from the current body state.
    ///
    /// Forward beats backward and left beats right when both are held.
    /// Vertical velocity is always left to the physics world.
    pub fn command(
        &self,
        input: &InputSnapshot,
        rotation: Quat,
        linvel: Vec3,
        angvel: Vec3,
    ) -> DriveCommand {
        let forward = rotation * LOCAL_FORWARD;
        let horizontal = if input.forward {
            forward * self.config.desired_speed
        } else if input.backward {
            -forward * self.config.desired_speed
        } else {
            linvel * self.config.decay
        };

        let yaw_rate = if input.turn_left {
            self.config.turn_rate
        } else if input.turn_right {
            -self.config.turn_rate
        } else {
            0.0
        };

        let rotation_mask = if input.any_drive_held() {
            DRIVING_ROTATION_MASK
        } else {
            FREE_ROTATION_MASK
        };

        DriveCommand {
            linear_velocity: Vec3::new(horizontal.x, linvel.y, horizontal.z),
            angular_velocity: Vec3::new(angvel.x, yaw_rate, angvel.z),
            rotation_mask,
        }
    }

    /// Drive `body` for one tick. Does not step the world.
    ///
    /// Returns `None` if the body is no longer in the world.
    pub fn apply(
        &self,
        input: &InputSnapshot,
        physics: &mut PhysicsWorld,
        body: RigidBodyHandle,
    ) -> Option<DriveCommand> {
        let transform = physics.get_body_transform(body)?;
        let linvel = physics.linear_velocity(body)?;
        let angvel = physics.angular_velocity(body)?;

        let command = self.command(input, transform.rotation, linvel, angvel);
        physics.set_rotation_mask(body, command.rotation_mask);
        physics.set_linear_velocity(body, command.linear_velocity);
        physics.set_angular_velocity(body, command.angular_velocity);
        Some(command)
    }
}
