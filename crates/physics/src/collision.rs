//! Collision groups and filtering.

use rapier3d::prelude::*;

/// Collision groups for different entity types.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionGroup {
    /// Static environment (ground, arena walls)
    Environment = 1 << 0,
    /// Player and target vehicles
    Vehicle = 1 << 1,
    /// Fired projectiles
    Projectile = 1 << 2,
}

impl CollisionGroup {
    /// Membership and filter masks for this group.
    ///
    /// Projectiles only collide with the environment: vehicle hits are resolved by
    /// distance in the projectile manager, not by contact.
    pub fn masks(self) -> (Group, Group) {
        let membership = Group::from_bits_retain(self as u32);
        let filter = match self {
            Self::Environment => Group::ALL,
            Self::Vehicle => Group::from_bits_retain(Self::Environment as u32 | Self::Vehicle as u32),
            Self::Projectile => Group::from_bits_retain(Self::Environment as u32),
        };
        (membership, filter)
    }

    /// Rapier interaction groups for colliders of this group.
    pub fn interaction_groups(self) -> InteractionGroups {
        let (membership, filter) = self.masks();
        InteractionGroups::new(membership, filter)
    }
}

/// Handles of one simulated body and its collider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsBody {
    pub rigid_body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

impl PhysicsBody {
    pub fn new(rigid_body: RigidBodyHandle, collider: ColliderHandle) -> Self {
        Self { rigid_body, collider }
    }
}
