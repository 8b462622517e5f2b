//! ECS components for simulated entities.

use physics::PhysicsBody;
use renderer::VisualId;

/// A drivable box body with its visual.
#[derive(Debug, Clone, Copy)]
pub struct Vehicle {
    pub body: PhysicsBody,
    pub visual: VisualId,
}

/// Marker for the single vehicle driven by input.
#[derive(Debug, Clone, Copy)]
pub struct PlayerControlled;

/// A fired projectile. `owner` is the vehicle that fired it.
#[derive(Debug, Clone, Copy)]
pub struct Projectile {
    pub owner: hecs::Entity,
    pub body: PhysicsBody,
    pub visual: VisualId,
    /// Simulation time at spawn, in seconds.
    pub spawned_at: f32,
}
