//! Smoothed third-person camera that trails the player vehicle.

use crate::config::CameraConfig;
use engine_core::{Transform, Vec3};

#[derive(Debug, Clone)]
pub struct ChaseCamera {
    pub position: Vec3,
    pub look_at: Vec3,
    /// Offset from the tracked body, in the body's local frame.
    pub offset: Vec3,
    /// Fraction of the remaining distance covered each tick.
    pub blend: f32,
}

impl ChaseCamera {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            position: Vec3::from(config.initial_position),
            look_at: Vec3::ZERO,
            offset: Vec3::from(config.offset),
            blend: config.blend,
        }
    }

    /// Where the camera would sit with no smoothing.
    pub fn desired_position(&self, tracked: &Transform) -> Vec3 {
        tracked.local_to_world(self.offset)
    }

    /// Advance one tick toward the tracked body.
    pub fn update(&mut self, tracked: &Transform) {
        let desired = self.desired_position(tracked);
        self.position = self.position.lerp(desired, self.blend);
        self.look_at = tracked.position;
    }
}
