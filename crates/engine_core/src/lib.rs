//! Core engine types shared by every crate in the arena demo:
//! - Transform and spatial helpers
//! - Frame timing

pub mod time;
pub mod transform;

pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{BVec3, Mat4, Quat, Vec2, Vec3, Vec4};
