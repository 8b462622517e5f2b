//! Rendering for the arena demo: a CPU-side scene mirror plus a small wgpu backend.

pub mod camera;
pub mod mesh;
pub mod pipeline;
pub mod renderer;
pub mod scene;
pub mod texture;
pub mod vertex;

pub use camera::*;
pub use mesh::*;
pub use pipeline::*;
pub use renderer::*;
pub use scene::*;
pub use texture::*;
pub use vertex::*;
