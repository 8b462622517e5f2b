//! Mesh data structures and primitive generation.

use crate::vertex::Vertex;
use glam::Vec3;
use wgpu::util::DeviceExt;

/// A GPU mesh with vertex and index buffers.
pub struct Mesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
}

impl Mesh {
    /// Create a mesh from vertex and index data.
    pub fn new(device: &wgpu::Device, vertices: &[Vertex], indices: &[u32]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
        }
    }
}

/// Mesh data before GPU upload.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload(&self, device: &wgpu::Device) -> Mesh {
        Mesh::new(device, &self.vertices, &self.indices)
    }

    /// Unit cube centered at origin. Scale it per instance.
    pub fn cube() -> Self {
        let vertices = vec![
            // Front face
            Vertex::new([-0.5, -0.5, 0.5], [0.0, 0.0, 1.0]),
            Vertex::new([0.5, -0.5, 0.5], [0.0, 0.0, 1.0]),
            Vertex::new([0.5, 0.5, 0.5], [0.0, 0.0, 1.0]),
            Vertex::new([-0.5, 0.5, 0.5], [0.0, 0.0, 1.0]),
            // Back face
            Vertex::new([0.5, -0.5, -0.5], [0.0, 0.0, -1.0]),
            Vertex::new([-0.5, -0.5, -0.5], [0.0, 0.0, -1.0]),
            Vertex::new([-0.5, 0.5, -0.5], [0.0, 0.0, -1.0]),
            Vertex::new([0.5, 0.5, -0.5], [0.0, 0.0, -1.0]),
            // Top face
            Vertex::new([-0.5, 0.5, 0.5], [0.0, 1.0, 0.0]),
            Vertex::new([0.5, 0.5, 0.5], [0.0, 1.0, 0.0]),
            Vertex::new([0.5, 0.5, -0.5], [0.0, 1.0, 0.0]),
            Vertex::new([-0.5, 0.5, -0.5], [0.0, 1.0, 0.0]),
            // Bottom face
            Vertex::new([-0.5, -0.5, -0.5], [0.0, -1.0, 0.0]),
            Vertex::new([0.5, -0.5, -0.5], [0.0, -1.0, 0.0]),
            Vertex::new([0.5, -0.5, 0.5], [0.0, -1.0, 0.0]),
            Vertex::new([-0.5, -0.5, 0.5], [0.0, -1.0, 0.0]),
            // Right face
            Vertex::new([0.5, -0.5, 0.5], [1.0, 0.0, 0.0]),
            Vertex::new([0.5, -0.5, -0.5], [1.0, 0.0, 0.0]),
            Vertex::new([0.5, 0.5, -0.5], [1.0, 0.0, 0.0]),
            Vertex::new([0.5, 0.5, 0.5], [1.0, 0.0, 0.0]),
            // Left face
            Vertex::new([-0.5, -0.5, -0.5], [-1.0, 0.0, 0.0]),
            Vertex::new([-0.5, -0.5, 0.5], [-1.0, 0.0, 0.0]),
            Vertex::new([-0.5, 0.5, 0.5], [-1.0, 0.0, 0.0]),
            Vertex::new([-0.5, 0.5, -0.5], [-1.0, 0.0, 0.0]),
        ];

        #[rustfmt::skip]
        let indices = vec![
            0, 1, 2, 2, 3, 0,       // Front
            4, 5, 6, 6, 7, 4,       // Back
            8, 9, 10, 10, 11, 8,    // Top
            12, 13, 14, 14, 15, 12, // Bottom
            16, 17, 18, 18, 19, 16, // Right
            20, 21, 22, 22, 23, 20, // Left
        ];

        Self { vertices, indices }
    }

    /// Unit ground plane in XZ (1 x 1), normal +Y.
    pub fn plane() -> Self {
        let vertices = vec![
            Vertex::new([-0.5, 0.0, 0.5], [0.0, 1.0, 0.0]),
            Vertex::new([0.5, 0.0, 0.5], [0.0, 1.0, 0.0]),
            Vertex::new([0.5, 0.0, -0.5], [0.0, 1.0, 0.0]),
            Vertex::new([-0.5, 0.0, -0.5], [0.0, 1.0, 0.0]),
        ];
        let indices = vec![0, 1, 2, 2, 3, 0];
        Self { vertices, indices }
    }

    /// UV sphere.
    pub fn sphere(radius: f32, segments: u32, rings: u32) -> Self {
        let mut mesh = Self::new();

        for ring in 0..=rings {
            let phi = std::f32::consts::PI * ring as f32 / rings as f32;
            let y = radius * phi.cos();
            let ring_radius = radius * phi.sin();

            for segment in 0..=segments {
                let theta = 2.0 * std::f32::consts::PI * segment as f32 / segments as f32;
                let x = ring_radius * theta.cos();
                let z = ring_radius * theta.sin();

                let normal = Vec3::new(x, y, z).normalize_or_zero();
                mesh.vertices.push(Vertex::new([x, y, z], normal.into()));
            }
        }

        for ring in 0..rings {
            for segment in 0..segments {
                let current = ring * (segments + 1) + segment;
                let next = current + segments + 1;

                mesh.indices
                    .extend_from_slice(&[current, next, current + 1, current + 1, next, next + 1]);
            }
        }

        mesh
    }

    /// Closed cylinder along Y, centered at origin.
    pub fn cylinder(radius: f32, height: f32, segments: u32) -> Self {
        let mut mesh = Self::new();
        let half = height / 2.0;

        // Side wall: one bottom/top vertex pair per segment edge.
        for segment in 0..=segments {
            let theta = 2.0 * std::f32::consts::PI * segment as f32 / segments as f32;
            let (sin, cos) = theta.sin_cos();
            let normal = [cos, 0.0, sin];
            mesh.vertices.push(Vertex::new([radius * cos, -half, radius * sin], normal));
            mesh.vertices.push(Vertex::new([radius * cos, half, radius * sin], normal));
        }
        for segment in 0..segments {
            let bottom = segment * 2;
            mesh.indices
                .extend_from_slice(&[bottom, bottom + 1, bottom + 2, bottom + 2, bottom + 1, bottom + 3]);
        }

        // Caps: center fan.
        for (y, ny) in [(-half, -1.0), (half, 1.0)] {
            let center = mesh.vertices.len() as u32;
            mesh.vertices.push(Vertex::new([0.0, y, 0.0], [0.0, ny, 0.0]));
            for segment in 0..=segments {
                let theta = 2.0 * std::f32::consts::PI * segment as f32 / segments as f32;
                let (sin, cos) = theta.sin_cos();
                mesh.vertices.push(Vertex::new([radius * cos, y, radius * sin], [0.0, ny, 0.0]));
            }
            for segment in 0..segments {
                let rim = center + 1 + segment;
                mesh.indices.extend_from_slice(&[center, rim, rim + 1]);
            }
        }

        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_well_formed(mesh: &MeshData) {
        assert_eq!(mesh.indices.len() % 3, 0);
        let count = mesh.vertices.len() as u32;
        assert!(mesh.indices.iter().all(|&i| i < count), "index out of range");
    }

    #[test]
    fn cube_has_four_vertices_per_face() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert_well_formed(&cube);
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let sphere = MeshData::sphere(0.3, 12, 8);
        assert_eq!(sphere.indices.len(), 12 * 8 * 6);
        assert_well_formed(&sphere);
        for v in &sphere.vertices {
            let len = Vec3::from(v.position).length();
            assert!((len - 0.3).abs() < 1e-5);
        }
    }

    #[test]
    fn cylinder_is_closed_and_bounded() {
        let cylinder = MeshData::cylinder(0.4, 0.2, 16);
        // side quads + two cap fans
        assert_eq!(cylinder.indices.len(), 16 * 6 + 2 * 16 * 3);
        assert_well_formed(&cylinder);
        for v in &cylinder.vertices {
            assert!(v.position[1].abs() <= 0.1 + 1e-6);
            let r = (v.position[0].powi(2) + v.position[2].powi(2)).sqrt();
            assert!(r <= 0.4 + 1e-5);
            assert!((Vec3::from(v.normal).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn plane_faces_up() {
        let plane = MeshData::plane();
        assert_well_formed(&plane);
        assert!(plane.vertices.iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
    }
}
