//! Main renderer managing wgpu state and drawing the scene mirror.

use crate::{
    camera::{Camera, CameraUniform},
    mesh::{Mesh, MeshData},
    pipeline::{create_camera_bind_group_layout, create_scene_pipeline},
    scene::{MeshKind, Scene},
    texture::Texture,
    vertex::InstanceData,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use wgpu::util::DeviceExt;
use winit::window::Window;

/// Initial instance buffer capacity; grows on demand.
const INITIAL_MAX_INSTANCES: u32 = 1024;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.53,
    g: 0.71,
    b: 0.87,
    a: 1.0,
};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to open GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

impl RenderError {
    /// True when rendering cannot continue. A timed-out frame is just skipped.
    pub fn is_fatal(&self) -> bool {
        match self {
            RenderError::Surface(e) => matches!(e, wgpu::SurfaceError::OutOfMemory),
            _ => true,
        }
    }
}

/// Main renderer state.
pub struct Renderer {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    pub window: Arc<Window>,

    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    camera_uniform: CameraUniform,
    depth_texture: Texture,

    meshes: HashMap<MeshKind, Mesh>,
    instance_buffer: wgpu::Buffer,
    max_instances: u32,
}

impl Renderer {
    /// Create a new renderer for the given window.
    pub async fn new(window: Arc<Window>, vsync: bool) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        log::info!("Using GPU: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let present_mode = if vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let camera_uniform = CameraUniform::new();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout = create_camera_bind_group_layout(&device);
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let pipeline = create_scene_pipeline(&device, config.format, &camera_bind_group_layout);
        let depth_texture =
            Texture::create_depth_texture(&device, config.width, config.height, "Depth Texture");

        let meshes = MeshKind::ALL
            .iter()
            .map(|&kind| (kind, mesh_data_for(kind).upload(&device)))
            .collect();

        let instance_buffer = create_instance_buffer(&device, INITIAL_MAX_INSTANCES);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            window,
            pipeline,
            camera_buffer,
            camera_bind_group,
            camera_uniform,
            depth_texture,
            meshes,
            instance_buffer,
            max_instances: INITIAL_MAX_INSTANCES,
        })
    }

    /// Handle window resize.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = Texture::create_depth_texture(
                &self.device,
                self.config.width,
                self.config.height,
                "Depth Texture",
            );
        }
    }

    /// Update camera uniform.
    pub fn update_camera(&mut self, camera: &Camera) {
        self.camera_uniform.update(camera);
        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
    }

    /// Draw every visual in the scene. A lost or outdated surface is
    /// reconfigured and the frame is skipped.
    pub fn render(&mut self, scene: &Scene) -> Result<(), RenderError> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.resize(self.size);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let batches = scene.batches();
        let total: usize = batches.iter().map(|(_, instances)| instances.len()).sum();
        self.ensure_instance_capacity(total as u32);

        // Upload all instances once; each batch draws its own range.
        let mut ranges = Vec::with_capacity(batches.len());
        let mut offset = 0u32;
        for (kind, instances) in &batches {
            let byte_offset = offset as u64 * std::mem::size_of::<InstanceData>() as u64;
            self.queue
                .write_buffer(&self.instance_buffer, byte_offset, bytemuck::cast_slice(instances));
            let count = instances.len() as u32;
            ranges.push((*kind, offset..offset + count));
            offset += count;
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.camera_bind_group, &[]);
            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));

            for (kind, range) in ranges {
                let Some(mesh) = self.meshes.get(&kind) else {
                    continue;
                };
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.num_indices, 0, range);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn ensure_instance_capacity(&mut self, needed: u32) {
        if needed <= self.max_instances {
            return;
        }
        let capacity = needed.next_power_of_two();
        log::debug!("Growing instance buffer {} -> {}", self.max_instances, capacity);
        self.instance_buffer = create_instance_buffer(&self.device, capacity);
        self.max_instances = capacity;
    }
}

fn create_instance_buffer(device: &wgpu::Device, capacity: u32) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: capacity as u64 * std::mem::size_of::<InstanceData>() as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Unit-sized geometry; visuals scale it per part.
fn mesh_data_for(kind: MeshKind) -> MeshData {
    match kind {
        MeshKind::Cube => MeshData::cube(),
        MeshKind::Sphere => MeshData::sphere(1.0, 16, 12),
        MeshKind::Cylinder => MeshData::cylinder(1.0, 1.0, 20),
        MeshKind::Plane => MeshData::plane(),
    }
}
