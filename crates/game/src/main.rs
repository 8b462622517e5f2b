//! Arena Drive: an arcade vehicle combat demo.
//!
//! Drive a car around a walled arena, shoot at the target car, and watch the
//! chase camera keep up. Simulation runs on Rapier; rendering is a wgpu mirror.

mod arena;
mod chase_camera;
mod components;
mod config;
mod events;
mod projectiles;
mod sim;
mod update;
mod vehicle;

use anyhow::Result;
use engine_core::{Time, Vec3};
use input::InputState;
use renderer::{Camera, Renderer};
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::config::GameConfig;
use crate::sim::Simulation;

/// Everything that lives for as long as the window does.
struct GameState {
    renderer: Renderer,
    camera: Camera,
    input: InputState,
    time: Time,
    sim: Simulation,
    running: bool,
}

impl GameState {
    async fn new(window: Arc<Window>, config: &GameConfig) -> Result<Self> {
        let renderer = Renderer::new(window, config.vsync).await?;

        let camera_config = &config.sim.camera;
        let mut camera = Camera::new(Vec3::from(camera_config.initial_position));
        camera.fov_degrees = camera_config.fov_degrees;
        camera.set_aspect(renderer.size.width, renderer.size.height);
        camera.set_position_look_at(camera.position(), Vec3::ZERO);

        let sim = Simulation::new(&config.sim);
        log::info!(
            "Arena ready: {}x{} window, {} visuals, {} bodies",
            renderer.size.width,
            renderer.size.height,
            sim.scene.len(),
            sim.physics.body_count()
        );

        Ok(Self {
            renderer,
            camera,
            input: InputState::new(),
            time: Time::new(),
            sim,
            running: true,
        })
    }
}

/// Application handler for winit.
struct App {
    state: Option<GameState>,
}

impl App {
    fn new() -> Self {
        Self { state: None }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_none() {
            let config = GameConfig::load();
            let window_attrs = Window::default_attributes()
                .with_title("Arena Drive")
                .with_inner_size(winit::dpi::LogicalSize::new(config.window_width, config.window_height));

            let window = match event_loop.create_window(window_attrs) {
                Ok(w) => Arc::new(w),
                Err(e) => {
                    log::error!("Failed to create window: {}", e);
                    event_loop.exit();
                    return;
                }
            };

            let state = pollster::block_on(GameState::new(window.clone(), &config));
            match state {
                Ok(s) => {
                    self.state = Some(s);
                    window.request_redraw();
                }
                Err(e) => {
                    log::error!("Failed to initialize game: {}", e);
                    event_loop.exit();
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(state) = &mut self.state {
            if state.handle_window_event(event) || !state.running {
                event_loop.exit();
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting Arena Drive");
    log::info!("Controls: WASD/arrows drive, Space or left click fires, Escape quits");

    let event_loop = EventLoop::new()?;
    // Ticks are driven by redraw requests; poll so they come back to back.
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app)?;

    Ok(())
}
