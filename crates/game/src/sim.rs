//! One fixed-step simulation tick over the ECS world, the physics world and the scene mirror.

use crate::arena::{self, Arena};
use crate::chase_camera::ChaseCamera;
use crate::components::{PlayerControlled, Vehicle};
use crate::config::SimConfig;
use crate::projectiles::{ProjectileManager, ProjectileReport};
use crate::vehicle::VehicleController;
use engine_core::Transform;
use hecs::{Entity, World};
use input::InputSnapshot;
use physics::{PhysicsWorld, RigidBodyHandle};
use renderer::{Scene, VisualId};

pub struct Simulation {
    pub world: World,
    pub physics: PhysicsWorld,
    pub scene: Scene,
    pub chase_camera: ChaseCamera,
    controller: VehicleController,
    projectiles: ProjectileManager,
    arena: Arena,
    timestep: f32,
    ticks: u64,
}

impl Simulation {
    pub fn new(config: &SimConfig) -> Self {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new(config.physics.gravity);
        let mut scene = Scene::new();
        let arena = arena::build(&mut world, &mut physics, &mut scene, config);
        log::info!("Arena ready: player {:?}, target {:?}", arena.player, arena.target);

        Self {
            world,
            physics,
            scene,
            chase_camera: ChaseCamera::new(&config.camera),
            controller: VehicleController::new(config.drive.clone()),
            projectiles: ProjectileManager::new(config.projectile.clone()),
            arena,
            timestep: config.physics.timestep,
            ticks: 0,
        }
    }

    /// Run one tick in order: drive the player, handle the fire request, step the
    /// world, advance projectiles, move the chase camera, then mirror vehicles.
    pub fn tick(&mut self, input: &InputSnapshot) -> ProjectileReport {
        if let Some(player) = self.player() {
            if let Some(body) = self.vehicle_body(player) {
                self.controller.apply(input, &mut self.physics, body);
            }
            if input.fire {
                self.projectiles
                    .fire(&mut self.world, &mut self.physics, &mut self.scene, player);
            }
        }

        self.physics.step(self.timestep);

        let report = self
            .projectiles
            .tick(self.timestep, &mut self.world, &mut self.physics, &mut self.scene);

        if let Some(tracked) = self.player_transform().filter(Transform::is_finite) {
            self.chase_camera.update(&tracked);
        }

        self.sync_vehicles();
        self.ticks += 1;
        report
    }

    /// The vehicle carrying the [`PlayerControlled`] marker, if any.
    pub fn player(&self) -> Option<Entity> {
        self.world
            .query::<&PlayerControlled>()
            .iter()
            .next()
            .map(|(entity, _)| entity)
    }

    pub fn target(&self) -> Entity {
        self.arena.target
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn player_transform(&self) -> Option<Transform> {
        self.player()
            .and_then(|player| self.vehicle_body(player))
            .and_then(|body| self.physics.get_body_transform(body))
    }

    pub fn vehicle_body(&self, entity: Entity) -> Option<RigidBodyHandle> {
        self.world
            .get::<&Vehicle>(entity)
            .ok()
            .map(|vehicle| vehicle.body.rigid_body)
    }

    fn sync_vehicles(&mut self) {
        for (entity, vehicle) in self.world.query::<&Vehicle>().iter() {
            if let Some(transform) = self.physics.get_body_transform(vehicle.body.rigid_body) {
                if !sync_visual(&mut self.scene, vehicle.visual, &transform) {
                    log::warn!(
                        "Vehicle {:?} has a non-finite transform, skipping render sync",
                        entity
                    );
                }
            }
        }
    }
}

/// Mirror a body transform onto its visual. Non-finite transforms are left out.
fn sync_visual(scene: &mut Scene, visual: VisualId, transform: &Transform) -> bool {
    if !transform.is_finite() {
        return false;
    }
    scene.sync_transform(visual, transform.position, transform.rotation);
    true
}
