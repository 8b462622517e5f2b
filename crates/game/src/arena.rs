//! Static arena and vehicle construction.

use crate::components::{PlayerControlled, Vehicle};
use crate::config::{ArenaConfig, SimConfig, VehicleConfig};
use engine_core::{Quat, Transform, Vec3};
use hecs::{Entity, World};
use physics::{BodyDesc, BodyShape, CollisionGroup, PhysicsWorld};
use renderer::{MeshKind, Scene, VisualPart};

pub const GROUND_COLOR: [f32; 4] = [0.67, 0.67, 0.67, 1.0];
pub const WALL_COLOR: [f32; 4] = [0.45, 0.42, 0.4, 1.0];
pub const PLAYER_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
pub const TARGET_COLOR: [f32; 4] = [0.1, 0.3, 1.0, 1.0];
pub const WHEEL_COLOR: [f32; 4] = [0.2, 0.2, 0.2, 1.0];
pub const PROJECTILE_COLOR: [f32; 4] = [1.0, 0.9, 0.1, 1.0];

const WHEEL_RADIUS: f32 = 0.4;
const WHEEL_WIDTH: f32 = 0.2;
/// Wheel centres sit slightly below the body centre.
const WHEEL_DROP: f32 = 0.1;
/// Inset of the wheel centres from the body's side and end faces.
const WHEEL_INSET_X: f32 = 0.2;
const WHEEL_INSET_Z: f32 = 0.5;

/// Entities created by [`build`].
#[derive(Debug, Clone, Copy)]
pub struct Arena {
    pub player: Entity,
    pub target: Entity,
}

/// Populate the world with ground, walls, the player vehicle and one passive target.
pub fn build(
    world: &mut World,
    physics: &mut PhysicsWorld,
    scene: &mut Scene,
    config: &SimConfig,
) -> Arena {
    build_ground(physics, scene, &config.arena);
    build_walls(physics, scene, &config.arena);

    let player_vehicle = spawn_vehicle(
        physics,
        scene,
        &config.vehicle,
        Vec3::from(config.vehicle.player_spawn),
        PLAYER_COLOR,
    );
    let player = world.spawn((player_vehicle, PlayerControlled));

    let target_vehicle = spawn_vehicle(
        physics,
        scene,
        &config.vehicle,
        Vec3::from(config.vehicle.target_spawn),
        TARGET_COLOR,
    );
    let target = world.spawn((target_vehicle,));

    log::debug!(
        "Arena built: {} bodies, {} colliders, {} visuals",
        physics.body_count(),
        physics.collider_set.len(),
        scene.len()
    );

    Arena { player, target }
}

fn build_ground(physics: &mut PhysicsWorld, scene: &mut Scene, config: &ArenaConfig) {
    physics.add_ground_plane();
    scene.spawn_single(
        Transform::default(),
        MeshKind::Plane,
        Vec3::new(config.ground_size, 1.0, config.ground_size),
        GROUND_COLOR,
    );
}

/// Four static walls enclosing the ground square.
fn build_walls(physics: &mut PhysicsWorld, scene: &mut Scene, config: &ArenaConfig) {
    let half = config.ground_size / 2.0;
    let t = config.wall_thickness;
    let y = config.wall_height / 2.0;
    let along_x = Vec3::new(half + t, y, t / 2.0);
    let along_z = Vec3::new(t / 2.0, y, half + t);

    let walls = [
        (Vec3::new(0.0, y, -(half + t / 2.0)), along_x),
        (Vec3::new(0.0, y, half + t / 2.0), along_x),
        (Vec3::new(-(half + t / 2.0), y, 0.0), along_z),
        (Vec3::new(half + t / 2.0, y, 0.0), along_z),
    ];

    for (center, half_extents) in walls {
        physics.add_static_cuboid(center, 0.0, half_extents);
        scene.spawn_single(Transform::from_position(center), MeshKind::Cube, half_extents * 2.0, WALL_COLOR);
    }
}

/// One box body with a body-plus-four-wheels visual.
pub fn spawn_vehicle(
    physics: &mut PhysicsWorld,
    scene: &mut Scene,
    config: &VehicleConfig,
    position: Vec3,
    color: [f32; 4],
) -> Vehicle {
    let half_extents = config.half_extents();
    let desc = BodyDesc::new(BodyShape::Cuboid { half_extents }, config.mass)
        .at(position, Quat::IDENTITY)
        .with_damping(config.linear_damping, config.angular_damping)
        .with_center_of_mass(Vec3::new(0.0, -config.center_of_mass_drop, 0.0))
        .in_group(CollisionGroup::Vehicle);
    let body = physics.add_body(&desc);

    let visual = scene.spawn(Transform::from_position(position), vehicle_parts(half_extents, color));
    Vehicle { body, visual }
}

fn vehicle_parts(half_extents: Vec3, color: [f32; 4]) -> Vec<VisualPart> {
    let mut parts = vec![VisualPart::new(
        MeshKind::Cube,
        Transform::default().with_scale(half_extents * 2.0),
        color,
    )];

    // Cylinder axis along the car's X axis.
    let wheel_rotation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
    let wheel_scale = Vec3::new(WHEEL_RADIUS, WHEEL_WIDTH, WHEEL_RADIUS);
    let x = half_extents.x - WHEEL_INSET_X;
    let z = half_extents.z - WHEEL_INSET_Z;
    for (sx, sz) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
        let local = Transform::from_position_rotation(Vec3::new(sx * x, -WHEEL_DROP, sz * z), wheel_rotation)
            .with_scale(wheel_scale);
        parts.push(VisualPart::new(MeshKind::Cylinder, local, WHEEL_COLOR));
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn built() -> (World, PhysicsWorld, Scene, Arena) {
        let config = SimConfig::default();
        let mut world = World::new();
        let mut physics = PhysicsWorld::new(config.physics.gravity);
        let mut scene = Scene::new();
        let arena = build(&mut world, &mut physics, &mut scene, &config);
        (world, physics, scene, arena)
    }

    #[test]
    fn builds_ground_walls_and_two_vehicles() {
        let (world, physics, scene, arena) = built();
        // ground + 4 walls + 2 vehicles
        assert_eq!(scene.len(), 7);
        assert_eq!(physics.body_count(), 2);
        // ground half-space + 4 walls + 2 vehicle boxes
        assert_eq!(physics.collider_set.len(), 7);

        assert!(world.get::<&PlayerControlled>(arena.player).is_ok());
        assert!(world.get::<&PlayerControlled>(arena.target).is_err());
        assert_eq!(world.query::<&Vehicle>().iter().count(), 2);
    }

    #[test]
    fn vehicle_matches_car_layout() {
        let (world, _physics, scene, arena) = built();
        let vehicle = *world.get::<&Vehicle>(arena.player).unwrap();
        let visual = scene.get(vehicle.visual).unwrap();
        assert_eq!(visual.parts.len(), 5);
        assert_eq!(visual.parts[0].local.scale, Vec3::new(2.0, 0.5, 4.0));
        assert_eq!(visual.parts[0].color, PLAYER_COLOR);

        let has_wheel_at = |expected: Vec3| {
            visual.parts[1..]
                .iter()
                .any(|p| p.mesh == MeshKind::Cylinder && (p.local.position - expected).length() < 1e-5)
        };
        assert!(has_wheel_at(Vec3::new(0.8, -WHEEL_DROP, 1.5)));
        assert!(has_wheel_at(Vec3::new(-0.8, -WHEEL_DROP, -1.5)));
    }

    #[test]
    fn vehicle_center_of_mass_sits_below_box_center() {
        let (world, mut physics, _scene, arena) = built();
        physics.step(1.0 / 60.0);
        let vehicle = *world.get::<&Vehicle>(arena.target).unwrap();
        let body = vehicle.body.rigid_body;
        let center = physics.get_body_transform(body).unwrap().position;
        let com = physics.center_of_mass(body).unwrap();
        assert!((center.y - com.y - 0.5).abs() < 1e-3, "center {:?} com {:?}", center, com);
    }

    #[test]
    fn walls_enclose_ground() {
        let (_world, mut physics, mut scene, _arena) = built();
        let config = SimConfig::default();
        // A vehicle driven into the east wall stops at it.
        let vehicle = spawn_vehicle(&mut physics, &mut scene, &config.vehicle, Vec3::new(45.0, 0.5, 0.0), PLAYER_COLOR);
        let body = vehicle.body.rigid_body;
        for _ in 0..300 {
            physics.set_linear_velocity(body, Vec3::new(20.0, 0.0, 0.0));
            physics.step(1.0 / 60.0);
        }
        let x = physics.get_body_transform(body).unwrap().position.x;
        assert!(x < 49.5, "x = {}", x);
    }
}
