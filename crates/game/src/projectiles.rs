//! Projectile lifecycle: spawn on fire, mirror to visuals, expire by range, resolve hits.

use crate::arena::PROJECTILE_COLOR;
use crate::components::{Projectile, Vehicle};
use crate::config::ProjectileConfig;
use engine_core::{Quat, Transform, Vec3};
use hecs::{Entity, World};
use physics::{BodyDesc, BodyShape, CollisionGroup, PhysicsWorld};
use renderer::{MeshKind, Scene};

/// Slack for fixed-step decrements that land a hair above zero.
const COOLDOWN_EPSILON: f32 = 1e-4;

/// An impulse delivered to a vehicle this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub projectile: Entity,
    pub target: Entity,
    pub impulse: Vec3,
}

/// What one [`ProjectileManager::tick`] did.
#[derive(Debug, Clone, Default)]
pub struct ProjectileReport {
    pub expired: usize,
    pub hits: Vec<Hit>,
}

enum Outcome {
    Expired,
    Hit { target: Entity, impulse: Vec3, point: Vec3 },
}

pub struct ProjectileManager {
    config: ProjectileConfig,
    /// Seconds until the next fire is allowed.
    cooldown: f32,
    /// Simulation time, advanced by `tick`.
    clock: f32,
}

impl ProjectileManager {
    pub fn new(config: ProjectileConfig) -> Self {
        Self {
            config,
            cooldown: 0.0,
            clock: 0.0,
        }
    }

    pub fn can_fire(&self) -> bool {
        self.cooldown <= COOLDOWN_EPSILON
    }

    pub fn live_count(world: &World) -> usize {
        world.query::<&Projectile>().iter().count()
    }

    /// Fire from `shooter`'s nose. Returns false when rate limited, when the live
    /// cap is reached, or when the shooter has no body.
    pub fn fire(
        &mut self,
        world: &mut World,
        physics: &mut PhysicsWorld,
        scene: &mut Scene,
        shooter: Entity,
    ) -> bool {
        if !self.can_fire() {
            return false;
        }
        if Self::live_count(world) >= self.config.max_live_projectiles {
            log::warn!(
                "Fire rejected: {} projectiles already live",
                self.config.max_live_projectiles
            );
            return false;
        }

        let Some(origin) = world
            .get::<&Vehicle>(shooter)
            .ok()
            .and_then(|vehicle| physics.get_body_transform(vehicle.body.rigid_body))
        else {
            return false;
        };

        let forward = origin.forward();
        let position = origin.position + forward * self.config.spawn_offset;
        let desc = BodyDesc::new(BodyShape::Ball { radius: self.config.radius }, self.config.mass)
            .at(position, Quat::IDENTITY)
            .with_velocity(forward * self.config.speed)
            .with_gravity_scale(self.config.gravity_scale)
            .in_group(CollisionGroup::Projectile)
            .with_ccd(true);
        let body = physics.add_body(&desc);
        let visual = scene.spawn_single(
            Transform::from_position(position),
            MeshKind::Sphere,
            Vec3::splat(self.config.radius),
            PROJECTILE_COLOR,
        );

        let entity = world.spawn((Projectile {
            owner: shooter,
            body,
            visual,
            spawned_at: self.clock,
        },));
        self.cooldown = self.config.cooldown_secs;
        log::debug!("Projectile {:?} fired from {:?} at {:?}", entity, shooter, position);
        true
    }

    /// Advance timers, mirror projectiles to their visuals, then expire or resolve hits.
    ///
    /// Expiry is checked before hits, so a projectile beyond range never pushes anything.
    /// Every removal happens after the pass over the live set.
    pub fn tick(
        &mut self,
        dt: f32,
        world: &mut World,
        physics: &mut PhysicsWorld,
        scene: &mut Scene,
    ) -> ProjectileReport {
        self.clock += dt;
        self.cooldown = (self.cooldown - dt).max(0.0);

        let vehicles: Vec<(Entity, Vec3)> = world
            .query::<&Vehicle>()
            .iter()
            .filter_map(|(entity, vehicle)| {
                physics
                    .get_body_transform(vehicle.body.rigid_body)
                    .map(|t| (entity, t.position))
            })
            .collect();

        let mut outcomes = Vec::new();
        for (entity, projectile) in world.query::<&Projectile>().iter() {
            let Some(transform) = physics.get_body_transform(projectile.body.rigid_body) else {
                outcomes.push((entity, Outcome::Expired));
                continue;
            };
            if !transform.is_finite() {
                log::warn!("Projectile {:?} has a non-finite transform, expiring it", entity);
                outcomes.push((entity, Outcome::Expired));
                continue;
            }
            scene.sync_transform(projectile.visual, transform.position, transform.rotation);
            let position = transform.position;

            // A projectile whose shooter is gone has nothing to measure range from.
            let owner_position = vehicles
                .iter()
                .find(|(vehicle, _)| *vehicle == projectile.owner)
                .map(|(_, p)| *p);
            let Some(owner_position) = owner_position else {
                outcomes.push((entity, Outcome::Expired));
                continue;
            };
            if position.distance(owner_position) > self.config.max_range {
                outcomes.push((entity, Outcome::Expired));
                continue;
            }

            let target = vehicles
                .iter()
                .filter(|(vehicle, _)| *vehicle != projectile.owner)
                .map(|(vehicle, p)| (*vehicle, *p, p.distance(position)))
                .filter(|(_, _, d)| *d < self.config.hit_distance)
                .min_by(|a, b| a.2.total_cmp(&b.2));
            if let Some((target, target_position, _)) = target {
                let direction = (target_position - position).normalize_or_zero();
                outcomes.push((
                    entity,
                    Outcome::Hit {
                        target,
                        impulse: direction * self.config.impulse,
                        point: target_position,
                    },
                ));
            }
        }

        let mut report = ProjectileReport::default();
        for (entity, outcome) in outcomes {
            match outcome {
                Outcome::Expired => {
                    report.expired += 1;
                    log::debug!("Projectile {:?} expired", entity);
                }
                Outcome::Hit { target, impulse, point } => {
                    if let Ok(vehicle) = world.get::<&Vehicle>(target) {
                        physics.apply_impulse_at_point(vehicle.body.rigid_body, impulse, point);
                    }
                    log::debug!("Projectile {:?} hit {:?}", entity, target);
                    report.hits.push(Hit {
                        projectile: entity,
                        target,
                        impulse,
                    });
                }
            }
            self.remove(world, physics, scene, entity);
        }
        report
    }

    /// Unregister the body, drop the visual and despawn the entity.
    fn remove(
        &self,
        world: &mut World,
        physics: &mut PhysicsWorld,
        scene: &mut Scene,
        entity: Entity,
    ) {
        let Ok(projectile) = world.get::<&Projectile>(entity).map(|p| *p) else {
            return;
        };
        if physics.contains(projectile.body.rigid_body) {
            physics.remove_body(projectile.body.rigid_body);
        }
        scene.despawn(projectile.visual);
        world.despawn(entity).ok();
        log::trace!(
            "Projectile {:?} removed after {:.2}s",
            entity,
            self.clock - projectile.spawned_at
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{spawn_vehicle, PLAYER_COLOR, TARGET_COLOR};
    use crate::config::VehicleConfig;

    struct Fixture {
        world: World,
        physics: PhysicsWorld,
        scene: Scene,
        shooter: Entity,
        target: Entity,
    }

    impl Fixture {
        /// Shooter at the origin facing -Z; target `target_z` further along -Z.
        fn new(target_z: f32) -> Self {
            let mut world = World::new();
            let mut physics = PhysicsWorld::default();
            let mut scene = Scene::new();
            physics.add_ground_plane();
            let vehicle = VehicleConfig::default();
            let a = spawn_vehicle(
                &mut physics,
                &mut scene,
                &vehicle,
                Vec3::new(0.0, 0.25, 0.0),
                PLAYER_COLOR,
            );
            let b = spawn_vehicle(
                &mut physics,
                &mut scene,
                &vehicle,
                Vec3::new(0.0, 0.25, target_z),
                TARGET_COLOR,
            );
            let shooter = world.spawn((a,));
            let target = world.spawn((b,));
            // Mass properties are computed on the first step.
            physics.step(1.0 / 60.0);
            Self {
                world,
                physics,
                scene,
                shooter,
                target,
            }
        }

        /// Add another vehicle after the settling step. Its body keeps zero velocity
        /// until something pushes it.
        fn add_vehicle(&mut self, position: Vec3) -> Entity {
            let vehicle = spawn_vehicle(
                &mut self.physics,
                &mut self.scene,
                &VehicleConfig::default(),
                position,
                TARGET_COLOR,
            );
            self.world.spawn((vehicle,))
        }

        fn fire(&mut self, manager: &mut ProjectileManager) -> bool {
            manager.fire(&mut self.world, &mut self.physics, &mut self.scene, self.shooter)
        }

        fn tick(&mut self, manager: &mut ProjectileManager, dt: f32) -> ProjectileReport {
            manager.tick(dt, &mut self.world, &mut self.physics, &mut self.scene)
        }

        fn body(&self, entity: Entity) -> physics::RigidBodyHandle {
            self.world.get::<&Vehicle>(entity).unwrap().body.rigid_body
        }

        fn only_projectile(&self) -> Projectile {
            let mut query = self.world.query::<&Projectile>();
            let all: Vec<Projectile> = query.iter().map(|(_, p)| *p).collect();
            assert_eq!(all.len(), 1);
            all[0]
        }
    }

    fn manager() -> ProjectileManager {
        ProjectileManager::new(ProjectileConfig::default())
    }

    #[test]
    fn spawns_ahead_of_shooter_with_muzzle_velocity() {
        let mut fx = Fixture::new(-40.0);
        let mut pm = manager();
        assert!(fx.fire(&mut pm));

        let projectile = fx.only_projectile();
        assert_eq!(projectile.owner, fx.shooter);
        let shooter = fx.physics.get_body_transform(fx.body(fx.shooter)).unwrap();
        let spawned = fx.physics.get_body_transform(projectile.body.rigid_body).unwrap();
        let expected = shooter.position + shooter.forward() * 3.0;
        assert!((spawned.position - expected).length() < 1e-4);

        let v = fx.physics.linear_velocity(projectile.body.rigid_body).unwrap();
        assert!((v - shooter.forward() * 50.0).length() < 1e-3, "v = {:?}", v);
        assert!(fx.scene.contains(projectile.visual));
    }

    #[test]
    fn fires_within_cooldown_are_ignored() {
        let mut fx = Fixture::new(-40.0);
        let mut pm = manager();
        assert!(fx.fire(&mut pm));
        assert!(!fx.fire(&mut pm));
        fx.tick(&mut pm, 0.75);
        assert!(!fx.fire(&mut pm));
        assert_eq!(ProjectileManager::live_count(&fx.world), 1);

        fx.tick(&mut pm, 0.75);
        assert!(fx.fire(&mut pm));
        assert_eq!(ProjectileManager::live_count(&fx.world), 2);
    }

    #[test]
    fn fixed_steps_reopen_fire_after_cooldown() {
        let mut fx = Fixture::new(-40.0);
        let mut pm = manager();
        assert!(fx.fire(&mut pm));
        for _ in 0..89 {
            fx.tick(&mut pm, 1.0 / 60.0);
            assert!(!pm.can_fire());
        }
        fx.tick(&mut pm, 1.0 / 60.0);
        assert!(pm.can_fire());
    }

    #[test]
    fn live_cap_limits_fire() {
        let mut fx = Fixture::new(-40.0);
        let mut pm = ProjectileManager::new(ProjectileConfig {
            cooldown_secs: 0.0,
            max_live_projectiles: 2,
            ..Default::default()
        });
        assert!(fx.fire(&mut pm));
        assert!(fx.fire(&mut pm));
        assert!(!fx.fire(&mut pm));
        assert_eq!(ProjectileManager::live_count(&fx.world), 2);
    }

    #[test]
    fn visual_follows_body() {
        let mut fx = Fixture::new(-40.0);
        let mut pm = manager();
        fx.fire(&mut pm);
        for _ in 0..5 {
            fx.physics.step(1.0 / 60.0);
        }
        fx.tick(&mut pm, 1.0 / 60.0);

        let projectile = fx.only_projectile();
        let body = fx.physics.get_body_transform(projectile.body.rigid_body).unwrap();
        let visual = fx.scene.get(projectile.visual).unwrap();
        assert_eq!(visual.transform.position, body.position);
    }

    #[test]
    fn out_of_range_projectile_is_removed() {
        let mut fx = Fixture::new(-40.0);
        let mut pm = manager();
        fx.fire(&mut pm);
        let projectile = fx.only_projectile();
        let shooter = fx.body(fx.shooter);
        fx.physics.set_body_pose(shooter, Vec3::new(0.0, 0.25, 200.0), Quat::IDENTITY);

        let report = fx.tick(&mut pm, 1.0 / 60.0);
        assert_eq!(report.expired, 1);
        assert!(report.hits.is_empty());
        assert_eq!(ProjectileManager::live_count(&fx.world), 0);
        assert!(!fx.physics.contains(projectile.body.rigid_body));
        assert!(!fx.scene.contains(projectile.visual));
        assert!(!fx.scene.sync_transform(projectile.visual, Vec3::ZERO, Quat::IDENTITY));

        // Nothing left to do on later ticks.
        let report = fx.tick(&mut pm, 1.0 / 60.0);
        assert_eq!(report.expired, 0);
    }

    #[test]
    fn hit_pushes_target_once_and_removes_projectile() {
        // Projectile spawns at z = -3, 1.5 from the target's centre.
        let mut fx = Fixture::new(-4.5);
        let mut pm = manager();
        fx.fire(&mut pm);
        let projectile = fx.only_projectile();
        let target = fx.body(fx.target);
        let before = fx.physics.linear_velocity(target).unwrap();

        let report = fx.tick(&mut pm, 1.0 / 60.0);
        assert_eq!(report.expired, 0);
        assert_eq!(report.hits.len(), 1);
        assert_eq!(report.hits[0].target, fx.target);
        assert!((report.hits[0].impulse.length() - 400.0).abs() < 1e-2);
        assert!(report.hits[0].impulse.z < -399.0);

        let after = fx.physics.linear_velocity(target).unwrap();
        // 400 N·s on 150 kg
        assert!((after.z - before.z + 400.0 / 150.0).abs() < 0.05, "before {:?} after {:?}", before, after);
        assert_eq!(ProjectileManager::live_count(&fx.world), 0);
        assert!(!fx.physics.contains(projectile.body.rigid_body));
        assert!(!fx.scene.contains(projectile.visual));

        let again = fx.tick(&mut pm, 1.0 / 60.0);
        assert!(again.hits.is_empty());
    }

    #[test]
    fn shooter_is_never_its_own_target() {
        let mut fx = Fixture::new(-40.0);
        let mut pm = ProjectileManager::new(ProjectileConfig {
            spawn_offset: 0.5,
            ..Default::default()
        });
        fx.fire(&mut pm);
        let report = fx.tick(&mut pm, 1.0 / 60.0);
        assert!(report.hits.is_empty());
        assert_eq!(ProjectileManager::live_count(&fx.world), 1);
    }

    #[test]
    fn expiry_takes_precedence_over_hit() {
        let mut fx = Fixture::new(-4.5);
        let mut pm = manager();
        fx.fire(&mut pm);
        let target = fx.body(fx.target);
        let before = fx.physics.linear_velocity(target).unwrap();
        let shooter = fx.body(fx.shooter);
        fx.physics.set_body_pose(shooter, Vec3::new(0.0, 0.25, 200.0), Quat::IDENTITY);

        let report = fx.tick(&mut pm, 1.0 / 60.0);
        assert_eq!(report.expired, 1);
        assert!(report.hits.is_empty());
        assert_eq!(fx.physics.linear_velocity(target).unwrap(), before);
        assert_eq!(ProjectileManager::live_count(&fx.world), 0);
    }

    #[test]
    fn projectile_of_removed_shooter_expires() {
        let mut fx = Fixture::new(-40.0);
        let mut pm = manager();
        fx.fire(&mut pm);
        let shooter = fx.shooter;
        fx.world.despawn(shooter).unwrap();

        let report = fx.tick(&mut pm, 1.0 / 60.0);
        assert_eq!(report.expired, 1);
        assert_eq!(ProjectileManager::live_count(&fx.world), 0);
    }

    #[test]
    fn only_nearest_vehicle_in_range_is_pushed() {
        // Projectile spawns near (0, y, -3): the target is 1.5 away, the bystander about 1.7.
        let mut fx = Fixture::new(-4.5);
        let bystander = fx.add_vehicle(Vec3::new(1.6, 0.25, -3.6));
        let mut pm = manager();
        fx.fire(&mut pm);
        let projectile = fx.only_projectile();

        let target_body = fx.body(fx.target);
        let bystander_body = fx.body(bystander);
        let target_before = fx.physics.linear_velocity(target_body).unwrap();
        let bystander_before = fx.physics.linear_velocity(bystander_body).unwrap();

        let report = fx.tick(&mut pm, 1.0 / 60.0);
        assert_eq!(report.hits.len(), 1);
        assert_eq!(report.hits[0].target, fx.target);
        assert_ne!(fx.physics.linear_velocity(target_body).unwrap(), target_before);
        assert_eq!(fx.physics.linear_velocity(bystander_body).unwrap(), bystander_before);
        assert_eq!(ProjectileManager::live_count(&fx.world), 0);
        assert!(!fx.physics.contains(projectile.body.rigid_body));
    }

    #[test]
    fn non_finite_projectile_is_reclaimed() {
        let mut fx = Fixture::new(-40.0);
        let mut pm = manager();
        fx.fire(&mut pm);
        let projectile = fx.only_projectile();
        fx.physics.set_body_pose(
            projectile.body.rigid_body,
            Vec3::new(f32::NAN, 0.0, 0.0),
            Quat::IDENTITY,
        );

        let report = fx.tick(&mut pm, 1.0 / 60.0);
        assert_eq!(report.expired, 1);
        assert!(report.hits.is_empty());
        assert_eq!(ProjectileManager::live_count(&fx.world), 0);
        assert!(!fx.physics.contains(projectile.body.rigid_body));
        assert!(!fx.scene.contains(projectile.visual));
    }
}
