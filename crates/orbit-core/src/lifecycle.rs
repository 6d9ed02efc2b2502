//! Particle lifecycle: spawning, removal and the periodic validity sweep.
//!
//! `ParticleManager` is the single writer of both the active-particle list and
//! the particle bodies in the physics world.

use std::collections::BTreeSet;
use std::f32::consts::TAU;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rapier2d::prelude::*;
use tracing::{debug, warn};

use crate::config::{OrbitConfig, OrbitalPath, ParticleMaterial};
use crate::particle::{Direction, Particle, ParticleId, speed_for_period};
use crate::physics::{PhysicsWorld, USER_DATA_PARTICLE, decode_user_data, encode_user_data};
use crate::track::{TrackConstraint, TrackStatus, rail_state};

/// Rejected spawn requests.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpawnError {
    #[error("unknown orbital path {index} (have {count})")]
    UnknownPath { index: usize, count: usize },
    #[error("particle size must be finite and positive, got {0}")]
    InvalidSize(f32),
    #[error("orbital period must be finite, got {0}")]
    InvalidPeriod(f32),
    #[error("orbital system has been shut down")]
    ShutDown,
}

/// Manages particle records and their bodies in the physics world.
#[derive(Debug)]
pub struct ParticleManager {
    particles: Vec<Particle>,
    paths: Vec<OrbitalPath>,
    constraint: TrackConstraint,
    config: OrbitConfig,
    last_id: Option<ParticleId>,
    rng: ChaCha8Rng,
}

impl ParticleManager {
    /// Creates a manager for the rails described by `config`.
    pub fn new(config: &OrbitConfig) -> Self {
        Self {
            particles: Vec::new(),
            paths: config.paths(),
            constraint: TrackConstraint::new(config),
            config: config.clone(),
            last_id: None,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        }
    }

    /// Spawns a particle at a random angle and direction on `path_index`.
    pub fn spawn(
        &mut self,
        world: &mut PhysicsWorld,
        path_index: usize,
        size: f32,
        period: f32,
    ) -> Result<ParticleId, SpawnError> {
        self.path(path_index)?;
        let angle = self.rng.random_range(0.0..TAU);
        let direction = if self.rng.random_bool(0.5) {
            Direction::Clockwise
        } else {
            Direction::CounterClockwise
        };
        self.spawn_placed(world, path_index, size, period, angle, direction)
    }

    /// Spawns a particle at an explicit angle and direction.
    pub fn spawn_placed(
        &mut self,
        world: &mut PhysicsWorld,
        path_index: usize,
        size: f32,
        period: f32,
        angle: f32,
        direction: Direction,
    ) -> Result<ParticleId, SpawnError> {
        let path = *self.path(path_index)?;
        if !size.is_finite() || size <= 0.0 {
            return Err(SpawnError::InvalidSize(size));
        }
        if !period.is_finite() {
            return Err(SpawnError::InvalidPeriod(period));
        }

        let id = self.next_id(world.current_frame());
        let target_speed = speed_for_period(&self.config, period);
        let radius = size * self.config.size_scale;
        let (position, velocity) = rail_state(&path, angle, target_speed * direction.sign());

        let (body_handle, collider_handle) = create_body(
            world,
            id,
            position,
            velocity,
            radius,
            &self.config.material,
        );

        self.particles.push(Particle::new(
            id,
            path_index,
            size,
            direction,
            target_speed,
            radius,
            body_handle,
            collider_handle,
            angle,
            velocity,
        ));

        debug!(
            "[lifecycle] Spawned {} on path {} (size {:.2}, speed {:.2}, {:?})",
            id, path_index, size, target_speed, direction
        );
        Ok(id)
    }

    /// Removes a particle and its body. Unknown ids are a no-op.
    pub fn remove(&mut self, world: &mut PhysicsWorld, id: ParticleId) -> bool {
        let Some(pos) = self.particles.iter().position(|p| p.id() == id) else {
            return false;
        };
        let particle = self.particles.remove(pos);
        world.remove_rigid_body(particle.body_handle());
        debug!("[lifecycle] Removed {}", id);
        true
    }

    /// Runs the rail constraint for every live particle.
    /// Returns the particles that needed repair this tick.
    pub fn enforce_tracks(&mut self, world: &mut PhysicsWorld) -> Vec<(ParticleId, TrackStatus)> {
        let mut repaired = Vec::new();
        for particle in &mut self.particles {
            let path = &self.paths[particle.path_index()];
            let Some(body) = world.get_rigid_body_mut(particle.body_handle()) else {
                continue;
            };
            let status = self.constraint.enforce(particle, path, body, &mut self.rng);
            if status != TrackStatus::OnTrack {
                debug!("[track] {} {:?}", particle.id(), status);
                repaired.push((particle.id(), status));
            }
        }
        repaired
    }

    /// Evicts particles whose engine state diverged: body missing, or position
    /// non-finite or beyond the configured bound. Orphan particle bodies with
    /// no record are dropped from the world as well.
    pub fn sweep(&mut self, world: &mut PhysicsWorld) -> Vec<ParticleId> {
        let bound = self.config.out_of_bounds;
        let invalid: Vec<ParticleId> = self
            .particles
            .iter()
            .filter(|particle| match world.get_rigid_body(particle.body_handle()) {
                None => true,
                Some(body) => {
                    let t = body.translation();
                    !position_in_bounds([t.x, t.y], bound)
                }
            })
            .map(Particle::id)
            .collect();

        for &id in &invalid {
            warn!("[sweep] Evicting invalid particle {}", id);
            self.remove(world, id);
        }

        let tracked: BTreeSet<_> = self
            .particles
            .iter()
            .map(|p| p.body_handle().into_raw_parts())
            .collect();
        let orphans: Vec<RigidBodyHandle> = world
            .rigid_body_set
            .iter()
            .filter(|(handle, body)| {
                decode_user_data(body.user_data).0 == USER_DATA_PARTICLE
                    && !tracked.contains(&handle.into_raw_parts())
            })
            .map(|(handle, _)| handle)
            .collect();
        for handle in orphans {
            warn!("[sweep] Dropping orphan particle body {:?}", handle);
            world.remove_rigid_body(handle);
        }

        invalid
    }

    /// Removes every particle.
    pub fn clear(&mut self, world: &mut PhysicsWorld) {
        for particle in self.particles.drain(..) {
            world.remove_rigid_body(particle.body_handle());
        }
    }

    pub fn path(&self, index: usize) -> Result<&OrbitalPath, SpawnError> {
        self.paths.get(index).ok_or(SpawnError::UnknownPath {
            index,
            count: self.paths.len(),
        })
    }

    pub fn paths(&self) -> &[OrbitalPath] {
        &self.paths
    }

    pub fn get(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.iter().find(|p| p.id() == id)
    }

    /// Gets a particle by its collider handle.
    pub fn get_by_collider(&self, handle: ColliderHandle) -> Option<&Particle> {
        self.particles.iter().find(|p| p.collider_handle() == handle)
    }

    /// Live particles in spawn order.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Distinct path indices that currently carry at least one particle.
    pub fn occupied_paths(&self) -> Vec<usize> {
        let set: BTreeSet<usize> = self.particles.iter().map(Particle::path_index).collect();
        set.into_iter().collect()
    }

    /// Committed engine position of a particle.
    pub fn position(&self, world: &PhysicsWorld, id: ParticleId) -> Option<[f32; 2]> {
        let particle = self.get(id)?;
        let body = world.get_rigid_body(particle.body_handle())?;
        let t = body.translation();
        Some([t.x, t.y])
    }

    pub fn constraint(&self) -> &TrackConstraint {
        &self.constraint
    }

    /// Frame-stamped id with a random tie-break, forced strictly increasing.
    fn next_id(&mut self, frame: u64) -> ParticleId {
        let candidate = ParticleId::compose(frame, self.rng.random());
        let id = match self.last_id {
            Some(last) if candidate <= last => ParticleId(last.0 + 1),
            _ => candidate,
        };
        self.last_id = Some(id);
        id
    }
}

fn position_in_bounds(position: [f32; 2], bound: f32) -> bool {
    position.iter().all(|v| v.is_finite() && v.abs() <= bound)
}

fn create_body(
    world: &mut PhysicsWorld,
    id: ParticleId,
    position: [f32; 2],
    velocity: [f32; 2],
    radius: f32,
    material: &ParticleMaterial,
) -> (RigidBodyHandle, ColliderHandle) {
    let dt = world.dt();
    let rigid_body = RigidBodyBuilder::dynamic()
        .translation(Vector::new(position[0], position[1]))
        .linvel(Vector::new(velocity[0] / dt, velocity[1] / dt))
        .linear_damping(material.linear_damping)
        .ccd_enabled(true)
        .user_data(encode_user_data(USER_DATA_PARTICLE, id.0))
        .build();
    let body_handle = world.add_rigid_body(rigid_body);

    let collider = ColliderBuilder::ball(radius)
        .restitution(material.restitution)
        .friction(material.friction)
        .density(material.density)
        .active_events(ActiveEvents::COLLISION_EVENTS)
        .build();
    let collider_handle = world.add_collider(collider, body_handle);

    (body_handle, collider_handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (PhysicsWorld, ParticleManager) {
        let config = OrbitConfig::default();
        (
            PhysicsWorld::with_dt(config.tick_dt()),
            ParticleManager::new(&config),
        )
    }

    #[test]
    fn test_spawn_places_particle_on_rail() {
        let (mut world, mut manager) = setup();
        let id = manager.spawn(&mut world, 2, 1.5, 10.0).unwrap();

        let particle = manager.get(id).unwrap();
        assert_eq!(particle.path_index(), 2);
        assert_eq!(particle.radius(), 12.0);
        assert!((particle.speed() - particle.target_speed()).abs() < 1e-4);

        let path = manager.paths()[2];
        let pos = manager.position(&world, id).unwrap();
        assert!((path.distance_from_center(pos) - path.radius).abs() < 1e-3);
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn test_spawn_rejects_bad_input() {
        let (mut world, mut manager) = setup();
        assert_eq!(
            manager.spawn(&mut world, 3, 1.0, 10.0),
            Err(SpawnError::UnknownPath { index: 3, count: 3 })
        );
        assert!(matches!(
            manager.spawn(&mut world, 0, 0.0, 10.0),
            Err(SpawnError::InvalidSize(_))
        ));
        assert!(matches!(
            manager.spawn(&mut world, 0, 1.0, f32::NAN),
            Err(SpawnError::InvalidPeriod(_))
        ));
        assert!(manager.is_empty());
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let (mut world, mut manager) = setup();
        let mut previous = None;
        for i in 0..50 {
            let id = manager.spawn(&mut world, i % 3, 1.0, 10.0).unwrap();
            if let Some(prev) = previous {
                assert!(id > prev);
            }
            previous = Some(id);
            if i % 7 == 0 {
                world.step();
            }
        }
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (mut world, mut manager) = setup();
        let keep = manager.spawn(&mut world, 0, 1.0, 10.0).unwrap();
        let gone = manager.spawn(&mut world, 1, 1.0, 10.0).unwrap();
        let keep_angle = manager.get(keep).unwrap().angle();

        assert!(manager.remove(&mut world, gone));
        assert!(!manager.remove(&mut world, gone));
        assert!(!manager.remove(&mut world, ParticleId(999_999)));

        assert_eq!(manager.len(), 1);
        assert_eq!(world.body_count(), 1);
        assert_eq!(manager.get(keep).unwrap().angle(), keep_angle);
    }

    #[test]
    fn test_spawn_remove_round_trip() {
        let (mut world, mut manager) = setup();
        manager.spawn(&mut world, 0, 1.0, 10.0).unwrap();
        let before = manager.len();
        let bodies_before = world.body_count();

        let id = manager.spawn(&mut world, 1, 1.0, 10.0).unwrap();
        let handle = manager.get(id).unwrap().body_handle();
        manager.remove(&mut world, id);

        assert_eq!(manager.len(), before);
        assert_eq!(world.body_count(), bodies_before);
        assert!(world.get_rigid_body(handle).is_none());
    }

    #[test]
    fn test_sweep_evicts_non_finite_and_out_of_bounds() {
        let (mut world, mut manager) = setup();
        let nan = manager.spawn(&mut world, 0, 1.0, 10.0).unwrap();
        let far = manager.spawn(&mut world, 1, 1.0, 10.0).unwrap();
        let fine = manager.spawn(&mut world, 2, 1.0, 10.0).unwrap();

        let nan_handle = manager.get(nan).unwrap().body_handle();
        let far_handle = manager.get(far).unwrap().body_handle();
        world
            .get_rigid_body_mut(nan_handle)
            .unwrap()
            .set_translation(Vector::new(f32::NAN, f32::NAN), false);
        world
            .get_rigid_body_mut(far_handle)
            .unwrap()
            .set_translation(Vector::new(50_000.0, 0.0), false);

        let evicted = manager.sweep(&mut world);
        assert_eq!(evicted, vec![nan, far]);
        assert_eq!(manager.len(), 1);
        assert!(manager.get(fine).is_some());
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn test_sweep_reconciles_missing_and_orphan_bodies() {
        let (mut world, mut manager) = setup();
        let lost = manager.spawn(&mut world, 0, 1.0, 10.0).unwrap();
        let kept = manager.spawn(&mut world, 1, 1.0, 10.0).unwrap();

        // Body vanished from the engine behind the manager's back.
        world.remove_rigid_body(manager.get(lost).unwrap().body_handle());
        // A particle-tagged body the manager never registered.
        let orphan = world.add_rigid_body(
            RigidBodyBuilder::dynamic()
                .user_data(encode_user_data(USER_DATA_PARTICLE, 77))
                .build(),
        );

        assert_eq!(manager.sweep(&mut world), vec![lost]);
        assert!(manager.get(kept).is_some());
        assert!(world.get_rigid_body(orphan).is_none());
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn test_enforce_tracks_repairs_lost_body() {
        let (mut world, mut manager) = setup();
        let id = manager.spawn(&mut world, 1, 1.0, 10.0).unwrap();
        let handle = manager.get(id).unwrap().body_handle();
        world
            .get_rigid_body_mut(handle)
            .unwrap()
            .set_translation(Vector::new(f32::NAN, f32::NAN), false);

        let repaired = manager.enforce_tracks(&mut world);
        assert_eq!(repaired, vec![(id, TrackStatus::Recovered)]);

        let path = manager.paths()[1];
        let pos = manager.position(&world, id).unwrap();
        assert!((path.distance_from_center(pos) - path.radius).abs() < 1e-3);
        assert!(manager.sweep(&mut world).is_empty());
    }

    #[test]
    fn test_occupied_paths_and_clear() {
        let (mut world, mut manager) = setup();
        manager.spawn(&mut world, 2, 1.0, 10.0).unwrap();
        manager.spawn(&mut world, 0, 1.0, 10.0).unwrap();
        manager.spawn(&mut world, 2, 1.0, 10.0).unwrap();
        assert_eq!(manager.occupied_paths(), vec![0, 2]);

        manager.clear(&mut world);
        assert!(manager.is_empty());
        assert_eq!(world.body_count(), 0);
        assert!(manager.occupied_paths().is_empty());
    }

    #[test]
    fn test_deterministic_spawning() {
        let (mut world1, mut manager1) = setup();
        let (mut world2, mut manager2) = setup();
        for i in 0..6 {
            let a = manager1.spawn(&mut world1, i % 3, 1.0, 9.0).unwrap();
            let b = manager2.spawn(&mut world2, i % 3, 1.0, 9.0).unwrap();
            assert_eq!(a, b);
            assert_eq!(manager1.position(&world1, a), manager2.position(&world2, b));
        }
    }
}
