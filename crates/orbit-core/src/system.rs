//! `OrbitalSystem`: the explicit interface a host drives.
//!
//! One tick is: engine step (integration and overlap detection), rail
//! constraint for every particle, arbitration of that step's collisions, and
//! the validity sweep when its interval has elapsed. The render frame is
//! refreshed on a separate cadence.

use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rapier2d::prelude::*;
use tracing::{debug, info};

use crate::arbiter::{Contender, Verdict, arbitrate};
use crate::autoplay::SpawnRequest;
use crate::clock::FixedTicker;
use crate::config::{ConfigError, OrbitConfig, OrbitalPath};
use crate::effects::Explosion;
use crate::events::{ImpactEvent, Listener, ListenerId, OrbitEvent};
use crate::lifecycle::{ParticleManager, SpawnError};
use crate::palette::{Theme, color_pair};
use crate::particle::{Particle, ParticleId};
use crate::physics::{PhysicsWorld, USER_DATA_HUB, encode_user_data};
use crate::sampler::{RenderFrame, RenderSampler};

/// Stream offset so effect randomness never shifts spawn randomness.
const EFFECTS_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub frame: u64,
    pub collisions: Vec<Verdict>,
    /// Particles the rail constraint had to repair.
    pub repaired: usize,
    /// Particles evicted by the validity sweep.
    pub invalidated: Vec<ParticleId>,
}

pub struct OrbitalSystem {
    config: OrbitConfig,
    world: PhysicsWorld,
    manager: ParticleManager,
    sampler: RenderSampler,
    physics_clock: FixedTicker,
    sweep_every: u64,
    ticks_since_sweep: u64,
    rng: ChaCha8Rng,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    collisions: u64,
    running: bool,
}

impl std::fmt::Debug for OrbitalSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrbitalSystem")
            .field("world", &self.world)
            .field("particles", &self.manager.len())
            .field("listeners", &self.listeners.len())
            .field("collisions", &self.collisions)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl OrbitalSystem {
    /// Validates `config`, creates the engine world and the centre hub.
    pub fn new(config: OrbitConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut world = PhysicsWorld::with_dt(config.tick_dt());
        if config.hub_radius > 0.0 {
            let hub = RigidBodyBuilder::fixed()
                .translation(Vector::new(config.center[0], config.center[1]))
                .user_data(encode_user_data(USER_DATA_HUB, 0))
                .build();
            let handle = world.add_rigid_body(hub);
            world.add_collider(ColliderBuilder::ball(config.hub_radius).build(), handle);
        }

        let sweep_every = (config.sweep_interval_ms * u64::from(config.tick_hz))
            .div_ceil(1000)
            .max(1);

        info!(
            "[orbit] Started with {} paths, {} Hz physics, {} Hz sampler, sweep every {} ticks",
            config.path_radii.len(),
            config.tick_hz,
            config.sampler_hz,
            sweep_every
        );

        Ok(Self {
            manager: ParticleManager::new(&config),
            sampler: RenderSampler::new(config.sampler_period(), config.theme),
            physics_clock: FixedTicker::new(config.tick_period()),
            sweep_every,
            ticks_since_sweep: 0,
            rng: ChaCha8Rng::seed_from_u64(config.seed ^ EFFECTS_STREAM),
            listeners: Vec::new(),
            next_listener: 0,
            collisions: 0,
            running: true,
            world,
            config,
        })
    }

    /// Spawns a particle on `path_index`; `period` (seconds) sets its speed.
    pub fn spawn_particle(
        &mut self,
        path_index: usize,
        size: f32,
        period: f32,
    ) -> Result<ParticleId, SpawnError> {
        if !self.running {
            return Err(SpawnError::ShutDown);
        }
        self.manager.spawn(&mut self.world, path_index, size, period)
    }

    /// Handles a pointer click: nearest rail (sometimes an occupied one),
    /// random size and period.
    pub fn spawn_at_point(&mut self, point: [f32; 2]) -> Result<ParticleId, SpawnError> {
        let occupied = self.manager.occupied_paths();
        let request = SpawnRequest::for_click(&self.config, point, &occupied, &mut self.rng);
        self.spawn_request(request)
    }

    pub fn spawn_request(&mut self, request: SpawnRequest) -> Result<ParticleId, SpawnError> {
        self.spawn_particle(request.path_index, request.size, request.period)
    }

    /// Removes a particle. Unknown or already removed ids are ignored.
    pub fn remove_particle(&mut self, id: ParticleId) -> bool {
        self.manager.remove(&mut self.world, id)
    }

    /// Removes every particle.
    pub fn clear_particles(&mut self) {
        self.manager.clear(&mut self.world);
    }

    /// Registers a notification callback.
    pub fn subscribe(&mut self, listener: impl FnMut(&OrbitEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Runs one fixed physics tick.
    pub fn tick(&mut self) -> TickReport {
        if !self.running {
            return TickReport::default();
        }

        let events = self.world.step_with_events();
        let repaired = self.manager.enforce_tracks(&mut self.world).len();
        let collisions = self.resolve_collisions(&events);

        self.ticks_since_sweep += 1;
        let invalidated = if self.ticks_since_sweep >= self.sweep_every {
            self.ticks_since_sweep = 0;
            let evicted = self.manager.sweep(&mut self.world);
            for &id in &evicted {
                self.emit(&OrbitEvent::Invalidated { id });
            }
            evicted
        } else {
            Vec::new()
        };

        TickReport {
            frame: self.world.current_frame(),
            collisions,
            repaired,
            invalidated,
        }
    }

    /// Feeds elapsed host time: runs every physics tick that became due, then
    /// refreshes the render frame if a sampler period completed.
    /// Returns the number of physics ticks run.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        if !self.running {
            return 0;
        }
        let due = self.physics_clock.advance(elapsed);
        for _ in 0..due {
            self.tick();
        }
        self.sampler.advance(elapsed, &self.manager, &self.world);
        due
    }

    /// Samples committed state and publishes it as the latest frame.
    pub fn refresh_frame(&mut self) -> &RenderFrame {
        self.sampler.refresh(&self.manager, &self.world)
    }

    /// Samples committed state without publishing it.
    pub fn pull_snapshot(&self) -> RenderFrame {
        self.sampler.sample(&self.manager, &self.world)
    }

    /// Frame published at the sampler's last firing.
    pub fn latest_frame(&self) -> &RenderFrame {
        self.sampler.frame()
    }

    /// Particle drawn at `point` in the latest frame.
    pub fn particle_at(&self, point: [f32; 2]) -> Option<ParticleId> {
        self.sampler.frame().hit_test(point, self.config.size_scale)
    }

    pub fn nearest_path(&self, point: [f32; 2]) -> usize {
        self.config.nearest_path(point)
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.sampler.set_theme(theme);
    }

    pub fn theme(&self) -> Theme {
        self.sampler.theme()
    }

    /// Collisions resolved since construction.
    pub fn collision_count(&self) -> u64 {
        self.collisions
    }

    pub fn particles(&self) -> &[Particle] {
        self.manager.particles()
    }

    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.manager.get(id)
    }

    pub fn particle_count(&self) -> usize {
        self.manager.len()
    }

    /// Committed engine position of a particle.
    pub fn position(&self, id: ParticleId) -> Option<[f32; 2]> {
        self.manager.position(&self.world, id)
    }

    pub fn paths(&self) -> &[OrbitalPath] {
        self.manager.paths()
    }

    pub fn config(&self) -> &OrbitConfig {
        &self.config
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    /// Deterministic hash of the engine state.
    pub fn state_hash(&self) -> u64 {
        self.world.compute_hash()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stops ticking and releases all engine state and listeners. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        let frames = self.world.current_frame();
        self.manager.clear(&mut self.world);
        self.world.reset();
        self.sampler.clear();
        self.physics_clock.reset();
        self.listeners.clear();
        info!(
            "[orbit] Shut down after {} frames, {} collisions",
            frames, self.collisions
        );
    }

    fn resolve_collisions(&mut self, events: &[CollisionEvent]) -> Vec<Verdict> {
        let mut verdicts = Vec::new();

        for event in events {
            let CollisionEvent::Started(h1, h2, _) = *event else {
                continue;
            };
            let (Some(a), Some(b)) = (
                self.manager.get_by_collider(h1).map(Contender::from),
                self.manager.get_by_collider(h2).map(Contender::from),
            ) else {
                continue;
            };
            if a.id == b.id {
                continue;
            }

            let verdict = arbitrate(&a, &b);
            let point = match (
                self.manager.position(&self.world, a.id),
                self.manager.position(&self.world, b.id),
            ) {
                (Some(pa), Some(pb)) => [(pa[0] + pb[0]) / 2.0, (pa[1] + pb[1]) / 2.0],
                (Some(p), None) | (None, Some(p)) => p,
                (None, None) => self.config.center,
            };

            self.manager.remove(&mut self.world, verdict.loser);
            self.collisions += 1;

            let colors = color_pair(verdict.winner, self.sampler.theme());
            let explosion = Explosion::new(point, colors, &mut self.rng);
            debug!(
                "[arbiter] {} beat {} at ({:.1}, {:.1})",
                verdict.winner, verdict.loser, point[0], point[1]
            );

            self.emit(&OrbitEvent::Impact(ImpactEvent {
                winner: verdict.winner,
                loser: verdict.loser,
                point,
                explosion,
            }));

            let every = u64::from(self.config.milestone_every);
            if every > 0 && self.collisions % every == 0 {
                info!("[orbit] {} collisions", self.collisions);
                self.emit(&OrbitEvent::Milestone {
                    collisions: self.collisions,
                });
            }

            verdicts.push(verdict);
        }

        verdicts
    }

    fn emit(&mut self, event: &OrbitEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

impl Drop for OrbitalSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}
