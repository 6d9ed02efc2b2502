//! Rendering sampler: copies committed particle state into presentation
//! snapshots on its own cadence, independent of the physics tick.
//!
//! The sampler only ever holds shared references to the simulation, so it
//! cannot write back into the world.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::FixedTicker;
use crate::lifecycle::ParticleManager;
use crate::palette::{ColorPair, Theme, color_pair};
use crate::particle::ParticleId;
use crate::physics::PhysicsWorld;

/// Presentation-ready view of one particle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticleSnapshot {
    pub id: ParticleId,
    pub x: f32,
    pub y: f32,
    pub rotation_degrees: f32,
    pub size: f32,
    pub color_pair: ColorPair,
}

/// All live particles at one sampler firing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    /// Increments on every refresh.
    pub sequence: u64,
    pub particles: Vec<ParticleSnapshot>,
}

impl RenderFrame {
    /// Serialize to bytes using postcard.
    pub fn to_bytes(&self) -> Result<Vec<u8>, String> {
        postcard::to_allocvec(self).map_err(|e| e.to_string())
    }

    /// Deserialize from bytes using postcard.
    pub fn from_bytes(data: &[u8]) -> Result<Self, String> {
        postcard::from_bytes(data).map_err(|e| e.to_string())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn get(&self, id: ParticleId) -> Option<&ParticleSnapshot> {
        self.particles.iter().find(|p| p.id == id)
    }

    /// Topmost particle whose disc contains `point`. Later spawns draw on top.
    pub fn hit_test(&self, point: [f32; 2], size_scale: f32) -> Option<ParticleId> {
        self.particles
            .iter()
            .rev()
            .find(|p| {
                let radius = p.size * size_scale;
                let dx = point[0] - p.x;
                let dy = point[1] - p.y;
                dx * dx + dy * dy <= radius * radius
            })
            .map(|p| p.id)
    }
}

/// Fixed-rate reader of the simulation.
#[derive(Debug)]
pub struct RenderSampler {
    theme: Theme,
    ticker: FixedTicker,
    frame: RenderFrame,
}

impl RenderSampler {
    pub fn new(period: Duration, theme: Theme) -> Self {
        Self {
            theme,
            ticker: FixedTicker::with_catch_up(period, 1),
            frame: RenderFrame::default(),
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    /// Builds a fresh frame from committed state. Particles whose engine state
    /// is currently non-finite keep their entry from the last published frame,
    /// or are left out if they never had one.
    pub fn sample(&self, manager: &ParticleManager, world: &PhysicsWorld) -> RenderFrame {
        let previous: HashMap<ParticleId, &ParticleSnapshot> =
            self.frame.particles.iter().map(|p| (p.id, p)).collect();

        let particles = manager
            .particles()
            .iter()
            .filter_map(|particle| {
                let id = particle.id();
                let fresh = world.get_rigid_body(particle.body_handle()).and_then(|body| {
                    let t = body.translation();
                    let rotation_degrees = body.rotation().angle().to_degrees();
                    [t.x, t.y, rotation_degrees]
                        .iter()
                        .all(|v| v.is_finite())
                        .then_some(ParticleSnapshot {
                            id,
                            x: t.x,
                            y: t.y,
                            rotation_degrees,
                            size: particle.size(),
                            color_pair: color_pair(id, self.theme),
                        })
                });
                fresh.or_else(|| {
                    previous.get(&id).map(|&old| ParticleSnapshot {
                        color_pair: color_pair(id, self.theme),
                        ..*old
                    })
                })
            })
            .collect();

        RenderFrame {
            sequence: self.frame.sequence + 1,
            particles,
        }
    }

    /// Samples and publishes a new frame.
    pub fn refresh(&mut self, manager: &ParticleManager, world: &PhysicsWorld) -> &RenderFrame {
        self.frame = self.sample(manager, world);
        &self.frame
    }

    /// Feeds elapsed time; refreshes when a sampler period has completed.
    /// Returns whether a new frame was published.
    pub fn advance(
        &mut self,
        elapsed: Duration,
        manager: &ParticleManager,
        world: &PhysicsWorld,
    ) -> bool {
        if self.ticker.advance(elapsed) == 0 {
            return false;
        }
        self.refresh(manager, world);
        true
    }

    /// Last published frame.
    pub fn frame(&self) -> &RenderFrame {
        &self.frame
    }

    pub fn clear(&mut self) {
        self.frame.particles.clear();
        self.ticker.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrbitConfig;
    use rapier2d::prelude::Vector;

    fn setup() -> (OrbitConfig, PhysicsWorld, ParticleManager, RenderSampler) {
        let config = OrbitConfig::default();
        let world = PhysicsWorld::with_dt(config.tick_dt());
        let manager = ParticleManager::new(&config);
        let sampler = RenderSampler::new(config.sampler_period(), config.theme);
        (config, world, manager, sampler)
    }

    #[test]
    fn test_snapshot_matches_engine_state() {
        let (_, mut world, mut manager, mut sampler) = setup();
        let id = manager.spawn(&mut world, 0, 1.25, 10.0).unwrap();

        let frame = sampler.refresh(&manager, &world).clone();
        assert_eq!(frame.sequence, 1);
        assert_eq!(frame.particles.len(), 1);

        let snap = frame.get(id).unwrap();
        let pos = manager.position(&world, id).unwrap();
        assert_eq!([snap.x, snap.y], pos);
        assert_eq!(snap.size, 1.25);
        assert_eq!(snap.color_pair, color_pair(id, Theme::Vibrant));
    }

    #[test]
    fn test_sampling_does_not_touch_world() {
        let (_, mut world, mut manager, mut sampler) = setup();
        manager.spawn(&mut world, 0, 1.0, 10.0).unwrap();
        manager.spawn(&mut world, 2, 1.0, 12.0).unwrap();

        let before = world.compute_hash();
        for _ in 0..5 {
            sampler.refresh(&manager, &world);
        }
        assert_eq!(world.compute_hash(), before);
        assert_eq!(sampler.frame().sequence, 5);
    }

    #[test]
    fn test_non_finite_read_keeps_previous_snapshot() {
        let (_, mut world, mut manager, mut sampler) = setup();
        let seen = manager.spawn(&mut world, 0, 1.0, 10.0).unwrap();
        sampler.refresh(&manager, &world);
        let last_good = *sampler.frame().get(seen).unwrap();

        let unseen = manager.spawn(&mut world, 1, 1.0, 10.0).unwrap();
        for id in [seen, unseen] {
            let handle = manager.get(id).unwrap().body_handle();
            world
                .get_rigid_body_mut(handle)
                .unwrap()
                .set_translation(Vector::new(f32::NAN, 0.0), false);
        }

        let frame = sampler.refresh(&manager, &world);
        assert_eq!(frame.get(seen), Some(&last_good));
        assert!(frame.get(unseen).is_none());
    }

    #[test]
    fn test_advance_follows_sampler_rate() {
        let (_, mut world, mut manager, _) = setup();
        manager.spawn(&mut world, 0, 1.0, 10.0).unwrap();
        let mut sampler = RenderSampler::new(Duration::from_millis(50), Theme::Warm);

        assert!(!sampler.advance(Duration::from_millis(30), &manager, &world));
        assert!(sampler.advance(Duration::from_millis(30), &manager, &world));
        assert_eq!(sampler.frame().sequence, 1);
        // A long gap publishes a single frame, not a backlog.
        assert!(sampler.advance(Duration::from_secs(1), &manager, &world));
        assert_eq!(sampler.frame().sequence, 2);
    }

    #[test]
    fn test_theme_switch_recolours() {
        let (_, mut world, mut manager, mut sampler) = setup();
        let id = manager.spawn(&mut world, 0, 1.0, 10.0).unwrap();
        sampler.set_theme(Theme::Warm);
        let frame = sampler.refresh(&manager, &world);
        assert_eq!(frame.get(id).unwrap().color_pair, color_pair(id, Theme::Warm));
    }

    #[test]
    fn test_hit_test_and_encoding() {
        let (config, mut world, mut manager, mut sampler) = setup();
        let id = manager.spawn(&mut world, 1, 2.0, 10.0).unwrap();
        let frame = sampler.refresh(&manager, &world).clone();
        let snap = frame.get(id).unwrap();

        assert_eq!(frame.hit_test([snap.x + 10.0, snap.y], config.size_scale), Some(id));
        assert_eq!(frame.hit_test([snap.x + 17.0, snap.y], config.size_scale), None);

        let bytes = frame.to_bytes().unwrap();
        assert_eq!(RenderFrame::from_bytes(&bytes).unwrap(), frame);

        let json = frame.to_json().unwrap();
        assert!(json.contains("\"rotationDegrees\""));
        assert!(json.contains("\"colorPair\""));
    }
}
