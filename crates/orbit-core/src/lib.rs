//! Orbit Core Library
//!
//! Deterministic 2D particle simulation on concentric circular rails, built on
//! `Rapier2D`. Particles are kept on their rail and at their target speed every
//! tick, collisions are settled by a momentum rule that removes the loser, and
//! a periodic sweep evicts particles whose engine state diverged.
//!
//! [`OrbitalSystem`] is the entry point for hosts.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod arbiter;
pub mod autoplay;
pub mod clock;
pub mod config;
pub mod effects;
pub mod events;
pub mod lifecycle;
pub mod palette;
pub mod particle;
pub mod physics;
pub mod sampler;
pub mod system;
pub mod track;

pub use arbiter::{Contender, Verdict, arbitrate};
pub use autoplay::{AutoSeeder, ScheduledClick, SeedPlan, SpawnRequest};
pub use clock::FixedTicker;
pub use config::{ConfigError, OrbitConfig, OrbitalPath, ParticleMaterial};
pub use effects::{Explosion, Shard};
pub use events::{ImpactEvent, ListenerId, OrbitEvent};
pub use lifecycle::{ParticleManager, SpawnError};
pub use palette::{Color, ColorPair, Theme, color_pair};
pub use particle::{Direction, Particle, ParticleId};
pub use physics::{PHYSICS_DT, PhysicsWorld};
pub use sampler::{ParticleSnapshot, RenderFrame, RenderSampler};
pub use system::{OrbitalSystem, TickReport};
pub use track::{TrackConstraint, TrackStatus};
