//! Notifications delivered to subscribers of an `OrbitalSystem`.

use serde::{Deserialize, Serialize};

use crate::effects::Explosion;
use crate::particle::ParticleId;

/// A resolved collision: one particle survives, the other is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactEvent {
    pub winner: ParticleId,
    pub loser: ParticleId,
    /// Approximate contact point (midpoint of the two bodies).
    pub point: [f32; 2],
    pub explosion: Explosion,
}

/// Messages emitted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrbitEvent {
    /// Fired once per resolved collision.
    Impact(ImpactEvent),
    /// Fired every `milestone_every` resolved collisions.
    Milestone { collisions: u64 },
    /// A particle was evicted by the validity sweep.
    Invalidated { id: ParticleId },
}

/// Handle returned by `OrbitalSystem::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

pub(crate) type Listener = Box<dyn FnMut(&OrbitEvent)>;
