//! Momentum arbitration between two colliding particles.

use crate::particle::{Particle, ParticleId};

/// The state of a particle that matters to arbitration, frozen at collision time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contender {
    pub id: ParticleId,
    pub size: f32,
    pub velocity: [f32; 2],
}

impl Contender {
    /// `size² * |velocity|`. A degenerate (zero or non-finite) speed counts as 1.
    pub fn momentum(&self) -> f32 {
        let speed = self.velocity[0].hypot(self.velocity[1]);
        let speed = if speed.is_finite() && speed > 0.0 { speed } else { 1.0 };
        self.size * self.size * speed
    }
}

impl From<&Particle> for Contender {
    fn from(particle: &Particle) -> Self {
        Self {
            id: particle.id(),
            size: particle.size(),
            velocity: particle.velocity(),
        }
    }
}

/// Outcome of a collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub winner: ParticleId,
    pub loser: ParticleId,
}

/// Picks the surviving particle. Ties go to `a`.
pub fn arbitrate(a: &Contender, b: &Contender) -> Verdict {
    if a.momentum() >= b.momentum() {
        Verdict {
            winner: a.id,
            loser: b.id,
        }
    } else {
        Verdict {
            winner: b.id,
            loser: a.id,
        }
    }
}
