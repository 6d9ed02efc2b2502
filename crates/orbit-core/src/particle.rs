//! Particle records and the values fixed at spawn time.

use std::f32::consts::TAU;
use std::fmt;

use rapier2d::prelude::{ColliderHandle, RigidBodyHandle};
use serde::{Deserialize, Serialize};

use crate::config::OrbitConfig;

/// Unique, strictly increasing particle identifier.
///
/// The high bits carry the physics frame the particle was spawned on, the low
/// [`ParticleId::TIE_BREAK_BITS`] bits a random tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticleId(pub u64);

impl ParticleId {
    pub const TIE_BREAK_BITS: u32 = 12;

    /// Builds a candidate id from a frame number and a random tie-break.
    pub fn compose(frame: u64, tie_break: u16) -> Self {
        let mask = (1_u64 << Self::TIE_BREAK_BITS) - 1;
        Self((frame << Self::TIE_BREAK_BITS) | (u64::from(tie_break) & mask))
    }

    /// Frame component of the id.
    pub fn frame(self) -> u64 {
        self.0 >> Self::TIE_BREAK_BITS
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Orbital rotation sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Increasing angle (`+1`).
    Clockwise,
    /// Decreasing angle (`-1`).
    CounterClockwise,
}

impl Direction {
    pub fn sign(self) -> f32 {
        match self {
            Self::Clockwise => 1.0,
            Self::CounterClockwise => -1.0,
        }
    }
}

/// Maps a requested orbital period (seconds) to a rail speed (px/tick).
///
/// Shorter periods are faster; the result is clamped to
/// `[min_speed, max_speed]`.
pub fn speed_for_period(config: &OrbitConfig, period: f32) -> f32 {
    let span = config.slowest_period - config.fastest_period;
    let t = ((config.slowest_period - period) / span).clamp(0.0, 1.0);
    config.min_speed + t * (config.max_speed - config.min_speed)
}

/// Authoritative record of a live particle.
///
/// Spawn-time values are private and only readable, so they cannot change
/// once the particle exists.
#[derive(Debug, Clone)]
pub struct Particle {
    id: ParticleId,
    path_index: usize,
    size: f32,
    direction: Direction,
    target_speed: f32,
    radius: f32,
    body_handle: RigidBodyHandle,
    collider_handle: ColliderHandle,
    /// Position on the rail in radians, kept in `[0, 2π)`.
    pub(crate) angle: f32,
    /// Last committed velocity, px/tick.
    pub(crate) velocity: [f32; 2],
}

impl Particle {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: ParticleId,
        path_index: usize,
        size: f32,
        direction: Direction,
        target_speed: f32,
        radius: f32,
        body_handle: RigidBodyHandle,
        collider_handle: ColliderHandle,
        angle: f32,
        velocity: [f32; 2],
    ) -> Self {
        Self {
            id,
            path_index,
            size,
            direction,
            target_speed,
            radius,
            body_handle,
            collider_handle,
            angle: normalize_angle(angle),
            velocity,
        }
    }

    pub fn id(&self) -> ParticleId {
        self.id
    }

    pub fn path_index(&self) -> usize {
        self.path_index
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    /// Mass proxy used by collision arbitration.
    pub fn mass(&self) -> f32 {
        self.size * self.size
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn target_speed(&self) -> f32 {
        self.target_speed
    }

    /// Collider radius in pixels.
    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn body_handle(&self) -> RigidBodyHandle {
        self.body_handle
    }

    pub fn collider_handle(&self) -> ColliderHandle {
        self.collider_handle
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn velocity(&self) -> [f32; 2] {
        self.velocity
    }

    pub fn speed(&self) -> f32 {
        self.velocity[0].hypot(self.velocity[1])
    }

    /// Signed tangential speed along the rail.
    pub fn signed_speed(&self) -> f32 {
        self.target_speed * self.direction.sign()
    }
}

/// Wraps an angle into `[0, 2π)`.
pub fn normalize_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= TAU { 0.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_mapping_endpoints() {
        let config = OrbitConfig::default();
        assert!((speed_for_period(&config, 8.0) - 2.0).abs() < 1e-6);
        assert!((speed_for_period(&config, 15.0) - 0.5).abs() < 1e-6);
        // Clamped outside the configured period range.
        assert!((speed_for_period(&config, 1.0) - 2.0).abs() < 1e-6);
        assert!((speed_for_period(&config, 60.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_speed_mapping_is_monotonic() {
        let config = OrbitConfig::default();
        let mut previous = f32::INFINITY;
        for tenth in 70..=160 {
            #[allow(clippy::cast_precision_loss)]
            let period = tenth as f32 / 10.0;
            let speed = speed_for_period(&config, period);
            assert!(speed <= previous, "speed rose at period {period}");
            assert!((config.min_speed..=config.max_speed).contains(&speed));
            previous = speed;
        }
    }

    #[test]
    fn test_id_composition() {
        let a = ParticleId::compose(10, 4095);
        let b = ParticleId::compose(11, 0);
        assert!(a < b);
        assert_eq!(a.frame(), 10);
        assert_eq!(b.frame(), 11);
        // Tie-break bits beyond the mask never bleed into the frame.
        assert_eq!(ParticleId::compose(3, u16::MAX).frame(), 3);
    }

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(-0.5) - (TAU - 0.5)).abs() < 1e-5);
        assert!((normalize_angle(TAU + 1.0) - 1.0).abs() < 1e-5);
        let tiny = normalize_angle(-1e-9);
        assert!((0.0..TAU).contains(&tiny));
    }
}
