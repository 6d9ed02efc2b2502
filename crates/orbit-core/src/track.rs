//! Rail constraint: keeps every particle on its circle at its fixed speed.
//!
//! Runs after each engine step and replaces the integrated pose with the next
//! point on the particle's rail, so contact impulses never accumulate into
//! drift. Invalid engine state is repaired in place before the update.

use std::f32::consts::TAU;

use rand::Rng;
use rapier2d::prelude::{RigidBody, Vector};

use crate::config::{OrbitConfig, OrbitalPath};
use crate::particle::{Particle, normalize_angle};

/// What the constraint had to do for a particle this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    /// Advanced one step along the rail.
    OnTrack,
    /// Position was lost (centre, non-finite or out of bounds); re-seated at a random angle.
    Recovered,
    /// Engine velocity ran away; snapped back to the rail at the current angle.
    Clamped,
}

/// Canonical rail pose for `angle` moving at `signed_speed` px/tick.
pub fn rail_state(path: &OrbitalPath, angle: f32, signed_speed: f32) -> ([f32; 2], [f32; 2]) {
    let (sin, cos) = angle.sin_cos();
    let position = [
        path.center[0] + path.radius * cos,
        path.center[1] + path.radius * sin,
    ];
    let velocity = [-sin * signed_speed, cos * signed_speed];
    (position, velocity)
}

/// Per-tick rail enforcement, parameterised once from the config.
#[derive(Debug, Clone)]
pub struct TrackConstraint {
    out_of_bounds: f32,
    lost_distance: f32,
    speed_ceiling: f32,
    dt: f32,
}

impl TrackConstraint {
    pub fn new(config: &OrbitConfig) -> Self {
        Self {
            out_of_bounds: config.out_of_bounds,
            lost_distance: config.lost_distance,
            speed_ceiling: config.speed_ceiling,
            dt: config.tick_dt(),
        }
    }

    /// Whether `position` can no longer be trusted.
    pub fn is_lost(&self, path: &OrbitalPath, position: [f32; 2]) -> bool {
        if !position[0].is_finite() || !position[1].is_finite() {
            return true;
        }
        if position[0].abs() > self.out_of_bounds || position[1].abs() > self.out_of_bounds {
            return true;
        }
        let distance = path.distance_from_center(position);
        !distance.is_finite() || distance < self.lost_distance
    }

    /// Whether an engine velocity (px/s) is unusable.
    fn is_runaway(&self, engine_velocity: [f32; 2]) -> bool {
        let speed = engine_velocity[0].hypot(engine_velocity[1]) * self.dt;
        !speed.is_finite() || speed > self.speed_ceiling
    }

    /// Applies the rail update to one particle and its engine body.
    pub fn enforce(
        &self,
        particle: &mut Particle,
        path: &OrbitalPath,
        body: &mut RigidBody,
        rng: &mut impl Rng,
    ) -> TrackStatus {
        let translation = body.translation();
        let position = [translation.x, translation.y];
        let linvel = body.linvel();
        let engine_velocity = [linvel.x, linvel.y];

        let (status, angle) = if self.is_lost(path, position) {
            (TrackStatus::Recovered, rng.random_range(0.0..TAU))
        } else if self.is_runaway(engine_velocity) {
            (TrackStatus::Clamped, particle.angle)
        } else {
            let step = particle.signed_speed() / path.radius;
            (TrackStatus::OnTrack, particle.angle + step)
        };

        let angle = normalize_angle(angle);
        let (position, velocity) = rail_state(path, angle, particle.signed_speed());
        particle.angle = angle;
        particle.velocity = velocity;
        self.commit(body, position, velocity);
        status
    }

    /// Writes a rail pose into the engine body. The engine works in px/s.
    pub(crate) fn commit(&self, body: &mut RigidBody, position: [f32; 2], velocity: [f32; 2]) {
        body.set_translation(Vector::new(position[0], position[1]), true);
        body.set_linvel(
            Vector::new(velocity[0] / self.dt, velocity[1] / self.dt),
            true,
        );
    }

    /// Engine velocity of `body` expressed in px/tick.
    pub fn engine_velocity(&self, body: &RigidBody) -> [f32; 2] {
        let linvel = body.linvel();
        [linvel.x * self.dt, linvel.y * self.dt]
    }
}
