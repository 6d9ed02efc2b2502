//! Explosion effect descriptors handed to the presentation layer on impact.

use std::f32::consts::TAU;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::palette::{Color, ColorPair};

pub const SHARD_COUNT: usize = 8;
pub const BURST_DIAMETER: f32 = 40.0;
pub const BURST_SCALE: f32 = 3.0;
pub const BURST_DURATION: Duration = Duration::from_millis(600);
pub const SHARD_DIAMETER: f32 = 6.0;
pub const SHARD_DURATION: Duration = Duration::from_millis(1000);
const SHARD_MIN_DISTANCE: f32 = 30.0;
const SHARD_DISTANCE_JITTER: f32 = 20.0;

/// One fragment flying out of the burst.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shard {
    /// Final offset from the burst centre, px.
    pub end_x: f32,
    pub end_y: f32,
    pub color: Color,
}

/// Radial burst at a collision point, painted with the winner's colours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explosion {
    pub x: f32,
    pub y: f32,
    pub colors: ColorPair,
    pub diameter: f32,
    pub scale: f32,
    pub duration_ms: u64,
    pub shard_diameter: f32,
    pub shard_duration_ms: u64,
    pub shards: Vec<Shard>,
}

impl Explosion {
    /// Builds a burst with [`SHARD_COUNT`] evenly spaced shards at jittered distances.
    pub fn new(point: [f32; 2], colors: ColorPair, rng: &mut impl Rng) -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let angle = i as f32 / SHARD_COUNT as f32 * TAU;
                let distance = SHARD_MIN_DISTANCE + rng.random::<f32>() * SHARD_DISTANCE_JITTER;
                let color = if rng.random_bool(0.5) {
                    colors.start
                } else {
                    colors.end
                };
                Shard {
                    end_x: angle.cos() * distance,
                    end_y: angle.sin() * distance,
                    color,
                }
            })
            .collect();

        Self {
            x: point[0],
            y: point[1],
            colors,
            diameter: BURST_DIAMETER,
            scale: BURST_SCALE,
            duration_ms: millis(BURST_DURATION),
            shard_diameter: SHARD_DIAMETER,
            shard_duration_ms: millis(SHARD_DURATION),
            shards,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{Theme, color_pair};
    use crate::particle::ParticleId;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_explosion_shards() {
        let colors = color_pair(ParticleId(3), Theme::Vibrant);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let explosion = Explosion::new([120.0, 80.0], colors, &mut rng);

        assert_eq!(explosion.x, 120.0);
        assert_eq!(explosion.y, 80.0);
        assert_eq!(explosion.shards.len(), SHARD_COUNT);
        assert_eq!(explosion.duration_ms, 600);
        for shard in &explosion.shards {
            let distance = shard.end_x.hypot(shard.end_y);
            assert!((30.0 - 1e-3..=50.0 + 1e-3).contains(&distance));
            assert!(shard.color == colors.start || shard.color == colors.end);
        }
        // First shard points along +x.
        assert!(explosion.shards[0].end_y.abs() < 1e-3);
        assert!(explosion.shards[0].end_x > 0.0);
    }

    #[test]
    fn test_explosion_json_uses_camel_case() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let explosion = Explosion::new([0.0, 0.0], color_pair(ParticleId(0), Theme::Warm), &mut rng);
        let json = serde_json::to_string(&explosion).unwrap();
        assert!(json.contains("\"durationMs\":600"));
        assert!(json.contains("\"endX\""));
    }
}
