//! Click targeting and automatic seeding of the rails.
//!
//! A click spawns on the rail nearest to the pointer, but sometimes jumps to
//! a rail that already carries particles so collisions happen more often.
//! `AutoSeeder` replays a burst of synthetic clicks shortly after start-up so
//! the visual is never empty.

use std::collections::VecDeque;
use std::f32::consts::TAU;
use std::ops::{Range, RangeInclusive};
use std::time::Duration;

use rand::prelude::*;

use crate::config::OrbitConfig;

/// Size range for click spawns.
pub const CLICK_SIZE: Range<f32> = 0.5..2.0;
/// Period range (seconds) for click spawns.
pub const CLICK_PERIOD: Range<f32> = 8.0..13.0;
/// Probability of re-targeting a click onto an occupied rail.
pub const RETARGET_CHANCE: f64 = 0.3;

/// Parameters for one spawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRequest {
    pub path_index: usize,
    pub size: f32,
    pub period: f32,
}

impl SpawnRequest {
    /// Random size and period on `path_index`.
    pub fn random(path_index: usize, rng: &mut impl Rng) -> Self {
        Self {
            path_index,
            size: rng.random_range(CLICK_SIZE),
            period: rng.random_range(CLICK_PERIOD),
        }
    }

    /// Resolves a click at `point` into a spawn request.
    pub fn for_click(
        config: &OrbitConfig,
        point: [f32; 2],
        occupied: &[usize],
        rng: &mut impl Rng,
    ) -> Self {
        let nearest = config.nearest_path(point);
        let path_index = choose_target_path(nearest, occupied, rng);
        Self::random(path_index, rng)
    }
}

/// Returns `nearest`, or with [`RETARGET_CHANCE`] one of the `occupied` rails.
pub fn choose_target_path(nearest: usize, occupied: &[usize], rng: &mut impl Rng) -> usize {
    if occupied.is_empty() || !rng.random_bool(RETARGET_CHANCE) {
        return nearest;
    }
    occupied.choose(rng).copied().unwrap_or(nearest)
}

/// A synthetic click due at `at` after the seeder started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledClick {
    pub at: Duration,
    pub path_index: usize,
    pub point: [f32; 2],
}

/// Timing of the start-up burst.
#[derive(Debug, Clone)]
pub struct SeedPlan {
    pub initial_delay: Duration,
    pub per_path: RangeInclusive<usize>,
    pub interval: Duration,
    /// Total jitter width applied around `interval`.
    pub jitter: Duration,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(3),
            per_path: 3..=5,
            interval: Duration::from_millis(800),
            jitter: Duration::from_millis(400),
        }
    }
}

/// Replays a pre-computed click schedule against elapsed time.
#[derive(Debug, Clone)]
pub struct AutoSeeder {
    pending: VecDeque<ScheduledClick>,
    elapsed: Duration,
}

impl AutoSeeder {
    /// Plans clicks for every rail in shuffled order, one batch per rail.
    pub fn new(config: &OrbitConfig, plan: &SeedPlan, rng: &mut impl Rng) -> Self {
        let per_path = rng.random_range(plan.per_path.clone());
        let mut paths: Vec<usize> = (0..config.path_radii.len()).collect();
        paths.shuffle(rng);

        let mut at = plan.initial_delay;
        let mut pending = VecDeque::new();
        for path_index in paths {
            let radius = config.path_radii[path_index];
            for _ in 0..per_path {
                let angle = rng.random_range(0.0..TAU);
                let (sin, cos) = angle.sin_cos();
                pending.push_back(ScheduledClick {
                    at,
                    path_index,
                    point: [
                        config.center[0] + radius * cos,
                        config.center[1] + radius * sin,
                    ],
                });
                at += jittered(plan, rng);
            }
        }

        Self {
            pending,
            elapsed: Duration::ZERO,
        }
    }

    /// Advances the seeder clock and returns clicks that became due.
    pub fn due(&mut self, elapsed: Duration) -> Vec<ScheduledClick> {
        self.elapsed += elapsed;
        let mut ready = Vec::new();
        while self.pending.front().is_some_and(|c| c.at <= self.elapsed) {
            if let Some(click) = self.pending.pop_front() {
                ready.push(click);
            }
        }
        ready
    }

    /// Time until the next click, if any remain.
    pub fn next_in(&self) -> Option<Duration> {
        self.pending
            .front()
            .map(|c| c.at.saturating_sub(self.elapsed))
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }
}

fn jittered(plan: &SeedPlan, rng: &mut impl Rng) -> Duration {
    let offset = plan.jitter.mul_f64(rng.random::<f64>());
    (plan.interval + offset).saturating_sub(plan.jitter / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_random_request_ranges() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..200 {
            let request = SpawnRequest::random(1, &mut rng);
            assert_eq!(request.path_index, 1);
            assert!(CLICK_SIZE.contains(&request.size));
            assert!(CLICK_PERIOD.contains(&request.period));
        }
    }

    #[test]
    fn test_retarget_only_onto_occupied_paths() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        assert_eq!(choose_target_path(2, &[], &mut rng), 2);

        let mut retargeted = 0;
        for _ in 0..1_000 {
            let path = choose_target_path(2, &[0], &mut rng);
            assert!(path == 0 || path == 2);
            if path == 0 {
                retargeted += 1;
            }
        }
        // ~30% with generous bounds.
        assert!((200..400).contains(&retargeted), "retargeted {retargeted}");
    }

    #[test]
    fn test_click_resolves_to_nearest_path() {
        let config = OrbitConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let request = SpawnRequest::for_click(&config, [300.0, 300.0 + 256.0], &[], &mut rng);
        assert_eq!(request.path_index, 2);
    }

    #[test]
    fn test_seed_schedule_shape() {
        let config = OrbitConfig::default();
        let plan = SeedPlan::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let seeder = AutoSeeder::new(&config, &plan, &mut rng);

        let clicks: Vec<_> = seeder.pending.iter().copied().collect();
        let per_path = clicks.len() / 3;
        assert_eq!(clicks.len() % 3, 0);
        assert!((3..=5).contains(&per_path));
        assert_eq!(clicks[0].at, plan.initial_delay);

        for pair in clicks.windows(2) {
            let gap = pair[1].at - pair[0].at;
            assert!(gap >= Duration::from_millis(600) && gap <= Duration::from_millis(1000));
        }
        for click in &clicks {
            assert_eq!(config.nearest_path(click.point), click.path_index);
        }
        // Each rail is seeded as one contiguous batch.
        let mut seen = Vec::new();
        for click in &clicks {
            if seen.last() != Some(&click.path_index) {
                assert!(!seen.contains(&click.path_index));
                seen.push(click.path_index);
            }
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_due_releases_clicks_in_order() {
        let config = OrbitConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut seeder = AutoSeeder::new(&config, &SeedPlan::default(), &mut rng);
        let total = seeder.remaining();

        assert!(seeder.due(Duration::from_secs(2)).is_empty());
        assert_eq!(seeder.next_in(), Some(Duration::from_secs(1)));

        let first = seeder.due(Duration::from_secs(1));
        assert_eq!(first.len(), 1);

        let rest = seeder.due(Duration::from_secs(60));
        assert_eq!(first.len() + rest.len(), total);
        assert!(seeder.is_finished());
        assert_eq!(seeder.next_in(), None);
    }
}
