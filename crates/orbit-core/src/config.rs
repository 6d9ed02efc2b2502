//! Construction-time configuration for the orbital core.
//!
//! Loaded from JSON like any other asset; every field has a default matching
//! the hero layout (600x600 canvas, three rails around a centre hub).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::palette::Theme;

/// Error type for invalid configurations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("at least one orbital path is required")]
    NoPaths,
    #[error("path radii must be finite, positive and strictly increasing (path {index}: {radius})")]
    InvalidRadius { index: usize, radius: f32 },
    #[error("`{field}` must be finite and positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("`{low_field}` ({low}) must be below `{high_field}` ({high})")]
    InvertedRange {
        low_field: &'static str,
        low: f32,
        high_field: &'static str,
        high: f32,
    },
    #[error("`{field}` must be non-zero")]
    Zero { field: &'static str },
}

/// One of the fixed concentric rails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalPath {
    pub index: usize,
    pub radius: f32,
    pub center: [f32; 2],
}

impl OrbitalPath {
    /// Point on the rail at `angle` (radians).
    pub fn point_at(&self, angle: f32) -> [f32; 2] {
        let (sin, cos) = angle.sin_cos();
        [
            self.center[0] + self.radius * cos,
            self.center[1] + self.radius * sin,
        ]
    }

    /// Distance of `point` from the shared centre.
    pub fn distance_from_center(&self, point: [f32; 2]) -> f32 {
        let dx = point[0] - self.center[0];
        let dy = point[1] - self.center[1];
        (dx * dx + dy * dy).sqrt()
    }
}

/// Cosmetic body material. The track constraint overrides motion every tick,
/// so these only shape contact response inside a single engine step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleMaterial {
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
    pub linear_damping: f32,
}

impl Default for ParticleMaterial {
    fn default() -> Self {
        Self {
            restitution: 0.1,
            friction: 0.01,
            density: 0.0005,
            linear_damping: 0.005,
        }
    }
}

/// Complete core configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    /// Shared centre of every rail, in pixels.
    pub center: [f32; 2],
    /// Rail radii in pixels, innermost first.
    pub path_radii: Vec<f32>,
    /// Radius of the static hub body at the centre.
    pub hub_radius: f32,
    /// Pixels of collider radius per unit of particle size.
    pub size_scale: f32,
    /// Slowest rail speed, px/tick.
    pub min_speed: f32,
    /// Fastest rail speed, px/tick.
    pub max_speed: f32,
    /// Requested period (seconds) that maps to `max_speed`.
    pub fastest_period: f32,
    /// Requested period (seconds) that maps to `min_speed`.
    pub slowest_period: f32,
    /// Absolute coordinate bound beyond which a body is considered lost.
    pub out_of_bounds: f32,
    /// Distance from centre below which a body is considered lost.
    pub lost_distance: f32,
    /// Engine speed (px/tick) above which a body is snapped back to its rail.
    pub speed_ceiling: f32,
    pub tick_hz: u32,
    pub sweep_interval_ms: u64,
    pub sampler_hz: u32,
    /// Emit a milestone event every N resolved collisions (0 disables).
    pub milestone_every: u32,
    pub seed: u64,
    pub theme: Theme,
    pub material: ParticleMaterial,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            center: [300.0, 300.0],
            path_radii: vec![176.0, 208.0, 256.0],
            hub_radius: 30.0,
            size_scale: 8.0,
            min_speed: 0.5,
            max_speed: 2.0,
            fastest_period: 8.0,
            slowest_period: 15.0,
            out_of_bounds: 10_000.0,
            lost_distance: 0.1,
            speed_ceiling: 10.0,
            tick_hz: 60,
            sweep_interval_ms: 2_000,
            sampler_hz: 60,
            milestone_every: 5,
            seed: 12345,
            theme: Theme::default(),
            material: ParticleMaterial::default(),
        }
    }
}

impl OrbitConfig {
    /// Loads and validates a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path_radii.is_empty() {
            return Err(ConfigError::NoPaths);
        }
        let mut previous = 0.0_f32;
        for (index, &radius) in self.path_radii.iter().enumerate() {
            if !radius.is_finite() || radius <= previous {
                return Err(ConfigError::InvalidRadius { index, radius });
            }
            previous = radius;
        }

        for (field, value) in [
            ("center.x", self.center[0]),
            ("center.y", self.center[1]),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        for (field, value) in [
            ("size_scale", self.size_scale),
            ("min_speed", self.min_speed),
            ("max_speed", self.max_speed),
            ("fastest_period", self.fastest_period),
            ("slowest_period", self.slowest_period),
            ("out_of_bounds", self.out_of_bounds),
            ("lost_distance", self.lost_distance),
            ("speed_ceiling", self.speed_ceiling),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        if !self.hub_radius.is_finite() || self.hub_radius < 0.0 {
            return Err(ConfigError::NotPositive {
                field: "hub_radius",
                value: self.hub_radius,
            });
        }

        if self.min_speed > self.max_speed {
            return Err(ConfigError::InvertedRange {
                low_field: "min_speed",
                low: self.min_speed,
                high_field: "max_speed",
                high: self.max_speed,
            });
        }
        if self.fastest_period >= self.slowest_period {
            return Err(ConfigError::InvertedRange {
                low_field: "fastest_period",
                low: self.fastest_period,
                high_field: "slowest_period",
                high: self.slowest_period,
            });
        }
        if self.max_speed > self.speed_ceiling {
            return Err(ConfigError::InvertedRange {
                low_field: "max_speed",
                low: self.max_speed,
                high_field: "speed_ceiling",
                high: self.speed_ceiling,
            });
        }

        if self.tick_hz == 0 {
            return Err(ConfigError::Zero { field: "tick_hz" });
        }
        if self.sampler_hz == 0 {
            return Err(ConfigError::Zero { field: "sampler_hz" });
        }
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::Zero {
                field: "sweep_interval_ms",
            });
        }
        Ok(())
    }

    /// Builds the immutable rail set.
    pub fn paths(&self) -> Vec<OrbitalPath> {
        self.path_radii
            .iter()
            .enumerate()
            .map(|(index, &radius)| OrbitalPath {
                index,
                radius,
                center: self.center,
            })
            .collect()
    }

    /// Physics timestep in seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_hz as f32
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz))
    }

    pub fn sampler_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.sampler_hz))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Index of the rail whose radius is closest to `point`'s distance from
    /// the centre. Ties go to the inner rail.
    pub fn nearest_path(&self, point: [f32; 2]) -> usize {
        let dx = point[0] - self.center[0];
        let dy = point[1] - self.center[1];
        let distance = (dx * dx + dy * dy).sqrt();

        let mut nearest = 0;
        let mut best = f32::INFINITY;
        for (index, radius) in self.path_radii.iter().enumerate() {
            let gap = (distance - radius).abs();
            if gap < best {
                best = gap;
                nearest = index;
            }
        }
        nearest
    }
}
