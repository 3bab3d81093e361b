//! Corridor configuration
//!
//! Loaded from JSON; every field has a default so partial files work.
//! Re-validated whenever it is edited between ticks.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or saving a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Dominant world axis the boats travel along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "x" => Some(Axis::X),
            "y" => Some(Axis::Y),
            "z" => Some(Axis::Z),
            _ => None,
        }
    }

    /// Component of `v` along this axis
    pub fn component(&self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

/// Closed interval `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Range {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Same interval with its ends in ascending order
    pub fn normalized(self) -> Self {
        if self.max < self.min {
            Self::new(self.max, self.min)
        } else {
            self
        }
    }

    #[inline]
    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    #[inline]
    pub fn mid(&self) -> f32 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn clamp(&self, v: f32) -> f32 {
        v.max(self.min).min(self.max)
    }

    /// True if `v` lies outside the interval grown by `margin` on both ends
    #[inline]
    pub fn is_outside(&self, v: f32, margin: f32) -> bool {
        v < self.min - margin || v > self.max + margin
    }

    /// True if `v` lies strictly between the ends
    #[inline]
    pub fn strictly_contains(&self, v: f32) -> bool {
        v > self.min && v < self.max
    }

    /// Interval shrunk by `margin` on each end, or `None` if nothing with a
    /// nonzero width is left
    pub fn narrowed(&self, margin: f32) -> Option<Self> {
        let narrowed = Self::new(self.min + margin, self.max - margin);
        (narrowed.min < narrowed.max).then_some(narrowed)
    }

    /// Like `narrowed`, but collapses to the midpoint instead of inverting
    pub fn narrowed_or_mid(&self, margin: f32) -> Self {
        self.narrowed(margin)
            .unwrap_or_else(|| Self::new(self.mid(), self.mid()))
    }
}

/// Complete corridor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorridorConfig {
    // === Corridor ===
    /// Travel axis
    pub axis: Axis,
    /// Start scalar per world axis (only the travel axis component is used)
    pub start: Vec3,
    /// Goal scalar per world axis
    pub goal: Vec3,
    /// Width across the corridor (world units)
    pub lateral_range: Range,
    /// Height of the corridor (world units)
    pub vertical_range: Range,

    // === Speed ===
    pub speed_min: f32,
    pub speed_max: f32,
    /// Speed a blocked boat brakes down to while following
    pub min_follow_speed: f32,
    pub accel: f32,
    pub brake: f32,

    // === Following / avoidance ===
    /// Forward probe length
    pub look_ahead: f32,
    /// Lateral speed while swerving around a blocked lane
    pub swerve_speed: f32,
    /// Probe origin offset ahead of the boat position
    pub nose_offset: f32,
    pub allow_lateral_movement: bool,
    /// Diagonal probe length factor (defaults to sqrt(2)/2)
    pub side_fov: f32,

    // === Spawning ===
    pub activate_all_at_start: bool,
    /// Scatter the first activation across the whole corridor
    pub initial_scatter: bool,
    /// Minimum lateral/progress distance between scattered boats
    pub min_spawn_separation: f32,
    pub initial_scatter_tries: u32,
    pub auto_spawn: bool,
    /// Seconds between auto-spawn attempts
    pub spawn_interval: f32,
    /// Active cap for auto-spawn (0 = unlimited)
    pub max_active: usize,
    /// A boat closer than this to the start bound blocks its lane for spawning
    pub spawn_gap_min: f32,
    /// Lateral distance under which two boats share a lane
    pub lateral_clear: f32,

    // === Boundary ===
    /// Re-clamp every coordinate at the end of each update
    pub hard_clamp: bool,
    /// Respawn at the start as soon as a boat leaves the corridor
    pub respawn_if_out: bool,
    pub fail_safe_margin: f32,

    // === Edge hold ===
    pub edge_hold: bool,
    pub edge_hold_margin: f32,
    /// Must exceed `edge_hold_margin` for hysteresis
    pub edge_release_margin: f32,
    pub edge_hold_min_speed: f32,
    /// Nudge rate toward the inside while holding
    pub edge_inward_nudge: f32,

    // === Queries ===
    /// Collision layer that holds only boat colliders
    pub entity_layer: u32,

    // === Performance ===
    /// Slots updated per tick (0 = whole pool)
    pub update_batch_size: usize,
}

impl Default for CorridorConfig {
    fn default() -> Self {
        Self {
            axis: Axis::Z,
            start: Vec3::ZERO,
            goal: Vec3::new(100.0, 0.0, 100.0),
            lateral_range: Range::new(-6.0, 6.0),
            vertical_range: Range::new(-0.3, 0.3),

            speed_min: 2.0,
            speed_max: 5.0,
            min_follow_speed: 0.8,
            accel: 2.0,
            brake: 4.0,

            look_ahead: 6.0,
            swerve_speed: 2.0,
            nose_offset: 1.0,
            allow_lateral_movement: true,
            side_fov: std::f32::consts::FRAC_1_SQRT_2,

            activate_all_at_start: true,
            initial_scatter: true,
            min_spawn_separation: 3.0,
            initial_scatter_tries: 16,
            auto_spawn: false,
            spawn_interval: 1.0,
            max_active: 0,
            spawn_gap_min: 6.0,
            lateral_clear: 1.6,

            hard_clamp: true,
            respawn_if_out: true,
            fail_safe_margin: 0.05,

            edge_hold: true,
            edge_hold_margin: 0.25,
            edge_release_margin: 0.40,
            edge_hold_min_speed: 0.5,
            edge_inward_nudge: 1.0,

            entity_layer: 10,

            update_batch_size: 25,
        }
    }
}

impl CorridorConfig {
    /// Parse a config from JSON text and validate it
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(json)?;
        config.validate();
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded corridor config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        Ok(())
    }

    /// Normalize ranges and clamp values that must not be negative.
    ///
    /// Never fails; questionable combinations are logged and kept.
    pub fn validate(&mut self) {
        self.lateral_range = self.lateral_range.normalized();
        self.vertical_range = self.vertical_range.normalized();

        if self.speed_max < self.speed_min {
            std::mem::swap(&mut self.speed_min, &mut self.speed_max);
        }
        self.speed_min = self.speed_min.max(0.0);
        self.speed_max = self.speed_max.max(0.0);
        self.min_follow_speed = self.min_follow_speed.max(0.0);
        self.edge_hold_min_speed = self.edge_hold_min_speed.max(0.0);

        for value in [
            &mut self.accel,
            &mut self.brake,
            &mut self.look_ahead,
            &mut self.swerve_speed,
            &mut self.side_fov,
            &mut self.min_spawn_separation,
            &mut self.spawn_interval,
            &mut self.spawn_gap_min,
            &mut self.lateral_clear,
            &mut self.fail_safe_margin,
            &mut self.edge_hold_margin,
            &mut self.edge_release_margin,
            &mut self.edge_inward_nudge,
        ] {
            *value = value.max(0.0);
        }

        if self.edge_hold {
            if self.edge_release_margin <= self.edge_hold_margin {
                log::warn!(
                    "Edge release margin {} should exceed hold margin {}",
                    self.edge_release_margin,
                    self.edge_hold_margin
                );
            }
            for (name, range) in [
                ("lateral", self.lateral_range),
                ("vertical", self.vertical_range),
            ] {
                if range.narrowed(self.edge_release_margin).is_none() {
                    log::warn!(
                        "{} range {:?} is narrower than twice the release margin {}",
                        name,
                        range,
                        self.edge_release_margin
                    );
                }
            }
        }
    }
}
