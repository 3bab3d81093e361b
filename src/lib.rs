//! Corridor Traffic - endless boat traffic along one world axis
//!
//! Core modules:
//! - `sim`: Deterministic simulation (axis remapping, avoidance, spawning, edge hold)
//! - `config`: Data-driven corridor configuration (JSON)
//! - `scene`: In-memory scene collaborator (pool + ray queries)

pub mod config;
pub mod scene;
pub mod sim;

pub use config::{Axis, ConfigError, CorridorConfig, Range};
pub use scene::Scene;

/// Simulation constants
pub mod consts {
    /// Largest delta-time a single tick will integrate (seconds)
    pub const MAX_DT: f32 = 0.05;

    /// Progress spans narrower than this are treated as degenerate
    pub const MIN_PROGRESS_SPAN: f32 = 1e-4;
    /// Span a degenerate progress range is widened to
    pub const WIDENED_PROGRESS_SPAN: f32 = 1.0;

    /// Lateral candidates tried by a gated start spawn before giving up
    pub const START_SPAWN_TRIES: u32 = 6;
    /// Fresh spawns start at this fraction of their cruise speed
    pub const FRESH_SPAWN_SPEED_FACTOR: f32 = 0.7;

    /// How far past the release line the edge-hold nudge aims, so a nudged
    /// boat ends up strictly inside the release interval
    pub const EDGE_NUDGE_OVERSHOOT: f32 = 0.05;

    /// Nominal frame time used by the demo runner
    pub const DEMO_DT: f32 = 1.0 / 60.0;
}

/// Move `current` toward `target` by at most `max_delta`, never overshooting
#[inline]
pub fn move_toward(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + delta.signum() * max_delta
    }
}

/// Random ±1 preference
#[inline]
pub fn sign_of(positive: bool) -> f32 {
    if positive { 1.0 } else { -1.0 }
}
