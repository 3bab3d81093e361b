//! Local, reactive obstruction avoidance
//!
//! Each boat casts three probes from a point ahead of its nose: one straight
//! ahead and two diagonals (`forward ± lateral`). "Left" is the diagonal
//! toward increasing lateral, "right" toward decreasing lateral.

use glam::Vec3;

use super::services::{EntityId, RayCaster};
use crate::config::Range;

/// Which probes hit another boat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Probes {
    pub front: bool,
    pub left: bool,
    pub right: bool,
}

/// Probe geometry shared by every boat in a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeRig {
    pub forward: Vec3,
    pub side: Vec3,
    pub look_ahead: f32,
    /// Diagonal length factor
    pub side_fov: f32,
    pub nose_offset: f32,
    pub layer: u32,
}

impl ProbeRig {
    /// Cast all three probes for a boat at `position`.
    ///
    /// Hits on the boat's own root are ignored.
    pub fn cast(&self, rays: &impl RayCaster, position: Vec3, own: EntityId) -> Probes {
        let origin = position + self.forward * self.nose_offset;
        let side_len = self.look_ahead * self.side_fov;
        let hits_other = |dir: Vec3, len: f32| {
            rays.cast(origin, dir, len, self.layer)
                .is_some_and(|hit| hit != own)
        };

        Probes {
            front: hits_other(self.forward, self.look_ahead),
            left: hits_other((self.forward + self.side).normalize_or_zero(), side_len),
            right: hits_other((self.forward - self.side).normalize_or_zero(), side_len),
        }
    }
}

/// Lateral steering direction (±1) while the lane ahead is blocked.
///
/// Steers away from the single blocked diagonal; when both or neither are
/// blocked, follows the persisted `bias` so the choice is stable across frames.
pub fn steer_direction(probes: &Probes, bias: f32) -> f32 {
    match (probes.left, probes.right) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => crate::sign_of(bias >= 0.0),
    }
}

/// Move `lateral` by `direction * swerve_speed * dt` and clamp it to `range`.
///
/// Touching an edge flips `bias` to point back inside.
pub fn swerve(
    lateral: f32,
    direction: f32,
    swerve_speed: f32,
    dt: f32,
    range: Range,
    bias: &mut f32,
) -> f32 {
    let moved = lateral + direction * swerve_speed * dt;
    let clamped = range.clamp(moved);
    if clamped != moved {
        *bias = if clamped <= range.min { 1.0 } else { -1.0 };
    }
    clamped
}
