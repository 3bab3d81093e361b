//! Corridor bounds and the edge-hold state machine
//!
//! A `Corridor` is the resolved, ascending form of the configured ranges plus
//! the travel sign. Edge hold slows a boat and pulls it inward once it comes
//! within `hold_margin` of a wall, and lets go only after it is clear of the
//! wider `release_margin` on every dimension.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::axis::{AxisMapper, LocalPos};
use crate::config::{CorridorConfig, Range};
use crate::consts::{EDGE_NUDGE_OVERSHOOT, MIN_PROGRESS_SPAN, WIDENED_PROGRESS_SPAN};
use crate::move_toward;

/// Resolved corridor volume in local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corridor {
    pub lateral: Range,
    pub vertical: Range,
    /// Ascending progress range (`progressLo..progressHi`)
    pub progress: Range,
    /// +1 when start is the low bound, -1 when start is the high bound
    pub sign: f32,
}

/// World-space box and centre line of a corridor (for overlays)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorridorBox {
    pub min: Vec3,
    pub max: Vec3,
    pub center_start: Vec3,
    pub center_goal: Vec3,
}

impl Corridor {
    /// Derive bounds and travel sign from a config.
    ///
    /// A start/goal pair closer than `MIN_PROGRESS_SPAN` is widened so the
    /// simulation can keep running.
    pub fn resolve(config: &CorridorConfig) -> Self {
        let start = config.axis.component(config.start);
        let goal = config.axis.component(config.goal);
        let mut progress = Range::new(start, goal).normalized();
        let sign = if goal - start >= 0.0 { 1.0 } else { -1.0 };

        if progress.span() < MIN_PROGRESS_SPAN {
            log::error!(
                "Start {} and goal {} on axis {} are too close; widening progress range to {}",
                start,
                goal,
                config.axis.as_str(),
                WIDENED_PROGRESS_SPAN
            );
            progress.max = progress.min + WIDENED_PROGRESS_SPAN;
        }

        Self {
            lateral: config.lateral_range.normalized(),
            vertical: config.vertical_range.normalized(),
            progress,
            sign,
        }
    }

    /// Progress value boats spawn and loop back to
    #[inline]
    pub fn start_bound(&self) -> f32 {
        if self.sign > 0.0 {
            self.progress.min
        } else {
            self.progress.max
        }
    }

    /// Progress value that triggers a loop
    #[inline]
    pub fn goal_bound(&self) -> f32 {
        if self.sign > 0.0 {
            self.progress.max
        } else {
            self.progress.min
        }
    }

    /// Remaining travel to the goal bound (negative once past it)
    #[inline]
    pub fn distance_to_goal(&self, progress: f32) -> f32 {
        (self.goal_bound() - progress) * self.sign
    }

    #[inline]
    pub fn reached_goal(&self, progress: f32) -> bool {
        self.distance_to_goal(progress) <= 0.0
    }

    /// Progress interval within `gap` of the start bound, toward the goal
    pub fn start_window(&self, gap: f32) -> Range {
        let start = self.start_bound();
        Range::new(start, start + self.sign * gap).normalized()
    }

    pub fn clamp(&self, l: LocalPos) -> LocalPos {
        LocalPos::new(
            self.lateral.clamp(l.lateral),
            self.vertical.clamp(l.vertical),
            self.progress.clamp(l.progress),
        )
    }

    pub fn contains(&self, l: LocalPos) -> bool {
        !self.is_outside(l, 0.0)
    }

    /// True if any coordinate lies beyond its range by more than `margin`
    pub fn is_outside(&self, l: LocalPos, margin: f32) -> bool {
        self.lateral.is_outside(l.lateral, margin)
            || self.vertical.is_outside(l.vertical, margin)
            || self.progress.is_outside(l.progress, margin)
    }

    /// World-space extent of the corridor
    pub fn world_box(&self, mapper: &AxisMapper) -> CorridorBox {
        let a = mapper.local_to_world(LocalPos::new(
            self.lateral.min,
            self.vertical.min,
            self.progress.min,
        ));
        let b = mapper.local_to_world(LocalPos::new(
            self.lateral.max,
            self.vertical.max,
            self.progress.max,
        ));
        let centre = |progress| {
            mapper.local_to_world(LocalPos::new(self.lateral.mid(), self.vertical.mid(), progress))
        };
        CorridorBox {
            min: a.min(b),
            max: a.max(b),
            center_start: centre(self.start_bound()),
            center_goal: centre(self.goal_bound()),
        }
    }
}

/// Per-boat boundary containment state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EdgeState {
    #[default]
    Normal,
    Holding,
}

/// Edge-hold tuning, copied out of the config once per tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeHold {
    pub hold_margin: f32,
    pub release_margin: f32,
    pub min_speed: f32,
    pub inward_nudge: f32,
    pub brake: f32,
    /// Lateral nudging only happens when lateral movement is allowed
    pub nudge_lateral: bool,
}

impl EdgeHold {
    pub fn from_config(config: &CorridorConfig) -> Self {
        Self {
            hold_margin: config.edge_hold_margin,
            release_margin: config.edge_release_margin,
            min_speed: config.edge_hold_min_speed,
            inward_nudge: config.edge_inward_nudge,
            brake: config.brake,
            nudge_lateral: config.allow_lateral_movement,
        }
    }

    /// Hold entry test: within `hold_margin` of a side wall or of the goal.
    ///
    /// A range too narrow for the hold margin never triggers.
    pub fn near_edge(&self, corridor: &Corridor, l: &LocalPos) -> bool {
        let m = self.hold_margin;
        let near = |range: Range, v: f32| {
            range
                .narrowed(m)
                .is_some_and(|inner| v <= inner.min || v >= inner.max)
        };
        near(corridor.lateral, l.lateral)
            || near(corridor.vertical, l.vertical)
            || corridor.distance_to_goal(l.progress) <= m
    }

    /// Release test: strictly inside every range narrowed by the release
    /// margin. Ranges too narrow for that margin fall back to the hold margin.
    pub fn is_clear(&self, corridor: &Corridor, l: &LocalPos) -> bool {
        let clear = |range: Range, v: f32| {
            match range
                .narrowed(self.release_margin)
                .or_else(|| range.narrowed(self.hold_margin))
            {
                Some(inner) => inner.strictly_contains(v),
                None => true,
            }
        };
        let progress_margin = if corridor.progress.span() > self.release_margin {
            self.release_margin
        } else {
            self.hold_margin
        };
        clear(corridor.lateral, l.lateral)
            && clear(corridor.vertical, l.vertical)
            && corridor.distance_to_goal(l.progress) > progress_margin
    }

    /// Advance the state machine one step.
    ///
    /// While holding, speed eases toward `min_speed` and the boat is nudged
    /// back inside the release interval (lateral only when lateral movement
    /// is allowed; vertical always).
    pub fn update(
        &self,
        corridor: &Corridor,
        state: EdgeState,
        speed: &mut f32,
        l: &mut LocalPos,
        dt: f32,
    ) -> EdgeState {
        let state = if self.near_edge(corridor, l) {
            EdgeState::Holding
        } else {
            state
        };
        if state == EdgeState::Normal {
            return state;
        }

        *speed = move_toward(*speed, self.min_speed, self.brake * dt);

        let step = self.inward_nudge * dt;
        let aim = self.release_margin + EDGE_NUDGE_OVERSHOOT;
        if self.nudge_lateral {
            let target = corridor.lateral.narrowed_or_mid(aim).clamp(l.lateral);
            l.lateral = move_toward(l.lateral, target, step);
        }
        let target = corridor.vertical.narrowed_or_mid(aim).clamp(l.vertical);
        l.vertical = move_toward(l.vertical, target, step);

        if self.is_clear(corridor, l) {
            EdgeState::Normal
        } else {
            EdgeState::Holding
        }
    }
}
