//! Simulation state
//!
//! Per-slot kinematics are stored as parallel arrays indexed by pool slot so
//! the per-tick sweep stays linear and allocation free. Slots are recycled,
//! never freed. Everything here is serializable for snapshots.

use serde::{Deserialize, Serialize};

use super::axis::AxisMapper;
use super::bounds::{Corridor, EdgeState};
use crate::config::CorridorConfig;

/// Something that happened to a slot during the last tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrafficEvent {
    /// Slot was already active in the scene at startup and was taken over
    Adopted { slot: usize },
    /// Slot was activated by a placement
    Spawned { slot: usize },
    /// Gated start spawn found no free lane
    SpawnRefused { slot: usize },
    /// Boat reached the goal and went back to the start
    Looped { slot: usize },
    /// Boat left the corridor and was put back at the start
    Respawned { slot: usize },
    /// Scene reported the boat inactive or gone
    Deactivated { slot: usize },
}

/// Kinematic state for every pool slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fleet {
    pub active: Vec<bool>,
    pub current_speed: Vec<f32>,
    pub target_speed: Vec<f32>,
    /// Preferred swerve side, ±1
    pub bias: Vec<f32>,
    pub edge: Vec<EdgeState>,
    /// Lateral offset kept while lateral movement is disabled
    pub fixed_lateral: Vec<f32>,
    active_count: usize,
    /// First slot of the next update batch
    cursor: usize,
}

impl Fleet {
    pub fn new(len: usize) -> Self {
        Self {
            active: vec![false; len],
            current_speed: vec![0.0; len],
            target_speed: vec![0.0; len],
            bias: vec![1.0; len],
            edge: vec![EdgeState::Normal; len],
            fixed_lateral: vec![0.0; len],
            active_count: 0,
            cursor: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    pub fn is_active(&self, slot: usize) -> bool {
        self.active.get(slot).copied().unwrap_or(false)
    }

    /// Lowest inactive slot that `usable` accepts
    pub fn first_inactive(&self, usable: impl Fn(usize) -> bool) -> Option<usize> {
        (0..self.len()).find(|&i| !self.active[i] && usable(i))
    }

    pub fn active_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.active
            .iter()
            .enumerate()
            .filter_map(|(i, &a)| a.then_some(i))
    }

    pub fn mark_active(&mut self, slot: usize) {
        if !self.active[slot] {
            self.active[slot] = true;
            self.active_count += 1;
        }
    }

    pub fn mark_inactive(&mut self, slot: usize) {
        if self.active[slot] {
            self.active[slot] = false;
            self.active_count = self.active_count.saturating_sub(1);
        }
    }

    /// Reset kinematics after a placement
    pub fn launch(
        &mut self,
        slot: usize,
        target_speed: f32,
        current_speed: f32,
        bias: f32,
        lateral: Option<f32>,
    ) {
        self.target_speed[slot] = target_speed;
        self.current_speed[slot] = current_speed.max(0.0);
        self.bias[slot] = bias;
        self.edge[slot] = EdgeState::Normal;
        if let Some(lateral) = lateral {
            self.fixed_lateral[slot] = lateral;
        }
    }

    /// Slots to update this tick; advances the cursor and wraps at the end.
    ///
    /// A batch size of 0 covers the whole pool.
    pub fn next_batch(&mut self, batch_size: usize) -> std::ops::Range<usize> {
        let n = self.len();
        if batch_size == 0 || n == 0 {
            return 0..n;
        }
        let start = self.cursor.min(n);
        let end = (start + batch_size).min(n);
        self.cursor = if end >= n { 0 } else { end };
        start..end
    }
}

/// Next-fire timestamp for periodic auto-spawning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnTimer {
    pub next_fire: f32,
}

impl SpawnTimer {
    pub fn new(now: f32, interval: f32) -> Self {
        Self {
            next_fire: now + interval,
        }
    }

    #[inline]
    pub fn is_due(&self, now: f32) -> bool {
        now >= self.next_fire
    }

    pub fn rearm(&mut self, now: f32, interval: f32) {
        self.next_fire = now + interval;
    }
}

/// Complete simulation state for one corridor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficState {
    /// Validated configuration
    pub config: CorridorConfig,
    /// Bounds derived from `config`
    pub corridor: Corridor,
    pub mapper: AxisMapper,
    pub fleet: Fleet,
    pub spawn_timer: SpawnTimer,
    /// Events from the most recent tick
    #[serde(skip)]
    pub events: Vec<TrafficEvent>,
}

impl TrafficState {
    /// Create state for a pool of `pool_len` slots, all inactive
    pub fn new(mut config: CorridorConfig, pool_len: usize, now: f32) -> Self {
        config.validate();
        let corridor = Corridor::resolve(&config);
        let mapper = AxisMapper::new(config.axis, corridor.sign);
        let spawn_timer = SpawnTimer::new(now, config.spawn_interval);
        Self {
            config,
            corridor,
            mapper,
            fleet: Fleet::new(pool_len),
            spawn_timer,
            events: Vec::new(),
        }
    }

    /// Swap in an edited config between ticks.
    ///
    /// Ranges are re-normalized and progress bounds re-derived; per-slot
    /// state is kept.
    pub fn reconfigure(&mut self, mut config: CorridorConfig) {
        config.validate();
        self.corridor = Corridor::resolve(&config);
        self.mapper = AxisMapper::new(config.axis, self.corridor.sign);
        self.config = config;
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.fleet.active_count()
    }

    pub fn count_events(&self, pred: impl Fn(&TrafficEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}
