//! Collaborator interfaces consumed by the simulation
//!
//! The core owns no scene: boat positions, activation flags and collision
//! geometry live behind `EntityPool`, obstruction queries behind `RayCaster`,
//! and all randomness behind `RandomSource` so tests can script it.

use std::collections::VecDeque;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Identity of a boat's top-level scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Fixed-length, possibly sparse pool of boats
pub trait EntityPool {
    /// Number of slots (never changes)
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Root identity of the boat in `slot`, `None` if missing or destroyed
    fn entity(&self, slot: usize) -> Option<EntityId>;

    fn position(&self, slot: usize) -> Option<Vec3>;

    fn set_position(&mut self, slot: usize, position: Vec3);

    /// External activation flag
    fn is_active(&self, slot: usize) -> bool;

    fn set_active(&mut self, slot: usize, active: bool);

    /// Whether the boat carries any queryable (non-trigger) collision volume
    fn has_collider(&self, slot: usize) -> bool;

    /// One-time adaptation: move the collidable parts of the boat into the
    /// query layer without touching anything else
    fn prepare(&mut self, _slot: usize, _layer: u32) {}
}

/// Ray queries against boat colliders
pub trait RayCaster {
    /// Nearest hit within `max_distance` on `layer`, ignoring trigger volumes
    fn cast(&self, origin: Vec3, direction: Vec3, max_distance: f32, layer: u32)
    -> Option<EntityId>;
}

/// Source of uniform randomness
pub trait RandomSource {
    /// Uniform float in `[min, max]`
    fn range_f32(&mut self, min: f32, max: f32) -> f32;

    /// Uniform integer in `[min, max]`
    fn range_i32(&mut self, min: i32, max: i32) -> i32;

    /// Fair coin
    fn coin(&mut self) -> bool;

    /// Random ±1
    fn sign(&mut self) -> f32 {
        crate::sign_of(self.coin())
    }
}

/// Seeded PCG random source
#[derive(Debug, Clone)]
pub struct PcgRandom {
    seed: u64,
    rng: Pcg32,
}

impl PcgRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for PcgRandom {
    fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        let (lo, hi) = if max < min { (max, min) } else { (min, max) };
        self.rng.random_range(lo..=hi)
    }

    fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        let (lo, hi) = if max < min { (max, min) } else { (min, max) };
        self.rng.random_range(lo..=hi)
    }

    fn coin(&mut self) -> bool {
        self.rng.random_bool(0.5)
    }
}

/// Plays back scripted unit samples in `[0, 1]`, then repeats `fallback`.
///
/// Floats map to `min + t * (max - min)`, coins are `t < 0.5`.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    samples: VecDeque<f32>,
    fallback: f32,
}

impl ScriptedRandom {
    pub fn new(samples: impl IntoIterator<Item = f32>, fallback: f32) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            fallback,
        }
    }

    /// Always returns `t`
    pub fn constant(t: f32) -> Self {
        Self::new([], t)
    }

    fn next_unit(&mut self) -> f32 {
        self.samples
            .pop_front()
            .unwrap_or(self.fallback)
            .clamp(0.0, 1.0)
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl RandomSource for ScriptedRandom {
    fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        let t = self.next_unit();
        min + t * (max - min)
    }

    fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        let t = self.next_unit();
        let (lo, hi) = if max < min {
            (max as i64, min as i64)
        } else {
            (min as i64, max as i64)
        };
        let offset = (t * (hi - lo) as f32).round() as i64;
        (lo + offset).clamp(lo, hi) as i32
    }

    fn coin(&mut self) -> bool {
        self.next_unit() < 0.5
    }
}
