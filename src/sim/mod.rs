//! Deterministic corridor simulation
//!
//! All traffic logic lives here. This module must stay deterministic:
//! - Randomness only through an injected `RandomSource`
//! - Stable iteration order (by pool slot)
//! - No rendering, physics engine or platform dependencies

pub mod avoidance;
pub mod axis;
pub mod bounds;
pub mod services;
pub mod spawn;
pub mod state;
pub mod tick;

pub use avoidance::{ProbeRig, Probes, steer_direction, swerve};
pub use axis::{AxisMapper, LocalPos};
pub use bounds::{Corridor, CorridorBox, EdgeHold, EdgeState};
pub use services::{EntityId, EntityPool, PcgRandom, RandomSource, RayCaster, ScriptedRandom};
pub use state::{Fleet, SpawnTimer, TrafficEvent, TrafficState};
pub use tick::{PoolReport, TickInput, spawn_one, startup, tick, validate_pool};
