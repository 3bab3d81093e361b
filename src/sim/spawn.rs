//! Spawn placement
//!
//! Every placement returns a corridor-local position already clamped into the
//! corridor. `others` is the local position of every other active boat.

use super::axis::LocalPos;
use super::bounds::Corridor;
use super::services::RandomSource;
use crate::consts::START_SPAWN_TRIES;

/// Scatter across the whole corridor, keeping `min_separation` (lateral and
/// progress) from every other boat.
///
/// Falls back to an unchecked sample once `tries` is exhausted, so it always
/// returns a position. Vertical sits at the middle of the range.
pub fn scatter(
    corridor: &Corridor,
    others: &[LocalPos],
    min_separation: f32,
    tries: u32,
    rng: &mut impl RandomSource,
) -> LocalPos {
    let min_sq = min_separation * min_separation;
    let vertical = corridor.vertical.mid();

    for _ in 0..tries {
        let lateral = rng.range_f32(corridor.lateral.min, corridor.lateral.max);
        let progress = rng.range_f32(corridor.progress.min, corridor.progress.max);
        let candidate = LocalPos::new(lateral, vertical, progress);

        if others
            .iter()
            .all(|o| o.plane_distance_sq(&candidate) >= min_sq)
        {
            return corridor.clamp(candidate);
        }
    }

    log::debug!("Scatter gave up after {} tries, placing unchecked", tries);
    let lateral = rng.range_f32(corridor.lateral.min, corridor.lateral.max);
    let progress = rng.range_f32(corridor.progress.min, corridor.progress.max);
    corridor.clamp(LocalPos::new(lateral, vertical, progress))
}

/// True if no boat sits within `gap` of the start bound in the lane around
/// `lateral` (closer than `lateral_clear`).
pub fn lane_is_clear(
    corridor: &Corridor,
    others: &[LocalPos],
    lateral: f32,
    gap: f32,
    lateral_clear: f32,
) -> bool {
    let window = corridor.start_window(gap);
    !others.iter().any(|o| {
        (o.lateral - lateral).abs() < lateral_clear
            && o.progress >= window.min
            && o.progress <= window.max
    })
}

/// Place at the start bound in a lane nobody near the start occupies.
///
/// Returns `None` when every candidate lane is taken; the caller must then
/// skip the spawn entirely.
pub fn gated_start(
    corridor: &Corridor,
    others: &[LocalPos],
    gap: f32,
    lateral_clear: f32,
    rng: &mut impl RandomSource,
) -> Option<LocalPos> {
    let lateral = (0..START_SPAWN_TRIES)
        .map(|_| rng.range_f32(corridor.lateral.min, corridor.lateral.max))
        .find(|&lat| lane_is_clear(corridor, others, lat, gap, lateral_clear))?;

    let vertical = rng.range_f32(corridor.vertical.min, corridor.vertical.max);
    Some(corridor.clamp(LocalPos::new(
        lateral,
        vertical,
        corridor.start_bound(),
    )))
}

/// Place at the start bound without any occupancy check
pub fn respawn_at_start(corridor: &Corridor, rng: &mut impl RandomSource) -> LocalPos {
    let lateral = rng.range_f32(corridor.lateral.min, corridor.lateral.max);
    let vertical = rng.range_f32(corridor.vertical.min, corridor.vertical.max);
    corridor.clamp(LocalPos::new(lateral, vertical, corridor.start_bound()))
}
