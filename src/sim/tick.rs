//! Per-frame simulation tick
//!
//! Advances a batch of pool slots: axis remap, probe avoidance, speed
//! integration, swerve, edge hold, progress, clamp and goal loop. Also owns
//! startup (adopt / activate / validate) and spawning.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::avoidance::{ProbeRig, steer_direction, swerve};
use super::axis::LocalPos;
use super::bounds::{EdgeHold, EdgeState};
use super::services::{EntityPool, RandomSource, RayCaster};
use super::spawn;
use super::state::{TrafficEvent, TrafficState};
use crate::consts::{FRESH_SPAWN_SPEED_FACTOR, MAX_DT};
use crate::move_toward;

/// Frame clock input for a single tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Current time (seconds), used for the spawn timer
    pub now: f32,
    /// Frame duration; clamped to `MAX_DT`
    pub dt: f32,
}

/// Findings from validating a pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReport {
    pub valid: usize,
    pub null_slots: Vec<usize>,
    /// (first slot, duplicate slot) pairs referencing the same boat
    pub duplicates: Vec<(usize, usize)>,
    pub without_collider: Vec<usize>,
}

/// Bring a pool under control.
///
/// Boats already active in the scene are adopted in place; everything else is
/// hidden, then (if enabled) activated with scatter or gated start placement.
/// Finishes with a pool validation pass.
pub fn startup<W, G>(state: &mut TrafficState, world: &mut W, rng: &mut G) -> PoolReport
where
    W: EntityPool,
    G: RandomSource,
{
    state.events.clear();
    let layer = state.config.entity_layer;
    let len = world.len().min(state.fleet.len());

    for slot in 0..len {
        if world.entity(slot).is_none() {
            continue;
        }
        world.prepare(slot, layer);
        if world.is_active(slot) {
            adopt(state, world, rng, slot);
        } else {
            world.set_active(slot, false);
        }
    }
    let adopted = state.active_count();

    if state.config.activate_all_at_start {
        let scatter = state.config.initial_scatter;
        for slot in 0..len {
            if !state.fleet.active[slot] && world.entity(slot).is_some() {
                activate(state, world, rng, slot, scatter);
            }
        }
    }

    log::info!(
        "Corridor startup: {} adopted, {} active of {} slots",
        adopted,
        state.active_count(),
        len
    );
    validate_pool(&*world)
}

/// Check the pool for null slots, duplicate references and missing colliders.
///
/// Problems are logged; nothing is fixed up.
pub fn validate_pool<W: EntityPool>(world: &W) -> PoolReport {
    let mut report = PoolReport::default();
    let mut seen = HashMap::new();

    for slot in 0..world.len() {
        let Some(id) = world.entity(slot) else {
            log::error!("Pool slot {} is empty", slot);
            report.null_slots.push(slot);
            continue;
        };

        if let Some(&first) = seen.get(&id) {
            log::error!(
                "Pool slots {} and {} reference the same boat {:?}",
                first,
                slot,
                id
            );
            report.duplicates.push((first, slot));
        } else {
            seen.insert(id, slot);
        }

        if !world.has_collider(slot) {
            log::warn!("Boat {:?} in slot {} has no collider", id, slot);
            report.without_collider.push(slot);
        }

        report.valid += 1;
    }

    log::info!("Pool validated: {} entries", report.valid);
    report
}

/// Activate the first free slot at the start bound.
///
/// Returns the slot, or `None` if the pool is full or every lane near the
/// start is occupied.
pub fn spawn_one<W, G>(state: &mut TrafficState, world: &mut W, rng: &mut G) -> Option<usize>
where
    W: EntityPool,
    G: RandomSource,
{
    let slot = state
        .fleet
        .first_inactive(|i| i < world.len() && world.entity(i).is_some())?;
    activate(state, world, rng, slot, false).then_some(slot)
}

/// Advance the simulation by one frame
pub fn tick<W, G>(state: &mut TrafficState, world: &mut W, rng: &mut G, input: &TickInput)
where
    W: EntityPool + RayCaster,
    G: RandomSource,
{
    state.events.clear();
    let dt = input.dt.clamp(0.0, MAX_DT);

    let config = &state.config;
    let below_cap = config.max_active == 0 || state.fleet.active_count() < config.max_active;
    if config.auto_spawn && below_cap && state.spawn_timer.is_due(input.now) {
        spawn_one(state, world, rng);
        let interval = state.config.spawn_interval;
        state.spawn_timer.rearm(input.now, interval);
    }

    let rig = ProbeRig {
        forward: state.mapper.forward(),
        side: state.mapper.lateral_unit(),
        look_ahead: state.config.look_ahead,
        side_fov: state.config.side_fov,
        nose_offset: state.config.nose_offset,
        layer: state.config.entity_layer,
    };
    let hold = EdgeHold::from_config(&state.config);

    let batch = state.fleet.next_batch(state.config.update_batch_size);
    let end = batch.end.min(world.len());
    for slot in batch.start..end {
        update_slot(state, world, rng, &rig, &hold, slot, dt);
    }
}

fn update_slot<W, G>(
    state: &mut TrafficState,
    world: &mut W,
    rng: &mut G,
    rig: &ProbeRig,
    hold: &EdgeHold,
    slot: usize,
    dt: f32,
) where
    W: EntityPool + RayCaster,
    G: RandomSource,
{
    if !state.fleet.active[slot] {
        return;
    }

    let live = world
        .entity(slot)
        .zip(world.position(slot))
        .filter(|_| world.is_active(slot));
    let Some((own, position)) = live else {
        log::debug!("Slot {} went away, releasing it", slot);
        state.fleet.mark_inactive(slot);
        state.events.push(TrafficEvent::Deactivated { slot });
        return;
    };

    let mut l = state.mapper.world_to_local(position);
    if state.config.respawn_if_out && state.corridor.is_outside(l, state.config.fail_safe_margin)
    {
        respawn_slot(state, world, rng, slot);
        return;
    }

    let config = &state.config;
    let corridor = state.corridor;

    let probes = rig.cast(&*world, position, own);

    let fleet = &mut state.fleet;
    let speed = &mut fleet.current_speed[slot];
    if probes.front {
        if *speed > config.min_follow_speed {
            *speed = (*speed - config.brake * dt).max(config.min_follow_speed);
        }
    } else {
        *speed = move_toward(*speed, fleet.target_speed[slot], config.accel * dt);
    }

    if config.allow_lateral_movement && probes.front {
        let direction = steer_direction(&probes, fleet.bias[slot]);
        l.lateral = swerve(
            l.lateral,
            direction,
            config.swerve_speed,
            dt,
            corridor.lateral,
            &mut fleet.bias[slot],
        );
    }

    if config.edge_hold {
        fleet.edge[slot] = hold.update(
            &corridor,
            fleet.edge[slot],
            &mut fleet.current_speed[slot],
            &mut l,
            dt,
        );
    } else {
        fleet.edge[slot] = EdgeState::Normal;
    }

    fleet.current_speed[slot] = fleet.current_speed[slot].max(0.0);
    l.progress += corridor.sign * fleet.current_speed[slot] * dt;

    if config.hard_clamp {
        l = corridor.clamp(l);
    }
    if !config.allow_lateral_movement {
        l.lateral = corridor.lateral.clamp(fleet.fixed_lateral[slot]);
    }

    if corridor.reached_goal(l.progress) {
        loop_slot(state, rng, slot, &mut l);
    }

    world.set_position(slot, state.mapper.local_to_world(l));
}

/// Send a boat that reached the goal back to the start with fresh lane,
/// cruise speed and bias
fn loop_slot<G: RandomSource>(state: &mut TrafficState, rng: &mut G, slot: usize, l: &mut LocalPos) {
    let corridor = &state.corridor;
    l.progress = corridor.start_bound();
    l.lateral = rng.range_f32(corridor.lateral.min, corridor.lateral.max);
    l.vertical = corridor.vertical.mid();

    let fleet = &mut state.fleet;
    let cruise = rng.range_f32(state.config.speed_min, state.config.speed_max);
    fleet.target_speed[slot] = cruise;
    fleet.current_speed[slot] = fleet.current_speed[slot].min(cruise);
    fleet.bias[slot] = rng.sign();
    if !state.config.allow_lateral_movement {
        fleet.fixed_lateral[slot] = l.lateral;
    }

    log::debug!("Slot {} looped to lateral {:.2}", slot, l.lateral);
    state.events.push(TrafficEvent::Looped { slot });
}

/// Put a boat that left the corridor back at the start, no questions asked
fn respawn_slot<W, G>(state: &mut TrafficState, world: &mut W, rng: &mut G, slot: usize)
where
    W: EntityPool,
    G: RandomSource,
{
    let l = spawn::respawn_at_start(&state.corridor, rng);
    world.set_position(slot, state.mapper.local_to_world(l));

    let cruise = rng.range_f32(state.config.speed_min, state.config.speed_max);
    let current = state.fleet.current_speed[slot].min(cruise);
    let bias = rng.sign();
    let lateral = (!state.config.allow_lateral_movement).then_some(l.lateral);
    state.fleet.launch(slot, cruise, current, bias, lateral);

    log::debug!("Slot {} left the corridor, respawned at start", slot);
    state.events.push(TrafficEvent::Respawned { slot });
}

/// Take over a boat that is already active in the scene
fn adopt<W, G>(state: &mut TrafficState, world: &mut W, rng: &mut G, slot: usize)
where
    W: EntityPool,
    G: RandomSource,
{
    let Some(position) = world.position(slot) else {
        return;
    };
    let l = state.corridor.clamp(state.mapper.world_to_local(position));
    world.set_position(slot, state.mapper.local_to_world(l));

    launch_fresh(state, rng, slot, l);
    state.fleet.mark_active(slot);
    state.events.push(TrafficEvent::Adopted { slot });
}

/// Place and activate an inactive slot. Returns false if the gated start
/// placement refused.
fn activate<W, G>(
    state: &mut TrafficState,
    world: &mut W,
    rng: &mut G,
    slot: usize,
    scatter: bool,
) -> bool
where
    W: EntityPool,
    G: RandomSource,
{
    let others = active_locals(state, &*world, slot);
    let config = &state.config;
    let placed = if scatter {
        Some(spawn::scatter(
            &state.corridor,
            &others,
            config.min_spawn_separation,
            config.initial_scatter_tries,
            rng,
        ))
    } else {
        spawn::gated_start(
            &state.corridor,
            &others,
            config.spawn_gap_min,
            config.lateral_clear,
            rng,
        )
    };
    let Some(l) = placed else {
        log::debug!("Start lane occupied, skipping spawn for slot {}", slot);
        state.events.push(TrafficEvent::SpawnRefused { slot });
        return false;
    };

    world.set_position(slot, state.mapper.local_to_world(l));
    if !world.has_collider(slot) {
        log::warn!("Slot {} has no collider; other boats cannot see it", slot);
    }
    world.prepare(slot, config.entity_layer);
    world.set_active(slot, true);

    launch_fresh(state, rng, slot, l);
    state.fleet.mark_active(slot);
    state.events.push(TrafficEvent::Spawned { slot });
    true
}

fn launch_fresh<G: RandomSource>(state: &mut TrafficState, rng: &mut G, slot: usize, l: LocalPos) {
    let cruise = rng.range_f32(state.config.speed_min, state.config.speed_max);
    let bias = rng.sign();
    let lateral = (!state.config.allow_lateral_movement).then_some(l.lateral);
    state
        .fleet
        .launch(slot, cruise, cruise * FRESH_SPAWN_SPEED_FACTOR, bias, lateral);
}

/// Local positions of every other live, active boat
fn active_locals<W: EntityPool>(state: &TrafficState, world: &W, exclude: usize) -> Vec<LocalPos> {
    state
        .fleet
        .active_slots()
        .filter(|&i| i != exclude && i < world.len() && world.is_active(i))
        .filter_map(|i| world.position(i))
        .map(|p| state.mapper.world_to_local(p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CorridorConfig, Range};
    use crate::scene::Scene;
    use crate::sim::services::{PcgRandom, ScriptedRandom};
    use glam::Vec3;
    use proptest::prelude::*;

    fn quiet_config() -> CorridorConfig {
        CorridorConfig {
            activate_all_at_start: false,
            update_batch_size: 0,
            ..Default::default()
        }
    }

    /// Scene with `n` hidden boats and a state that owns one of them active
    fn one_boat_at(local: LocalPos, speed: f32) -> (TrafficState, Scene) {
        let mut state = TrafficState::new(quiet_config(), 1, 0.0);
        let mut scene = Scene::with_boats(1, Vec3::splat(0.5));
        scene.set_position(0, state.mapper.local_to_world(local));
        scene.set_active(0, true);
        state.fleet.mark_active(0);
        state.fleet.launch(0, speed, speed, 1.0, None);
        (state, scene)
    }

    #[test]
    fn test_dt_is_clamped() {
        let (mut state, mut scene) = one_boat_at(LocalPos::new(0.0, 0.0, 10.0), 4.0);
        let mut rng = PcgRandom::new(1);
        tick(&mut state, &mut scene, &mut rng, &TickInput { now: 0.0, dt: 1.0 });
        let l = state.mapper.world_to_local(scene.position(0).unwrap());
        assert!((l.progress - (10.0 + 4.0 * MAX_DT)).abs() < 1e-4);
    }

    #[test]
    fn test_unblocked_accelerates_toward_target() {
        let (mut state, mut scene) = one_boat_at(LocalPos::new(0.0, 0.0, 10.0), 2.0);
        state.fleet.target_speed[0] = 5.0;
        let mut rng = PcgRandom::new(1);
        tick(&mut state, &mut scene, &mut rng, &TickInput { now: 0.0, dt: 0.05 });
        assert!((state.fleet.current_speed[0] - 2.1).abs() < 1e-5);
    }

    #[test]
    fn test_out_of_bounds_respawns_at_start() {
        let (mut state, mut scene) = one_boat_at(LocalPos::new(0.0, 0.0, 10.0), 3.0);
        scene.set_position(0, Vec3::new(20.0, 0.0, 10.0));
        let mut rng = PcgRandom::new(5);
        tick(&mut state, &mut scene, &mut rng, &TickInput { now: 0.0, dt: 0.05 });
        let l = state.mapper.world_to_local(scene.position(0).unwrap());
        assert_eq!(l.progress, state.corridor.start_bound());
        assert!(state.corridor.contains(l));
        assert!(state.current_speed_ok());
        assert_eq!(state.events, vec![TrafficEvent::Respawned { slot: 0 }]);
    }

    #[test]
    fn test_deactivated_boat_releases_slot() {
        let (mut state, mut scene) = one_boat_at(LocalPos::new(0.0, 0.0, 10.0), 3.0);
        scene.set_active(0, false);
        let mut rng = PcgRandom::new(5);
        tick(&mut state, &mut scene, &mut rng, &TickInput { now: 0.0, dt: 0.05 });
        assert_eq!(state.active_count(), 0);
        assert_eq!(state.events, vec![TrafficEvent::Deactivated { slot: 0 }]);
    }

    #[test]
    fn test_loop_resets_to_start() {
        let (mut state, mut scene) = one_boat_at(LocalPos::new(1.0, 0.0, 99.95), 5.0);
        let mut rng = ScriptedRandom::new([0.25, 0.0, 0.9], 0.5);
        tick(&mut state, &mut scene, &mut rng, &TickInput { now: 0.0, dt: 0.05 });

        let l = state.mapper.world_to_local(scene.position(0).unwrap());
        assert_eq!(l.progress, 0.0);
        assert_eq!(l.lateral, -3.0);
        assert_eq!(l.vertical, state.corridor.vertical.mid());
        assert_eq!(state.fleet.target_speed[0], 2.0);
        assert!(state.fleet.current_speed[0] <= 2.0);
        assert_eq!(state.fleet.bias[0], -1.0);
        assert_eq!(state.events, vec![TrafficEvent::Looped { slot: 0 }]);
    }

    #[test]
    fn test_fixed_lateral_when_lateral_disabled() {
        let (mut state, mut scene) = one_boat_at(LocalPos::new(2.0, 0.0, 10.0), 3.0);
        state.config.allow_lateral_movement = false;
        state.fleet.fixed_lateral[0] = 1.25;
        let mut rng = PcgRandom::new(5);
        tick(&mut state, &mut scene, &mut rng, &TickInput { now: 0.0, dt: 0.05 });
        let l = state.mapper.world_to_local(scene.position(0).unwrap());
        assert_eq!(l.lateral, 1.25);
    }

    #[test]
    fn test_spawn_one_refuses_blocked_start() {
        let mut state = TrafficState::new(
            CorridorConfig {
                lateral_range: Range::new(-0.5, 0.5),
                ..quiet_config()
            },
            2,
            0.0,
        );
        let mut scene = Scene::with_boats(2, Vec3::splat(0.5));
        let mut rng = PcgRandom::new(9);
        startup(&mut state, &mut scene, &mut rng);

        assert_eq!(spawn_one(&mut state, &mut scene, &mut rng), Some(0));
        // The whole 1-wide corridor is one lane, and boat 0 sits on the start
        assert_eq!(spawn_one(&mut state, &mut scene, &mut rng), None);
        assert_eq!(state.active_count(), 1);
        assert!(!scene.is_active(1));
    }

    #[test]
    fn test_auto_spawn_respects_timer_and_cap() {
        let config = CorridorConfig {
            auto_spawn: true,
            spawn_interval: 1.0,
            max_active: 2,
            ..quiet_config()
        };
        let mut state = TrafficState::new(config, 4, 0.0);
        let mut scene = Scene::with_boats(4, Vec3::splat(0.5));
        let mut rng = PcgRandom::new(21);
        startup(&mut state, &mut scene, &mut rng);
        assert_eq!(state.active_count(), 0);

        let mut now = 0.0;
        for _ in 0..600 {
            now += 0.05;
            tick(&mut state, &mut scene, &mut rng, &TickInput { now, dt: 0.05 });
            assert!(state.active_count() <= 2);
        }
        assert_eq!(state.active_count(), 2);
    }

    #[test]
    fn test_batches_only_touch_their_slots() {
        let config = CorridorConfig {
            update_batch_size: 2,
            ..quiet_config()
        };
        let mut state = TrafficState::new(config, 4, 0.0);
        let mut scene = Scene::with_boats(4, Vec3::splat(0.5));
        for slot in 0..4 {
            let l = LocalPos::new(-4.5 + 3.0 * slot as f32, 0.0, 20.0);
            scene.set_position(slot, state.mapper.local_to_world(l));
            scene.set_active(slot, true);
        }
        let mut rng = PcgRandom::new(2);
        startup(&mut state, &mut scene, &mut rng);
        let before: Vec<Vec3> = (0..4).map(|i| scene.position(i).unwrap()).collect();

        tick(&mut state, &mut scene, &mut rng, &TickInput { now: 0.0, dt: 0.05 });
        let after: Vec<Vec3> = (0..4).map(|i| scene.position(i).unwrap()).collect();
        assert_ne!(before[0], after[0]);
        assert_ne!(before[1], after[1]);
        assert_eq!(before[2], after[2]);
        assert_eq!(before[3], after[3]);
    }

    /// Trailing boat in slot 0 (cruise 4, bias +1) and a slower leader in slot 1
    fn lane_pair(config: CorridorConfig, trailing: LocalPos, leader: LocalPos) -> (TrafficState, Scene) {
        let mut state = TrafficState::new(config, 2, 0.0);
        let mut scene = Scene::with_boats(2, Vec3::splat(0.5));
        for (slot, l) in [(0, trailing), (1, leader)] {
            scene.set_position(slot, state.mapper.local_to_world(l));
            scene.set_active(slot, true);
        }
        startup(&mut state, &mut scene, &mut PcgRandom::new(3));
        state.fleet.launch(0, 4.0, 4.0, 1.0, None);
        state.fleet.launch(1, 2.0, 2.0, 1.0, None);
        (state, scene)
    }

    fn lateral_of(state: &TrafficState, scene: &Scene, slot: usize) -> f32 {
        state.mapper.world_to_local(scene.position(slot).unwrap()).lateral
    }

    #[test]
    fn test_spawn_resets_kinematics() {
        let config = CorridorConfig {
            allow_lateral_movement: false,
            ..quiet_config()
        };
        let mut state = TrafficState::new(config, 1, 0.0);
        let mut scene = Scene::with_boats(1, Vec3::splat(0.5));
        startup(&mut state, &mut scene, &mut PcgRandom::new(1));
        state.fleet.edge[0] = EdgeState::Holding;
        state.fleet.current_speed[0] = 9.0;

        // lateral 3.0, vertical, cruise 3.5, coin tails
        let mut rng = ScriptedRandom::new([0.75, 0.5, 0.5, 0.9], 0.5);
        assert_eq!(spawn_one(&mut state, &mut scene, &mut rng), Some(0));
        assert_eq!(rng.remaining(), 0);

        assert_eq!(lateral_of(&state, &scene, 0), 3.0);
        assert_eq!(state.fleet.target_speed[0], 3.5);
        assert_eq!(state.fleet.current_speed[0], 3.5 * FRESH_SPAWN_SPEED_FACTOR);
        assert_eq!(state.fleet.bias[0], -1.0);
        assert_eq!(state.fleet.edge[0], EdgeState::Normal);
        assert_eq!(state.fleet.fixed_lateral[0], 3.0);
    }

    #[test]
    fn test_adopt_resets_kinematics() {
        let config = CorridorConfig {
            allow_lateral_movement: false,
            ..quiet_config()
        };
        let mut state = TrafficState::new(config, 1, 0.0);
        let mut scene = Scene::with_boats(1, Vec3::splat(0.5));
        scene.set_position(0, state.mapper.local_to_world(LocalPos::new(1.5, 0.0, 40.0)));
        scene.set_active(0, true);
        state.fleet.edge[0] = EdgeState::Holding;

        // cruise 2.0, coin heads
        let mut rng = ScriptedRandom::new([0.0, 0.1], 0.5);
        startup(&mut state, &mut scene, &mut rng);

        assert_eq!(state.events, vec![TrafficEvent::Adopted { slot: 0 }]);
        assert_eq!(lateral_of(&state, &scene, 0), 1.5);
        assert_eq!(state.fleet.target_speed[0], 2.0);
        assert_eq!(state.fleet.current_speed[0], 2.0 * FRESH_SPAWN_SPEED_FACTOR);
        assert_eq!(state.fleet.bias[0], 1.0);
        assert_eq!(state.fleet.edge[0], EdgeState::Normal);
        assert_eq!(state.fleet.fixed_lateral[0], 1.5);
    }

    #[test]
    fn test_respawn_caps_speed_at_new_target() {
        // (speed before, cruise sample, new target, speed after)
        let cases: [(f32, f32, f32, f32); 2] = [(1.0, 0.5, 3.5, 1.0), (4.5, 0.0, 2.0, 2.0)];
        for (before, t, target, after) in cases {
            let (mut state, mut scene) = one_boat_at(LocalPos::new(0.0, 0.0, 10.0), before);
            state.config.allow_lateral_movement = false;
            state.fleet.edge[0] = EdgeState::Holding;
            state.fleet.bias[0] = -1.0;
            scene.set_position(0, Vec3::new(20.0, 0.0, 10.0));

            // lateral -3.0, vertical, cruise, coin heads
            let mut rng = ScriptedRandom::new([0.25, 0.5, t, 0.2], 0.5);
            tick(&mut state, &mut scene, &mut rng, &TickInput { now: 0.0, dt: 0.05 });

            let l = state.mapper.world_to_local(scene.position(0).unwrap());
            assert_eq!(l.lateral, -3.0);
            assert_eq!(l.progress, 0.0);
            assert_eq!(state.fleet.target_speed[0], target);
            assert_eq!(state.fleet.current_speed[0], after);
            assert_eq!(state.fleet.bias[0], 1.0);
            assert_eq!(state.fleet.edge[0], EdgeState::Normal);
            assert_eq!(state.fleet.fixed_lateral[0], -3.0);
        }
    }

    #[test]
    fn test_loop_refreezes_fixed_lateral() {
        let (mut state, mut scene) = one_boat_at(LocalPos::new(1.0, 0.0, 99.95), 5.0);
        state.config.allow_lateral_movement = false;
        state.fleet.fixed_lateral[0] = 1.0;

        // lateral -3.0, cruise 2.0, coin tails
        let mut rng = ScriptedRandom::new([0.25, 0.0, 0.9], 0.5);
        tick(&mut state, &mut scene, &mut rng, &TickInput { now: 0.0, dt: 0.05 });

        assert_eq!(state.events, vec![TrafficEvent::Looped { slot: 0 }]);
        assert_eq!(lateral_of(&state, &scene, 0), -3.0);
        assert_eq!(state.fleet.fixed_lateral[0], -3.0);
        assert_eq!(state.fleet.target_speed[0], 2.0);
        assert_eq!(state.fleet.current_speed[0], 2.0);
        assert_eq!(state.fleet.bias[0], -1.0);
        // Held near the goal; the loop leaves the edge state for the next update
        assert_eq!(state.fleet.edge[0], EdgeState::Holding);
    }

    #[test]
    fn test_blocked_boat_swerves_toward_bias() {
        for bias in [1.0, -1.0] {
            let (mut state, mut scene) = lane_pair(
                quiet_config(),
                LocalPos::new(0.0, 0.0, 10.0),
                LocalPos::new(0.0, 0.0, 14.0),
            );
            state.fleet.bias[0] = bias;
            let mut rng = PcgRandom::new(1);
            tick(&mut state, &mut scene, &mut rng, &TickInput { now: 0.0, dt: 0.05 });

            let expected = bias * state.config.swerve_speed * 0.05;
            assert!((lateral_of(&state, &scene, 0) - expected).abs() < 1e-6);
            assert_eq!(state.fleet.bias[0], bias);
            assert!((state.fleet.current_speed[0] - 3.8).abs() < 1e-5);
            // Leader has open water and keeps its lane
            assert_eq!(lateral_of(&state, &scene, 1), 0.0);
        }
    }

    #[test]
    fn test_swerve_into_wall_flips_bias() {
        let config = CorridorConfig {
            edge_hold: false,
            ..quiet_config()
        };
        let (mut state, mut scene) = lane_pair(
            config,
            LocalPos::new(5.95, 0.0, 10.0),
            LocalPos::new(5.9, 0.0, 14.0),
        );
        let mut rng = PcgRandom::new(1);
        tick(&mut state, &mut scene, &mut rng, &TickInput { now: 0.0, dt: 0.05 });

        assert_eq!(lateral_of(&state, &scene, 0), 6.0);
        assert_eq!(state.fleet.bias[0], -1.0);
    }

    #[test]
    fn test_blocked_boat_keeps_lane_when_lateral_disabled() {
        let config = CorridorConfig {
            allow_lateral_movement: false,
            ..quiet_config()
        };
        let (mut state, mut scene) = lane_pair(
            config,
            LocalPos::new(0.7, 0.0, 10.0),
            LocalPos::new(0.7, 0.0, 14.0),
        );
        let mut rng = PcgRandom::new(1);
        tick(&mut state, &mut scene, &mut rng, &TickInput { now: 0.0, dt: 0.05 });

        assert_eq!(lateral_of(&state, &scene, 0), 0.7);
        assert!((state.fleet.current_speed[0] - 3.8).abs() < 1e-5);
    }

    #[test]
    fn test_blocked_boat_below_follow_speed_is_not_raised() {
        let (mut state, mut scene) = lane_pair(
            quiet_config(),
            LocalPos::new(0.0, 0.0, 10.0),
            LocalPos::new(0.0, 0.0, 14.0),
        );
        state.fleet.current_speed[0] = 0.5;
        let mut rng = PcgRandom::new(1);
        tick(&mut state, &mut scene, &mut rng, &TickInput { now: 0.0, dt: 0.05 });

        assert_eq!(state.fleet.current_speed[0], 0.5);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_hard_clamp_keeps_boats_inside(seed in any::<u64>(), boats in 1usize..16) {
            let mut state = TrafficState::new(CorridorConfig::default(), boats, 0.0);
            let mut scene = Scene::with_boats(boats, Vec3::splat(0.5));
            let mut rng = PcgRandom::new(seed);
            startup(&mut state, &mut scene, &mut rng);

            let mut now = 0.0;
            for _ in 0..120 {
                now += 0.05;
                tick(&mut state, &mut scene, &mut rng, &TickInput { now, dt: 0.05 });
                for slot in state.fleet.active_slots() {
                    let l = state.mapper.world_to_local(scene.position(slot).unwrap());
                    prop_assert!(state.corridor.contains(l), "slot {} at {:?}", slot, l);
                }
            }
            prop_assert!(state.current_speed_ok());
        }
    }

    impl TrafficState {
        fn current_speed_ok(&self) -> bool {
            self.fleet
                .active_slots()
                .all(|i| self.fleet.current_speed[i] >= 0.0)
        }
    }
}
