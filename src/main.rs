//! Corridor traffic demo runner
//!
//! Runs a headless scene for a fixed number of seconds and prints a JSON
//! summary.
//!
//! Usage: `corridor-traffic [config.json] [seed] [seconds]`

use corridor_traffic::consts::DEMO_DT;
use corridor_traffic::sim::{
    PcgRandom, TickInput, TrafficEvent, TrafficState, startup, tick,
};
use corridor_traffic::{CorridorConfig, Scene};
use glam::Vec3;
use serde::Serialize;

const DEMO_BOATS: usize = 40;
const DEFAULT_SEED: u64 = 0x5eed;
const DEFAULT_SECONDS: f32 = 60.0;

/// Totals printed at the end of a run
#[derive(Debug, Default, Serialize)]
struct Summary {
    seed: u64,
    seconds: f32,
    ticks: u64,
    active: usize,
    spawned: usize,
    refused: usize,
    looped: usize,
    respawned: usize,
    deactivated: usize,
    pool_problems: usize,
    corridor_min: Vec3,
    corridor_max: Vec3,
}

fn main() {
    env_logger::init();
    log::info!("Corridor traffic demo starting...");

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => match CorridorConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Could not load {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => CorridorConfig::default(),
    };
    let seed = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_SEED);
    let seconds = args
        .get(3)
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_SECONDS);

    let summary = run(config, PcgRandom::new(seed), seconds);
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Could not serialize summary: {}", e),
    }
}

fn run(config: CorridorConfig, mut rng: PcgRandom, seconds: f32) -> Summary {
    let mut scene = Scene::with_boats(DEMO_BOATS, Vec3::new(0.6, 0.4, 1.2));
    let mut state = TrafficState::new(config, DEMO_BOATS, 0.0);

    let report = startup(&mut state, &mut scene, &mut rng);
    let bounds = state.corridor.world_box(&state.mapper);
    let mut summary = Summary {
        seed: rng.seed(),
        seconds,
        spawned: state.count_events(|e| matches!(e, TrafficEvent::Spawned { .. })),
        pool_problems: report.null_slots.len()
            + report.duplicates.len()
            + report.without_collider.len(),
        corridor_min: bounds.min,
        corridor_max: bounds.max,
        ..Default::default()
    };

    let mut now = 0.0;
    while now < seconds {
        now += DEMO_DT;
        tick(&mut state, &mut scene, &mut rng, &TickInput { now, dt: DEMO_DT });
        summary.ticks += 1;

        for event in &state.events {
            match event {
                TrafficEvent::Spawned { .. } => summary.spawned += 1,
                TrafficEvent::SpawnRefused { .. } => summary.refused += 1,
                TrafficEvent::Looped { .. } => summary.looped += 1,
                TrafficEvent::Respawned { .. } => summary.respawned += 1,
                TrafficEvent::Deactivated { .. } => summary.deactivated += 1,
                TrafficEvent::Adopted { .. } => {}
            }
        }
    }

    summary.active = state.active_count();
    log::info!(
        "Demo finished: {} ticks, {} active, {} loops",
        summary.ticks,
        summary.active,
        summary.looped
    );
    summary
}
