//! Ring Merge entry point
//!
//! Runs a headless session: loads an optional JSON config, starts play and
//! taps at a fixed cadence while logging what the engine reports.

#[cfg(not(target_arch = "wasm32"))]
use ring_merge::consts::SIM_DT;
#[cfg(not(target_arch = "wasm32"))]
use ring_merge::sim::{EngineEvent, Game, GamePhase, GameStateBroadcaster, InputSource, TweenAnimator};
#[cfg(not(target_arch = "wasm32"))]
use ring_merge::{GameConfig, MergeResult};

/// One tap every this many ticks
#[cfg(not(target_arch = "wasm32"))]
const CLICK_EVERY: u64 = 45;

/// Two minutes at the fixed tick rate
#[cfg(not(target_arch = "wasm32"))]
const RUN_TICKS: u64 = 60 * 120;

#[cfg(not(target_arch = "wasm32"))]
fn main() -> MergeResult<()> {
    env_logger::init();
    log::info!("Ring Merge (native, headless) starting...");

    let config = match std::env::args().nth(1) {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };

    let animator = TweenAnimator::from_config(&config);
    let mut game = Game::new(&config, animator)?;
    let mut input = InputSource::new();
    let mut states = GameStateBroadcaster::new();
    game.attach(&mut input, &mut states);
    states.set_phase(GamePhase::Playing);

    let mut merges = 0usize;
    for tick in 0..RUN_TICKS {
        if tick % CLICK_EVERY == 0 {
            input.click();
        }
        for event in game.tick(SIM_DT)? {
            match event {
                EngineEvent::Merged { index, value, .. } => {
                    merges += 1;
                    log::info!("tick {tick}: merge at slot {index} -> {value}");
                }
                EngineEvent::CycleComplete => {
                    log::debug!("tick {tick}: ring {}", format_ring(&game.engine().values()));
                }
                other => log::debug!("tick {tick}: {other:?}"),
            }
        }
    }

    game.detach(&mut input, &mut states);
    let stats = game.engine().pool().stats();
    log::info!(
        "Done after {} ticks: {} merges, progression {}/{}, ring {}",
        game.time_ticks(),
        merges,
        game.engine().progression_level(),
        game.engine().max_level(),
        format_ring(&game.engine().values())
    );
    log::info!(
        "Pool: {} instantiated, {} in use, {} growth events; {} animations pending",
        stats.instantiated,
        stats.in_use,
        stats.growth_events,
        game.engine().animator().pending()
    );
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn format_ring(values: &[Option<u32>]) -> String {
    values
        .iter()
        .map(|v| v.map_or_else(|| "-".to_string(), |v| v.to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Headless demo only runs natively
}
