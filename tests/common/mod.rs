//! Shared helpers for the engine integration tests
#![allow(dead_code)]

use ring_merge::consts::{SIM_DT, SLOT_ANGLE};
use ring_merge::polar_to_cartesian;
use ring_merge::sim::{EngineEvent, MergeEngine, PieceId, TweenAnimator};
use ring_merge::GameConfig;

pub fn config(seed: u64) -> GameConfig {
    GameConfig {
        seed,
        ..Default::default()
    }
}

pub fn engine(seed: u64) -> MergeEngine<TweenAnimator> {
    let config = config(seed);
    MergeEngine::new(&config, TweenAnimator::from_config(&config)).unwrap()
}

/// Launch a piece of `value` and report it crossing slot `index`
pub fn fire(engine: &mut MergeEngine<TweenAnimator>, index: usize, value: u32) -> PieceId {
    let id = engine.prepare_piece_with_value(value).unwrap();
    assert!(engine.arm());
    assert!(engine.launch());
    let angle = index as f32 * SLOT_ANGLE;
    engine
        .on_piece_trigger(index as i64, polar_to_cartesian(3.0, angle), angle)
        .unwrap();
    id
}

/// Tick until the cascade goes idle, collecting every event
pub fn settle(engine: &mut MergeEngine<TweenAnimator>) -> Vec<EngineEvent> {
    let mut events = engine.drain_events();
    for _ in 0..10_000 {
        if engine.is_idle() {
            return events;
        }
        engine.tick(SIM_DT);
        events.extend(engine.drain_events());
    }
    panic!("cascade never settled");
}

/// No slot references a piece that is back in the pool
pub fn assert_no_dangling(engine: &MergeEngine<TweenAnimator>) {
    for (index, occupant) in engine.ring().iter() {
        if let Some(id) = occupant {
            assert!(
                engine.pool().is_in_use(id),
                "slot {index} points at pooled piece {id:?}"
            );
        }
    }
}

pub fn merge_count(events: &[EngineEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, EngineEvent::Merged { .. }))
        .count()
}
