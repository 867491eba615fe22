//! Top-level orchestration
//!
//! Wires the merge engine to input clicks, game-state broadcasts, the ring
//! rotor and the trigger zones. Nothing happens until `Playing` has been
//! observed.

use std::cell::Cell;
use std::rc::Rc;

use super::animator::Animator;
use super::merge::{EngineEvent, MergeEngine};
use super::signal::{GamePhase, GameStateBroadcaster, InputSource, ListenerId};
use super::zones::{RingRotor, TriggerZones};
use crate::config::GameConfig;
use crate::error::MergeResult;

/// A running session
pub struct Game<A> {
    engine: MergeEngine<A>,
    rotor: RingRotor,
    zones: TriggerZones,
    max_travel: f32,
    phase: Rc<Cell<GamePhase>>,
    pending_clicks: Rc<Cell<u32>>,
    click_listener: Option<ListenerId>,
    state_listener: Option<ListenerId>,
    time_ticks: u64,
}

impl<A: Animator> Game<A> {
    pub fn new(config: &GameConfig, animator: A) -> MergeResult<Self> {
        Ok(Self {
            engine: MergeEngine::new(config, animator)?,
            rotor: RingRotor::new(config.ring_spin_per_tick),
            zones: TriggerZones::from_config(config),
            max_travel: config.max_travel,
            phase: Rc::new(Cell::new(GamePhase::None)),
            pending_clicks: Rc::new(Cell::new(0)),
            click_listener: None,
            state_listener: None,
            time_ticks: 0,
        })
    }

    pub fn engine(&self) -> &MergeEngine<A> {
        &self.engine
    }

    pub fn rotor(&self) -> &RingRotor {
        &self.rotor
    }

    pub fn zones(&self) -> &TriggerZones {
        &self.zones
    }

    /// Last phase observed from the broadcaster
    pub fn phase(&self) -> GamePhase {
        self.phase.get()
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    pub fn is_attached(&self) -> bool {
        self.click_listener.is_some()
    }

    /// Subscribe to clicks and phase changes
    pub fn attach(&mut self, input: &mut InputSource, states: &mut GameStateBroadcaster) {
        self.detach(input, states);

        let clicks = Rc::clone(&self.pending_clicks);
        self.click_listener = Some(input.add_click_listener(move || clicks.set(clicks.get() + 1)));

        let phase = Rc::clone(&self.phase);
        phase.set(states.phase());
        self.state_listener = Some(states.subscribe(move |p| phase.set(*p)));
        log::info!("Game attached (phase {:?})", self.phase.get());
    }

    pub fn detach(&mut self, input: &mut InputSource, states: &mut GameStateBroadcaster) {
        if let Some(id) = self.click_listener.take() {
            input.remove_click_listener(id);
        }
        if let Some(id) = self.state_listener.take() {
            states.unsubscribe(id);
        }
    }

    /// Advance one fixed step and return what the engine reported
    pub fn tick(&mut self, dt: f32) -> MergeResult<Vec<EngineEvent>> {
        let clicks = self.pending_clicks.replace(0);
        if self.phase.get() != GamePhase::Playing {
            return Ok(Vec::new());
        }
        if !self.rotor.is_started() {
            log::info!("Playing - ring starts spinning");
            self.rotor.start();
        }
        self.time_ticks += 1;
        let turn = self.rotor.tick();
        self.engine.rotate_ring(turn);

        for _ in 0..clicks {
            self.engine.launch();
        }
        self.engine.tick(dt);
        self.check_moving_piece()?;

        // Keep a piece armed whenever no cascade is running
        if self.engine.current_piece().is_none() && self.engine.is_idle() {
            self.engine.prepare_next_piece()?;
            self.engine.arm();
        }

        Ok(self.engine.drain_events())
    }

    /// Trigger detection and the travel limit for the piece in flight
    fn check_moving_piece(&mut self) -> MergeResult<()> {
        let Some(piece) = self
            .engine
            .current_piece()
            .and_then(|id| self.engine.piece(id))
            .filter(|p| p.is_moving())
        else {
            return Ok(());
        };

        if piece.travelled > self.max_travel {
            self.engine.force_stop();
            return Ok(());
        }
        if let Some(trigger) = self.zones.detect(self.rotor.rotation(), piece.pos) {
            self.engine
                .on_piece_trigger(trigger.index as i64, trigger.position, trigger.rotation)?;
        }
        Ok(())
    }
}
