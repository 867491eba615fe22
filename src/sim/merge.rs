//! Snap-then-cascade merge resolution
//!
//! One cascade runs at a time: `Idle -> Snapping -> Resolving ->
//! (Merging)* -> Idle`. `Snapping` and `Merging` wait on an animation
//! ticket; `Resolving` is evaluated synchronously until it either starts
//! the next merge or finds no equal neighbour.
//!
//! Occupancy rule: a slot is cleared in the same step that releases its
//! occupant, and every release cancels the piece's animations first.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::animator::{AnimationSignal, AnimationTicket, Animator};
use super::piece::{Attachment, Piece, PieceId, PieceState};
use super::pool::ObjectPool;
use super::ring::SlotRing;
use super::spawn::SpawnSupervisor;
use crate::config::GameConfig;
use crate::consts::{RING_SLOTS, SLOT_ANGLE};
use crate::error::MergeResult;
use crate::{normalize_degrees, polar_to_cartesian, rotate_about};

/// Keeps the tie-break stream independent from the spawn stream
const TIE_BREAK_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Which neighbour of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Prev,
    Next,
}

/// Neighbours whose value equals the occupant's
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchingSides {
    pub prev: bool,
    pub next: bool,
}

impl MatchingSides {
    pub fn any(&self) -> bool {
        self.prev || self.next
    }
}

/// One planned merge between two adjacent occupants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeStep {
    pub survivor: PieceId,
    pub survivor_index: usize,
    pub loser: PieceId,
    pub loser_index: usize,
}

/// Cascade state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadePhase {
    Idle,
    /// Launched piece interpolating into `index`
    Snapping {
        piece: PieceId,
        index: usize,
        ticket: AnimationTicket,
    },
    /// Checking the occupant at `index` for equal neighbours
    Resolving { index: usize },
    /// Loser rotating into the survivor's slot
    Merging {
        step: MergeStep,
        ticket: AnimationTicket,
    },
}

/// Things that happened, drained by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    PiecePrepared { piece: PieceId, value: u32 },
    Launched { piece: PieceId },
    Snapped { piece: PieceId, index: usize },
    DuplicateArrival {
        index: usize,
        kept: PieceId,
        discarded: PieceId,
    },
    Merged {
        index: usize,
        survivor: PieceId,
        loser: PieceId,
        value: u32,
    },
    /// An in-flight animation was cancelled by a newer trigger
    Superseded { piece: PieceId },
    /// A moving piece was stopped before reaching the ring
    LaunchAborted { piece: PieceId },
    /// Cascade finished; the next piece may be prepared
    CycleComplete,
}

/// Ring + pool + cascade orchestrator
pub struct MergeEngine<A> {
    ring: SlotRing,
    pool: ObjectPool<Piece>,
    animator: A,
    spawner: SpawnSupervisor,
    rng: Pcg32,
    category: String,
    max_level: u32,
    launch_speed: f32,
    ring_radius: f32,
    /// Current ring turn (degrees); slot `i` faces `ring_rotation + i * SLOT_ANGLE`
    ring_rotation: f32,
    phase: CascadePhase,
    /// Piece at the launcher or in flight (not yet snapping)
    current: Option<PieceId>,
    /// Slots left unresolved by a superseded cascade
    deferred: Vec<usize>,
    events: Vec<EngineEvent>,
    signals: Vec<AnimationSignal>,
}

impl<A: Animator> MergeEngine<A> {
    /// Build pool and spawner from config
    pub fn new(config: &GameConfig, animator: A) -> MergeResult<Self> {
        config.validate()?;
        let pool = ObjectPool::new(&config.pools)?;
        let spawner = SpawnSupervisor::from_config(config);
        Ok(Self::from_parts(config, pool, animator, spawner))
    }

    /// Assemble an engine from already built collaborators
    pub fn from_parts(
        config: &GameConfig,
        pool: ObjectPool<Piece>,
        animator: A,
        spawner: SpawnSupervisor,
    ) -> Self {
        Self {
            ring: SlotRing::new(),
            pool,
            animator,
            spawner,
            rng: Pcg32::seed_from_u64(config.seed.wrapping_add(TIE_BREAK_SALT)),
            category: config.piece_category.clone(),
            max_level: config.max_level.max(1),
            launch_speed: config.launch_speed,
            ring_radius: config.ring_radius,
            ring_rotation: 0.0,
            phase: CascadePhase::Idle,
            current: None,
            deferred: Vec::new(),
            events: Vec::new(),
            signals: Vec::new(),
        }
    }

    // === Queries ===

    pub fn ring(&self) -> &SlotRing {
        &self.ring
    }

    pub fn pool(&self) -> &ObjectPool<Piece> {
        &self.pool
    }

    pub fn animator(&self) -> &A {
        &self.animator
    }

    pub fn animator_mut(&mut self) -> &mut A {
        &mut self.animator
    }

    pub fn phase(&self) -> CascadePhase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == CascadePhase::Idle
    }

    pub fn progression_level(&self) -> u32 {
        self.spawner.progression_level()
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    pub fn ring_rotation(&self) -> f32 {
        self.ring_rotation
    }

    /// World orientation of slot `index` at the current ring turn
    pub fn slot_rotation(&self, index: usize) -> f32 {
        normalize_degrees(self.ring_rotation + index as f32 * SLOT_ANGLE)
    }

    /// Piece at the launcher or in flight
    pub fn current_piece(&self) -> Option<PieceId> {
        self.current
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pool.get(id)
    }

    /// Value of the occupant at `index`
    pub fn value_at(&self, index: usize) -> Option<u32> {
        self.ring
            .occupant(index)
            .and_then(|id| self.pool.get(id))
            .map(|p| p.value)
    }

    /// Occupant values for every slot
    pub fn values(&self) -> [Option<u32>; RING_SLOTS] {
        std::array::from_fn(|i| self.value_at(i))
    }

    /// Neighbours of `index` that would merge with its occupant
    pub fn matching_sides(&self, index: usize) -> MatchingSides {
        let Some(value) = self.value_at(index) else {
            return MatchingSides::default();
        };
        let neighbours = self.ring.adjacent(index);
        let holds = |id: Option<PieceId>| {
            id.and_then(|id| self.pool.get(id))
                .is_some_and(|p| p.value == value)
        };
        MatchingSides {
            prev: holds(neighbours.prev),
            next: holds(neighbours.next),
        }
    }

    /// No two adjacent occupants share a value
    pub fn is_settled(&self) -> bool {
        (0..RING_SLOTS).all(|i| !self.matching_sides(i).next)
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    // === Launcher ===

    /// Take a piece from the pool and park it at the launcher in `Waiting`
    pub fn prepare_next_piece(&mut self) -> MergeResult<PieceId> {
        self.drop_unlaunched();
        let (id, piece) = self.pool.acquire_mut(&self.category)?;
        let value = self.spawner.prepare(piece);
        self.parked(id, value);
        Ok(id)
    }

    /// Like `prepare_next_piece` with a scripted value instead of a random one
    pub fn prepare_piece_with_value(&mut self, value: u32) -> MergeResult<PieceId> {
        self.drop_unlaunched();
        let value = value.clamp(1, self.max_level);
        let (id, piece) = self.pool.acquire_mut(&self.category)?;
        self.spawner.prepare_with(piece, value);
        self.parked(id, value);
        Ok(id)
    }

    fn drop_unlaunched(&mut self) {
        if let Some(old) = self.current.take() {
            log::debug!("Dropping unlaunched piece {:?}", old);
            self.discard(old);
        }
    }

    fn parked(&mut self, id: PieceId, value: u32) {
        self.current = Some(id);
        self.events.push(EngineEvent::PiecePrepared { piece: id, value });
        log::debug!("Prepared {:?} with value {}", id, value);
    }

    /// Arm the waiting piece for launch
    pub fn arm(&mut self) -> bool {
        self.current_mut().is_some_and(Piece::activate)
    }

    /// Launch the armed piece; ignored unless it is `Active`
    pub fn launch(&mut self) -> bool {
        let launched = self.current_mut().is_some_and(Piece::launch);
        if let (true, Some(piece)) = (launched, self.current) {
            self.events.push(EngineEvent::Launched { piece });
        }
        launched
    }

    /// Stop a moving piece that never reached a trigger and recycle it
    pub fn force_stop(&mut self) -> bool {
        let Some(id) = self.current else {
            return false;
        };
        if !self.pool.get(id).is_some_and(Piece::is_moving) {
            return false;
        }
        log::info!("Moving piece {:?} forced to stop", id);
        self.discard(id);
        self.events.push(EngineEvent::LaunchAborted { piece: id });
        true
    }

    /// Put a locked piece straight into a slot, replacing any occupant
    pub fn place_piece(&mut self, index: usize, value: u32) -> MergeResult<PieceId> {
        let index = SlotRing::checked_index(index as i64)?;
        if let Some(old) = self.ring.occupant(index) {
            self.discard(old);
        }

        let angle = self.slot_rotation(index);
        let pos = polar_to_cartesian(self.ring_radius, angle);
        let value = value.clamp(1, self.max_level);
        let (id, piece) = self.pool.acquire_mut(&self.category)?;
        piece.prepare(value, pos);
        piece.rotation_z = angle;
        piece.activate();
        piece.launch();
        piece.begin_snap();
        piece.lock();
        self.ring.set(index, Some(id));
        Ok(id)
    }

    // === Triggers ===

    /// A trigger zone reported the in-flight piece crossing slot `index`.
    ///
    /// Out-of-range indices are rejected without touching the ring. A
    /// trigger while another cascade is in flight supersedes it.
    pub fn on_piece_trigger(&mut self, index: i64, position: Vec2, rotation: f32) -> MergeResult<()> {
        let index = SlotRing::checked_index(index).inspect_err(|e| {
            log::warn!("Rejected trigger: {e}");
        })?;

        let launched = self
            .current
            .filter(|&id| self.pool.get(id).is_some_and(Piece::is_moving));
        let piece = match (launched, self.phase) {
            (Some(id), _) => id,
            (None, CascadePhase::Snapping { piece, .. }) => piece,
            (None, _) => {
                log::debug!("Trigger at slot {} with no piece in flight", index);
                return Ok(());
            }
        };

        self.supersede(piece);

        if let Some(p) = self.pool.get_mut(piece) {
            p.begin_snap();
        }
        if self.current == Some(piece) {
            self.current = None;
        }
        log::debug!("Snapping {:?} to slot {} ({:?}, {:.1})", piece, index, position, rotation);
        let ticket = self.animator.animate_snap(piece, position, rotation);
        self.phase = CascadePhase::Snapping {
            piece,
            index,
            ticket,
        };
        Ok(())
    }

    // === Simulation ===

    /// Turn the ring by `delta` degrees about the origin.
    ///
    /// Pieces attached to the ring move with it, and so does every
    /// animation target that sits on the ring.
    pub fn rotate_ring(&mut self, delta: f32) {
        if delta == 0.0 {
            return;
        }
        self.ring_rotation = normalize_degrees(self.ring_rotation + delta);

        for (_, occupant) in self.ring.iter() {
            let Some(id) = occupant else { continue };
            if let Some(piece) = self
                .pool
                .get_mut(id)
                .filter(|p| p.attachment() == Attachment::Ring)
            {
                piece.pos = rotate_about(piece.pos, Vec2::ZERO, delta);
                piece.rotation_z = normalize_degrees(piece.rotation_z + delta);
            }
            self.animator.follow_ring(id, delta);
        }
        if let CascadePhase::Snapping { piece, .. } = self.phase {
            self.animator.follow_ring(piece, delta);
        }
    }

    /// Advance motion and animations by `dt`, then drive the cascade
    pub fn tick(&mut self, dt: f32) {
        let speed = self.launch_speed;
        if let Some(piece) = self.current_mut() {
            piece.advance(dt, speed);
        }

        let mut signals = std::mem::take(&mut self.signals);
        self.animator.advance(&mut self.pool, dt, &mut signals);
        for signal in signals.drain(..) {
            self.on_signal(signal);
        }
        self.signals = signals;
    }

    fn on_signal(&mut self, signal: AnimationSignal) {
        match (self.phase, signal) {
            (CascadePhase::Snapping { piece, index, ticket }, AnimationSignal::Completed(t))
                if t == ticket =>
            {
                self.finish_snap(piece, index);
            }
            (CascadePhase::Snapping { piece, ticket, .. }, AnimationSignal::Cancelled(t))
                if t == ticket =>
            {
                log::warn!("Snap of {:?} cancelled externally", piece);
                self.discard(piece);
                self.end_cascade();
            }
            (CascadePhase::Merging { step, ticket }, AnimationSignal::Completed(t)) if t == ticket => {
                self.finish_merge(step);
            }
            (CascadePhase::Merging { step, ticket }, AnimationSignal::Cancelled(t)) if t == ticket => {
                log::warn!("Merge rotation of {:?} cancelled externally, re-resolving", step.loser);
                self.phase = CascadePhase::Resolving {
                    index: step.survivor_index,
                };
            }
            _ => {
                log::trace!("Ignoring stale animation ticket {:?}", signal.ticket());
                return;
            }
        }
        self.resolve();
    }

    /// Cancel whatever the in-flight cascade is waiting on
    fn supersede(&mut self, incoming: PieceId) {
        match std::mem::replace(&mut self.phase, CascadePhase::Idle) {
            CascadePhase::Idle => {}
            CascadePhase::Snapping { piece, index, .. } => {
                self.animator.cancel(piece);
                if piece == incoming {
                    log::debug!("Re-targeting snap of {:?} (was slot {})", piece, index);
                } else {
                    log::info!("Snap of {:?} superseded", piece);
                    self.discard(piece);
                    self.events.push(EngineEvent::Superseded { piece });
                }
            }
            CascadePhase::Resolving { index } => self.deferred.push(index),
            CascadePhase::Merging { step, .. } => {
                log::info!(
                    "Merge {} -> {} superseded, slot {} deferred",
                    step.loser_index,
                    step.survivor_index,
                    step.survivor_index
                );
                self.animator.cancel(step.loser);
                self.deferred.push(step.survivor_index);
                self.events.push(EngineEvent::Superseded { piece: step.loser });
            }
        }
    }

    fn finish_snap(&mut self, piece: PieceId, index: usize) {
        let Some(launched_value) = self.pool.get_mut(piece).map(|p| {
            p.lock();
            p.value
        }) else {
            log::warn!("Snapped piece {:?} no longer in play", piece);
            self.end_cascade();
            return;
        };

        let incumbent = self
            .ring
            .occupant(index)
            .and_then(|id| self.pool.get(id).map(|p| (id, p.value)));

        match incumbent {
            None => {
                self.ring.set(index, Some(piece));
                self.events.push(EngineEvent::Snapped { piece, index });
            }
            Some((incumbent, incumbent_value)) => {
                // Higher value keeps the slot; ties go to the incumbent
                let (kept, discarded) = if launched_value > incumbent_value {
                    (piece, incumbent)
                } else {
                    (incumbent, piece)
                };
                self.discard(discarded);
                self.ring.set(index, Some(kept));
                log::debug!("Duplicate arrival at slot {}: kept {:?}", index, kept);
                self.events.push(EngineEvent::DuplicateArrival {
                    index,
                    kept,
                    discarded,
                });
            }
        }
        self.phase = CascadePhase::Resolving { index };
    }

    /// Evaluate until the cascade suspends on an animation or goes idle
    fn resolve(&mut self) {
        while let CascadePhase::Resolving { index } = self.phase {
            match self.plan_step(index) {
                Some(step) => self.start_merge(step),
                None => self.end_cascade(),
            }
        }
    }

    /// Pick the merge partner and direction for the occupant at `index`
    fn plan_step(&mut self, index: usize) -> Option<MergeStep> {
        let occupant = self.ring.occupant(index)?;
        let sides = self.matching_sides(index);
        let side = match (sides.prev, sides.next) {
            (true, true) => {
                if self.rng.random_bool(0.5) {
                    Side::Prev
                } else {
                    Side::Next
                }
            }
            (true, false) => Side::Prev,
            (false, true) => Side::Next,
            (false, false) => return None,
        };
        let target_index = match side {
            Side::Prev => SlotRing::prev_index(index),
            Side::Next => SlotRing::next_index(index),
        };
        let target = self.ring.occupant(target_index)?;

        // Second, independent flip: who moves into whose slot
        let occupant_survives = self.rng.random_bool(0.5);
        Some(if occupant_survives {
            MergeStep {
                survivor: occupant,
                survivor_index: index,
                loser: target,
                loser_index: target_index,
            }
        } else {
            MergeStep {
                survivor: target,
                survivor_index: target_index,
                loser: occupant,
                loser_index: index,
            }
        })
    }

    fn start_merge(&mut self, step: MergeStep) {
        if !self.pool.is_in_use(step.survivor) {
            log::warn!("Merge survivor {:?} missing", step.survivor);
            self.end_cascade();
            return;
        }
        let target_angle = self.slot_rotation(step.survivor_index);
        log::debug!(
            "Merging slot {} into slot {}",
            step.loser_index,
            step.survivor_index
        );
        let ticket = self.animator.animate_rotate(step.loser, target_angle);
        self.phase = CascadePhase::Merging { step, ticket };
    }

    fn finish_merge(&mut self, step: MergeStep) {
        let consistent = self.ring.occupant(step.survivor_index) == Some(step.survivor)
            && self.ring.occupant(step.loser_index) == Some(step.loser);
        let loser_value = self.pool.get(step.loser).map(|p| p.value);
        let (true, Some(loser_value)) = (consistent, loser_value) else {
            log::warn!(
                "Inconsistent occupancy merging slot {} into {}, cascade stopped",
                step.loser_index,
                step.survivor_index
            );
            self.end_cascade();
            return;
        };

        let value = (loser_value + 1).min(self.max_level);
        match self.pool.get_mut(step.survivor) {
            Some(survivor) => survivor.value = value,
            None => {
                self.end_cascade();
                return;
            }
        }
        self.spawner.raise_progression(value);
        self.discard(step.loser);
        self.events.push(EngineEvent::Merged {
            index: step.survivor_index,
            survivor: step.survivor,
            loser: step.loser,
            value,
        });
        self.phase = CascadePhase::Resolving {
            index: step.survivor_index,
        };
    }

    /// Resume a deferred slot, or go idle
    fn end_cascade(&mut self) {
        if let Some(index) = self.deferred.pop() {
            self.phase = CascadePhase::Resolving { index };
            return;
        }
        self.phase = CascadePhase::Idle;
        self.events.push(EngineEvent::CycleComplete);
    }

    /// Cancel animations, clear ring occupancy and hand back to the pool
    fn discard(&mut self, piece: PieceId) {
        self.animator.cancel(piece);
        if let Some(index) = self.ring.position_of(piece) {
            self.ring.set(index, None);
        }
        if self.current == Some(piece) {
            self.current = None;
        }
        self.pool.release(piece);
    }

    fn current_mut(&mut self) -> Option<&mut Piece> {
        self.current.and_then(|id| self.pool.get_mut(id))
    }

    /// State of the piece at the launcher or in flight
    pub fn current_state(&self) -> Option<PieceState> {
        self.current.and_then(|id| self.pool.get(id)).map(Piece::state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::error::MergeError;
    use crate::shortest_delta_degrees;
    use crate::sim::animator::TweenAnimator;

    fn engine() -> MergeEngine<TweenAnimator> {
        let config = GameConfig::default();
        MergeEngine::new(&config, TweenAnimator::from_config(&config)).unwrap()
    }

    /// Launch a piece of `value` and report it crossing slot `index`
    fn fire(engine: &mut MergeEngine<TweenAnimator>, index: usize, value: u32) -> PieceId {
        let id = engine.prepare_piece_with_value(value).unwrap();
        assert!(engine.arm());
        assert!(engine.launch());
        let angle = index as f32 * SLOT_ANGLE;
        engine
            .on_piece_trigger(index as i64, polar_to_cartesian(3.0, angle), angle)
            .unwrap();
        id
    }

    fn settle(engine: &mut MergeEngine<TweenAnimator>) {
        for _ in 0..10_000 {
            if engine.is_idle() {
                return;
            }
            engine.tick(SIM_DT);
        }
        panic!("cascade never settled");
    }

    #[test]
    fn test_out_of_range_trigger_rejected() {
        let mut engine = engine();
        engine.place_piece(0, 1).unwrap();
        engine.prepare_next_piece().unwrap();
        engine.arm();
        engine.launch();

        for bad in [8, -1, 100] {
            let err = engine.on_piece_trigger(bad, Vec2::ZERO, 0.0).unwrap_err();
            assert!(matches!(err, MergeError::InvalidSlotIndex { .. }));
        }
        assert!(engine.is_idle());
        assert_eq!(engine.values()[0], Some(1));
        assert_eq!(engine.ring().occupied_count(), 1);
        assert_eq!(engine.current_state(), Some(PieceState::Moving));
    }

    #[test]
    fn test_trigger_without_flight_is_ignored() {
        let mut engine = engine();
        engine.prepare_next_piece().unwrap();
        // Waiting, never launched
        engine.on_piece_trigger(2, Vec2::ZERO, 0.0).unwrap();
        assert!(engine.is_idle());
        assert_eq!(engine.current_state(), Some(PieceState::Waiting));
    }

    #[test]
    fn test_launch_before_arm_is_noop() {
        let mut engine = engine();
        engine.prepare_next_piece().unwrap();
        assert!(!engine.launch());
        engine.tick(SIM_DT);
        assert_eq!(engine.current_state(), Some(PieceState::Waiting));
        assert!(!engine.drain_events().iter().any(|e| matches!(e, EngineEvent::Launched { .. })));
    }

    #[test]
    fn test_moving_piece_advances_each_tick() {
        let mut engine = engine();
        let id = engine.prepare_next_piece().unwrap();
        let start = engine.piece(id).unwrap().pos;
        engine.arm();
        engine.launch();
        engine.tick(SIM_DT);
        engine.tick(SIM_DT);
        let piece = engine.piece(id).unwrap();
        assert!(piece.pos.y > start.y);
        assert!((piece.travelled - 2.0 * SIM_DT * 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_matching_sides_and_settled() {
        let mut engine = engine();
        engine.place_piece(0, 2).unwrap();
        engine.place_piece(1, 2).unwrap();
        engine.place_piece(7, 2).unwrap();
        let sides = engine.matching_sides(0);
        assert!(sides.prev && sides.next);
        assert!(!engine.is_settled());
        assert!(!engine.matching_sides(4).any());
    }

    #[test]
    fn test_merge_at_max_level_stays_capped() {
        let mut engine = engine();
        engine.place_piece(0, 5).unwrap();
        engine.place_piece(1, 5).unwrap();
        fire(&mut engine, 0, 5);
        settle(&mut engine);

        assert_eq!(engine.ring().occupied_count(), 1);
        let value = engine.values().iter().flatten().copied().next();
        assert_eq!(value, Some(5));
        assert_eq!(engine.progression_level(), 5);
    }

    #[test]
    fn test_higher_arrival_takes_slot() {
        let mut engine = engine();
        let incumbent = engine.place_piece(4, 1).unwrap();
        let launched = fire(&mut engine, 4, 3);
        settle(&mut engine);

        assert_eq!(engine.ring().occupant(4), Some(launched));
        assert_eq!(engine.values()[4], Some(3));
        assert!(!engine.pool().is_in_use(incumbent));
        assert!(engine.drain_events().contains(&EngineEvent::DuplicateArrival {
            index: 4,
            kept: launched,
            discarded: incumbent,
        }));
    }

    #[test]
    fn test_merge_raises_progression() {
        let mut engine = engine();
        assert_eq!(engine.progression_level(), 1);
        engine.place_piece(2, 1).unwrap();
        fire(&mut engine, 3, 1);
        settle(&mut engine);
        assert_eq!(engine.progression_level(), 2);
        assert_eq!(engine.ring().occupied_count(), 1);
    }

    #[test]
    fn test_force_stop_recycles_moving_piece() {
        let mut engine = engine();
        let id = engine.prepare_next_piece().unwrap();
        assert!(!engine.force_stop());
        engine.arm();
        engine.launch();
        assert!(engine.force_stop());
        assert!(!engine.pool().is_in_use(id));
        assert!(engine.current_piece().is_none());
        assert!(engine
            .drain_events()
            .contains(&EngineEvent::LaunchAborted { piece: id }));
    }

    #[test]
    fn test_external_merge_cancel_retries_step() {
        let mut engine = engine();
        engine.place_piece(5, 2).unwrap();
        fire(&mut engine, 6, 2);
        while !matches!(engine.phase(), CascadePhase::Merging { .. }) {
            engine.tick(SIM_DT);
        }
        let CascadePhase::Merging { step, .. } = engine.phase() else {
            unreachable!();
        };
        engine.animator_mut().cancel(step.loser);
        settle(&mut engine);

        assert!(engine.is_settled());
        assert_eq!(engine.ring().occupied_count(), 1);
    }

    #[test]
    fn test_external_snap_cancel_recycles_piece() {
        let mut engine = engine();
        let resident = engine.place_piece(5, 3).unwrap();
        let id = fire(&mut engine, 2, 1);
        engine.tick(SIM_DT);
        assert!(matches!(engine.phase(), CascadePhase::Snapping { piece, .. } if piece == id));

        assert_eq!(engine.animator_mut().cancel(id), 1);
        engine.tick(SIM_DT);

        assert!(engine.is_idle());
        assert!(!engine.pool().is_in_use(id));
        assert_eq!(engine.ring().occupant(2), None);
        assert_eq!(engine.ring().occupant(5), Some(resident));
        assert!(engine.pool().is_in_use(resident));
        assert!(engine.drain_events().contains(&EngineEvent::CycleComplete));
    }

    #[test]
    fn test_merge_follows_turning_ring() {
        let mut engine = engine();
        engine.rotate_ring(30.0);
        engine.place_piece(4, 2).unwrap();
        engine.prepare_piece_with_value(2).unwrap();
        engine.arm();
        engine.launch();
        let angle = engine.slot_rotation(3);
        engine
            .on_piece_trigger(3, polar_to_cartesian(3.0, angle), angle)
            .unwrap();

        let mut last_gap = f32::MAX;
        let mut merged = false;
        for _ in 0..600 {
            engine.rotate_ring(1.5);
            engine.tick(SIM_DT);
            if let CascadePhase::Merging { step, .. } = engine.phase() {
                let loser = engine.piece(step.loser).unwrap();
                let target = engine.slot_rotation(step.survivor_index);
                let gap = shortest_delta_degrees(loser.rotation_z, target).abs();
                // Short way round, closing in every tick
                assert!(gap <= SLOT_ANGLE + 1e-3, "gap {gap}");
                assert!(gap < last_gap);
                last_gap = gap;
            }
            merged |= engine
                .drain_events()
                .iter()
                .any(|e| matches!(e, EngineEvent::Merged { value: 3, .. }));
            if engine.is_idle() {
                break;
            }
        }
        assert!(merged);
        assert_eq!(engine.ring().occupied_count(), 1);

        for (index, occupant) in engine.ring().iter() {
            let Some(id) = occupant else { continue };
            let piece = engine.piece(id).unwrap();
            let facing = engine.slot_rotation(index);
            assert!(shortest_delta_degrees(piece.rotation_z, facing).abs() < 1e-2);
            assert!((piece.pos - polar_to_cartesian(3.0, facing)).length() < 1e-2);
        }
    }
}
