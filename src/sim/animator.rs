//! Animated transitions as awaitable tickets
//!
//! Every request returns an `AnimationTicket`. The backend later reports
//! exactly one `AnimationSignal` for it: `Completed` when the piece reaches
//! its target, or `Cancelled` if `cancel` ran first. Completion is
//! geometric (distance / angle thresholds), never a wall-clock deadline.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::piece::{Piece, PieceId};
use super::pool::ObjectPool;
use crate::config::GameConfig;
use crate::{normalize_degrees, rotate_about, shortest_delta_degrees};

/// Handle to one requested animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimationTicket(pub u64);

/// Outcome of a ticket, reported once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationSignal {
    Completed(AnimationTicket),
    Cancelled(AnimationTicket),
}

impl AnimationSignal {
    pub fn ticket(&self) -> AnimationTicket {
        match *self {
            AnimationSignal::Completed(t) | AnimationSignal::Cancelled(t) => t,
        }
    }
}

/// Animation backend driven by the simulation tick
pub trait Animator {
    /// Interpolate a piece to a fixed position and orientation
    fn animate_snap(&mut self, piece: PieceId, position: Vec2, rotation: f32) -> AnimationTicket;

    /// Turn a piece (around the ring) to a target orientation
    fn animate_rotate(&mut self, piece: PieceId, target_angle: f32) -> AnimationTicket;

    /// Cancel every outstanding animation of `piece`; returns how many
    fn cancel(&mut self, piece: PieceId) -> usize;

    fn is_animating(&self, piece: PieceId) -> bool;

    /// The ring turned by `delta` degrees; targets of `piece` turn with it
    fn follow_ring(&mut self, piece: PieceId, delta: f32);

    /// Step all animations by `dt` and append the signals produced
    fn advance(&mut self, pieces: &mut ObjectPool<Piece>, dt: f32, signals: &mut Vec<AnimationSignal>);
}

#[derive(Debug, Clone, Copy)]
enum TweenKind {
    Snap { position: Vec2, rotation: f32 },
    Rotate { target: f32 },
}

#[derive(Debug, Clone, Copy)]
struct Tween {
    ticket: AnimationTicket,
    piece: PieceId,
    kind: TweenKind,
}

/// Constant-speed tween backend
#[derive(Debug, Clone)]
pub struct TweenAnimator {
    /// Units per second
    pub snap_speed: f32,
    /// Degrees per second
    pub rotate_speed: f32,
    pub snap_epsilon: f32,
    pub angle_epsilon: f32,
    /// Centre the ring rotates around
    pub pivot: Vec2,
    tweens: Vec<Tween>,
    cancelled: Vec<AnimationTicket>,
    next_ticket: u64,
}

impl TweenAnimator {
    pub fn new(snap_speed: f32, rotate_speed: f32, snap_epsilon: f32, angle_epsilon: f32) -> Self {
        Self {
            snap_speed,
            rotate_speed,
            snap_epsilon,
            angle_epsilon,
            pivot: Vec2::ZERO,
            tweens: Vec::new(),
            cancelled: Vec::new(),
            next_ticket: 1,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(
            config.snap_speed,
            config.rotate_speed,
            config.snap_epsilon,
            config.angle_epsilon,
        )
    }

    /// Outstanding tweens
    pub fn pending(&self) -> usize {
        self.tweens.len()
    }

    fn push(&mut self, piece: PieceId, kind: TweenKind) -> AnimationTicket {
        let ticket = AnimationTicket(self.next_ticket);
        self.next_ticket += 1;
        self.tweens.push(Tween { ticket, piece, kind });
        ticket
    }

    /// Step one tween; true once it reached its target
    fn step(&self, tween: &Tween, piece: &mut Piece, dt: f32) -> bool {
        let max_turn = self.rotate_speed * dt;
        match tween.kind {
            TweenKind::Snap { position, rotation } => {
                let to_target = position - piece.pos;
                let dist = to_target.length();
                let max_move = self.snap_speed * dt;
                if dist <= max_move {
                    piece.pos = position;
                } else {
                    piece.pos += to_target / dist * max_move;
                }

                let turn = shortest_delta_degrees(piece.rotation_z, rotation);
                piece.rotation_z = normalize_degrees(piece.rotation_z + turn.clamp(-max_turn, max_turn));

                let arrived = piece.pos.distance(position) <= self.snap_epsilon;
                let aligned = shortest_delta_degrees(piece.rotation_z, rotation).abs() <= self.angle_epsilon;
                if arrived && aligned {
                    piece.pos = position;
                    piece.rotation_z = normalize_degrees(rotation);
                    return true;
                }
                false
            }
            TweenKind::Rotate { target } => {
                let remaining = shortest_delta_degrees(piece.rotation_z, target);
                let turn = if remaining.abs() <= self.angle_epsilon.max(max_turn) {
                    remaining
                } else {
                    remaining.clamp(-max_turn, max_turn)
                };
                piece.rotation_z = normalize_degrees(piece.rotation_z + turn);
                piece.pos = rotate_about(piece.pos, self.pivot, turn);
                turn == remaining
            }
        }
    }
}

impl Animator for TweenAnimator {
    fn animate_snap(&mut self, piece: PieceId, position: Vec2, rotation: f32) -> AnimationTicket {
        self.push(piece, TweenKind::Snap { position, rotation })
    }

    fn animate_rotate(&mut self, piece: PieceId, target_angle: f32) -> AnimationTicket {
        self.push(piece, TweenKind::Rotate { target: target_angle })
    }

    fn cancel(&mut self, piece: PieceId) -> usize {
        let before = self.tweens.len();
        let cancelled = &mut self.cancelled;
        self.tweens.retain(|t| {
            if t.piece == piece {
                cancelled.push(t.ticket);
                false
            } else {
                true
            }
        });
        before - self.tweens.len()
    }

    fn is_animating(&self, piece: PieceId) -> bool {
        self.tweens.iter().any(|t| t.piece == piece)
    }

    fn follow_ring(&mut self, piece: PieceId, delta: f32) {
        let pivot = self.pivot;
        for tween in self.tweens.iter_mut().filter(|t| t.piece == piece) {
            tween.kind = match tween.kind {
                TweenKind::Snap { position, rotation } => TweenKind::Snap {
                    position: rotate_about(position, pivot, delta),
                    rotation: normalize_degrees(rotation + delta),
                },
                TweenKind::Rotate { target } => TweenKind::Rotate {
                    target: normalize_degrees(target + delta),
                },
            };
        }
    }

    fn advance(&mut self, pieces: &mut ObjectPool<Piece>, dt: f32, signals: &mut Vec<AnimationSignal>) {
        signals.extend(self.cancelled.drain(..).map(AnimationSignal::Cancelled));

        let mut tweens = std::mem::take(&mut self.tweens);
        tweens.retain(|tween| match pieces.get_mut(tween.piece) {
            // Piece went back to the pool without a cancel
            None => {
                signals.push(AnimationSignal::Cancelled(tween.ticket));
                false
            }
            Some(piece) => {
                if self.step(tween, piece, dt) {
                    signals.push(AnimationSignal::Completed(tween.ticket));
                    false
                } else {
                    true
                }
            }
        });
        // Requests made while stepping are impossible (no callbacks), so a
        // plain swap back is enough.
        self.tweens = tweens;
    }
}
