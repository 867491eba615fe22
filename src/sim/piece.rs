//! Pieces and their lifecycle state machine
//!
//! `Waiting -> Active -> Moving -> Snapping -> Locked`, plus `Recycled`
//! while the piece sits in its pool. Transition methods return `false` and
//! leave the piece untouched when called from the wrong state.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::pool::{PoolId, Poolable};

/// Identity of a pooled piece
pub type PieceId = PoolId;

/// Lifecycle state of a piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceState {
    /// Spawned at the launcher, not yet controllable
    Waiting,
    /// Armed, the next click launches it
    Active,
    /// Flying forward every tick until a trigger fires
    Moving,
    /// Interpolating toward a slot target
    Snapping,
    /// Sitting in the ring as an occupant
    Locked,
    /// Inactive inside the pool
    Recycled,
}

/// What a piece is currently bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attachment {
    Detached,
    Launcher,
    Ring,
}

/// One in-play piece
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub category: String,
    /// Merge value, grows only through merges
    pub value: u32,
    pub pos: Vec2,
    /// Visual orientation (degrees)
    pub rotation_z: f32,
    /// Unit direction of travel while moving
    pub heading: Vec2,
    /// Distance covered since launch
    pub travelled: f32,
    state: PieceState,
    attachment: Attachment,
}

impl Piece {
    pub fn state(&self) -> PieceState {
        self.state
    }

    pub fn attachment(&self) -> Attachment {
        self.attachment
    }

    /// Reset to `Waiting` at the launcher with a fresh value
    pub fn prepare(&mut self, value: u32, origin: Vec2) {
        self.value = value;
        self.pos = origin;
        self.rotation_z = 0.0;
        self.heading = Vec2::Y;
        self.travelled = 0.0;
        self.state = PieceState::Waiting;
        self.attachment = Attachment::Launcher;
    }

    /// `Waiting -> Active`
    pub fn activate(&mut self) -> bool {
        if self.state != PieceState::Waiting {
            return false;
        }
        self.state = PieceState::Active;
        true
    }

    /// `Active -> Moving`
    pub fn launch(&mut self) -> bool {
        if self.state != PieceState::Active {
            return false;
        }
        self.state = PieceState::Moving;
        true
    }

    /// Advance along the heading; only moving pieces move
    pub fn advance(&mut self, dt: f32, speed: f32) -> bool {
        if self.state != PieceState::Moving {
            return false;
        }
        let step = speed * dt;
        self.pos += self.heading * step;
        self.travelled += step;
        true
    }

    /// `Moving -> Snapping`, or re-target while already snapping
    pub fn begin_snap(&mut self) -> bool {
        match self.state {
            PieceState::Moving | PieceState::Snapping => {
                self.state = PieceState::Snapping;
                true
            }
            _ => false,
        }
    }

    /// `Snapping -> Locked`, the piece now belongs to the ring
    pub fn lock(&mut self) -> bool {
        if self.state != PieceState::Snapping {
            return false;
        }
        self.state = PieceState::Locked;
        self.attachment = Attachment::Ring;
        true
    }

    pub fn is_moving(&self) -> bool {
        self.state == PieceState::Moving
    }
}

impl Poolable for Piece {
    fn instantiate(id: PoolId, category: &str) -> Self {
        Self {
            id,
            category: category.to_string(),
            value: 0,
            pos: Vec2::ZERO,
            rotation_z: 0.0,
            heading: Vec2::Y,
            travelled: 0.0,
            state: PieceState::Recycled,
            attachment: Attachment::Detached,
        }
    }

    fn on_acquire(&mut self) {
        self.value = 1;
        self.pos = Vec2::ZERO;
        self.rotation_z = 0.0;
        self.heading = Vec2::Y;
        self.travelled = 0.0;
        self.state = PieceState::Waiting;
        self.attachment = Attachment::Detached;
    }

    fn on_release(&mut self) {
        self.state = PieceState::Recycled;
        self.attachment = Attachment::Detached;
        self.pos = Vec2::ZERO;
        self.travelled = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Piece {
        let mut piece = Piece::instantiate(PoolId(0), "Piece");
        piece.on_acquire();
        piece.prepare(2, Vec2::new(0.0, -6.0));
        piece
    }

    #[test]
    fn test_full_lifecycle() {
        let mut piece = fresh();
        assert_eq!(piece.state(), PieceState::Waiting);
        assert_eq!(piece.attachment(), Attachment::Launcher);
        assert!(piece.activate());
        assert!(piece.launch());
        assert!(piece.advance(0.5, 2.0));
        assert!((piece.pos.y - (-5.0)).abs() < 1e-5);
        assert!((piece.travelled - 1.0).abs() < 1e-5);
        assert!(piece.begin_snap());
        assert!(piece.lock());
        assert_eq!(piece.state(), PieceState::Locked);
        assert_eq!(piece.attachment(), Attachment::Ring);
    }

    #[test]
    fn test_launch_requires_active() {
        let mut piece = fresh();
        // Still waiting - ignored
        assert!(!piece.launch());
        assert_eq!(piece.state(), PieceState::Waiting);
        assert!(!piece.advance(1.0, 10.0));
        assert_eq!(piece.pos, Vec2::new(0.0, -6.0));
    }

    #[test]
    fn test_invalid_transitions_are_noops() {
        let mut piece = fresh();
        assert!(!piece.lock());
        assert!(!piece.begin_snap());
        piece.activate();
        assert!(!piece.activate());
        assert_eq!(piece.state(), PieceState::Active);
    }

    #[test]
    fn test_snap_can_retarget() {
        let mut piece = fresh();
        piece.activate();
        piece.launch();
        assert!(piece.begin_snap());
        assert!(piece.begin_snap());
        assert_eq!(piece.state(), PieceState::Snapping);
    }

    #[test]
    fn test_release_recycles() {
        let mut piece = fresh();
        piece.activate();
        piece.on_release();
        assert_eq!(piece.state(), PieceState::Recycled);
        assert_eq!(piece.attachment(), Attachment::Detached);
        assert!(!piece.activate());
    }
}
