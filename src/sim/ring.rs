//! Fixed-size circular ring of slots
//!
//! Slots hold piece ids, not pieces: occupancy only. Indices handed to the
//! accessors are produced internally and always in range; the single
//! external entry point goes through `SlotRing::checked_index` first.

use serde::{Deserialize, Serialize};

use super::piece::PieceId;
use crate::consts::RING_SLOTS;
use crate::error::{MergeError, MergeResult};

/// Occupants on either side of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjacent {
    pub prev: Option<PieceId>,
    pub next: Option<PieceId>,
}

/// Circular buffer of `RING_SLOTS` optional occupants
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRing {
    slots: [Option<PieceId>; RING_SLOTS],
}

impl SlotRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn len(&self) -> usize {
        RING_SLOTS
    }

    /// Validate an externally supplied index
    pub fn checked_index(index: i64) -> MergeResult<usize> {
        if (0..RING_SLOTS as i64).contains(&index) {
            Ok(index as usize)
        } else {
            Err(MergeError::InvalidSlotIndex {
                index,
                slots: RING_SLOTS,
            })
        }
    }

    #[inline]
    pub const fn next_index(i: usize) -> usize {
        (i + 1) % RING_SLOTS
    }

    #[inline]
    pub const fn prev_index(i: usize) -> usize {
        (i + RING_SLOTS - 1) % RING_SLOTS
    }

    #[inline]
    pub fn occupant(&self, i: usize) -> Option<PieceId> {
        self.slots[i]
    }

    /// Sole mutator of occupancy
    #[inline]
    pub fn set(&mut self, i: usize, piece: Option<PieceId>) {
        self.slots[i] = piece;
    }

    pub fn adjacent(&self, i: usize) -> Adjacent {
        Adjacent {
            prev: self.slots[Self::prev_index(i)],
            next: self.slots[Self::next_index(i)],
        }
    }

    /// Slot currently holding `piece`
    pub fn position_of(&self, piece: PieceId) -> Option<usize> {
        self.slots.iter().position(|&s| s == Some(piece))
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// `(index, occupant)` for every slot, in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<PieceId>)> + '_ {
        self.slots.iter().copied().enumerate()
    }
}
