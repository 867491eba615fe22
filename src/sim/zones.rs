//! Ring spin and the trigger zones that report slot crossings
//!
//! Zone `i` sits on the ring at local angle `i * SLOT_ANGLE`. World
//! positions follow the ring's current rotation around the origin.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::consts::{RING_SLOTS, SLOT_ANGLE};
use crate::{normalize_degrees, polar_to_cartesian};

/// A trigger report: slot index plus the snap target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PieceTrigger {
    pub index: usize,
    pub position: Vec2,
    /// Zone orientation (degrees)
    pub rotation: f32,
}

/// Spins the ring once play has started
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingRotor {
    /// Degrees per tick
    pub spin_per_tick: f32,
    rotation: f32,
    started: bool,
}

impl RingRotor {
    pub fn new(spin_per_tick: f32) -> Self {
        Self {
            spin_per_tick,
            rotation: 0.0,
            started: false,
        }
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn start(&mut self) {
        self.started = true;
    }

    /// Advance one tick and return the turn applied (zero before `start`)
    pub fn tick(&mut self) -> f32 {
        if !self.started {
            return 0.0;
        }
        self.rotation = normalize_degrees(self.rotation + self.spin_per_tick);
        self.spin_per_tick
    }
}

/// The fixed set of slot trigger zones
#[derive(Debug, Clone)]
pub struct TriggerZones {
    pub ring_radius: f32,
    pub trigger_radius: f32,
}

impl TriggerZones {
    pub fn new(ring_radius: f32, trigger_radius: f32) -> Self {
        Self {
            ring_radius,
            trigger_radius,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(config.ring_radius, config.trigger_radius)
    }

    /// World orientation of zone `index` (degrees)
    pub fn zone_rotation(&self, index: usize, ring_rotation: f32) -> f32 {
        normalize_degrees(ring_rotation + index as f32 * SLOT_ANGLE)
    }

    /// World centre of zone `index`
    pub fn zone_center(&self, index: usize, ring_rotation: f32) -> Vec2 {
        polar_to_cartesian(self.ring_radius, self.zone_rotation(index, ring_rotation))
    }

    /// First zone (by index) the piece at `pos` is inside
    pub fn detect(&self, ring_rotation: f32, pos: Vec2) -> Option<PieceTrigger> {
        (0..RING_SLOTS).find_map(|index| {
            let center = self.zone_center(index, ring_rotation);
            (center.distance(pos) <= self.trigger_radius).then(|| PieceTrigger {
                index,
                position: center,
                rotation: self.zone_rotation(index, ring_rotation),
            })
        })
    }
}
