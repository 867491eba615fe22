//! Game configuration
//!
//! Loaded once per session from JSON. Pool batch sizes are fixed for the
//! lifetime of the pool built from them.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{MergeError, MergeResult};

/// One pool template: a category and how many instances to create per batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub category: String,
    /// Instances created up front and on every growth
    pub pooling_count: usize,
}

impl PoolEntry {
    pub fn new(category: impl Into<String>, pooling_count: usize) -> Self {
        Self {
            category: category.into(),
            pooling_count,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Run seed for reproducibility
    pub seed: u64,

    // === Progression ===
    /// Merge results are capped at this value
    pub max_level: u32,
    /// Progression level at session start (spawns draw from 1..=level)
    pub initial_level: u32,

    // === Pooling ===
    /// Pool category launched pieces are drawn from
    pub piece_category: String,
    pub pools: Vec<PoolEntry>,

    // === Motion (units per second, degrees per second) ===
    pub launch_speed: f32,
    pub snap_speed: f32,
    pub rotate_speed: f32,
    /// Snap completes once the piece is this close to its target
    pub snap_epsilon: f32,
    /// Rotations complete once within this many degrees of the target
    pub angle_epsilon: f32,

    // === Ring geometry ===
    /// Ring spin per simulation tick (degrees)
    pub ring_spin_per_tick: f32,
    pub ring_radius: f32,
    /// Distance from a zone centre at which a moving piece triggers it
    pub trigger_radius: f32,
    /// Where new pieces wait before launch
    pub launch_origin: Vec2,
    /// Moving pieces that travel further than this are forced to stop
    pub max_travel: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,

            max_level: DEFAULT_MAX_LEVEL,
            initial_level: 1,

            piece_category: PIECE_CATEGORY.to_string(),
            pools: vec![PoolEntry::new(PIECE_CATEGORY, DEFAULT_POOLING_COUNT)],

            launch_speed: 12.0,
            snap_speed: 20.0,
            rotate_speed: 540.0,
            snap_epsilon: 0.01,
            angle_epsilon: 0.5,

            ring_spin_per_tick: 1.5,
            ring_radius: 3.0,
            trigger_radius: 1.2,
            launch_origin: Vec2::new(0.0, -6.0),
            max_travel: 12.0,
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> MergeResult<Self> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> MergeResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Pool batch size for a category, if registered
    pub fn pooling_count(&self, category: &str) -> Option<usize> {
        self.pools
            .iter()
            .find(|p| p.category == category)
            .map(|p| p.pooling_count)
    }

    /// Reject configurations the simulation cannot run with
    pub fn validate(&self) -> MergeResult<()> {
        if self.max_level == 0 {
            return Err(MergeError::InvalidConfig("max_level must be at least 1".into()));
        }
        if self.initial_level == 0 || self.initial_level > self.max_level {
            return Err(MergeError::InvalidConfig(format!(
                "initial_level {} must be within 1..={}",
                self.initial_level, self.max_level
            )));
        }
        match self.pooling_count(&self.piece_category) {
            None => {
                return Err(MergeError::InvalidConfig(format!(
                    "no pool registered for piece category {:?}",
                    self.piece_category
                )));
            }
            Some(0) => {
                return Err(MergeError::InvalidConfig(format!(
                    "pooling_count for {:?} must be positive",
                    self.piece_category
                )));
            }
            Some(_) => {}
        }
        let speeds = [
            ("launch_speed", self.launch_speed),
            ("snap_speed", self.snap_speed),
            ("rotate_speed", self.rotate_speed),
            ("snap_epsilon", self.snap_epsilon),
            ("angle_epsilon", self.angle_epsilon),
        ];
        for (name, value) in speeds {
            if !(value.is_finite() && value > 0.0) {
                return Err(MergeError::InvalidConfig(format!("{name} must be positive")));
            }
        }
        Ok(())
    }
}
