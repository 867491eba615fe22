//! Next-piece values and the progression level

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::piece::Piece;
use crate::config::GameConfig;

/// Produces values for launched pieces from the current progression level
#[derive(Debug, Clone)]
pub struct SpawnSupervisor {
    rng: Pcg32,
    level: u32,
    max_level: u32,
    origin: Vec2,
}

impl SpawnSupervisor {
    pub fn new(seed: u64, initial_level: u32, max_level: u32, origin: Vec2) -> Self {
        let max_level = max_level.max(1);
        Self {
            rng: Pcg32::seed_from_u64(seed),
            level: initial_level.clamp(1, max_level),
            max_level,
            origin,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(
            config.seed,
            config.initial_level,
            config.max_level,
            config.launch_origin,
        )
    }

    /// Highest value the next spawn can have
    pub fn progression_level(&self) -> u32 {
        self.level
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Uniform in `1..=progression_level`
    pub fn next_piece_value(&mut self) -> u32 {
        self.rng.random_range(1..=self.level)
    }

    /// Raise the progression level to `value`; never lowers it
    pub fn raise_progression(&mut self, value: u32) {
        let value = value.min(self.max_level);
        if value > self.level {
            log::info!("Progression level {} -> {}", self.level, value);
            self.level = value;
        }
    }

    /// Reset a pooled piece to `Waiting` at the launcher with a fresh value
    pub fn prepare(&mut self, piece: &mut Piece) -> u32 {
        let value = self.next_piece_value();
        self.prepare_with(piece, value);
        value
    }

    /// `prepare` with a given value
    pub fn prepare_with(&self, piece: &mut Piece, value: u32) {
        piece.prepare(value, self.origin);
    }
}
