//! Ring Merge - a circular merge puzzle core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (slot ring, merge cascades, piece pooling)
//! - `config`: Data-driven game configuration
//! - `error`: Error types shared across the crate

pub mod config;
pub mod error;
pub mod sim;

pub use config::{GameConfig, PoolEntry};
pub use error::{MergeError, MergeResult};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Number of slots around the ring
    pub const RING_SLOTS: usize = 8;
    /// Angular distance between neighbouring slots (degrees)
    pub const SLOT_ANGLE: f32 = 360.0 / RING_SLOTS as f32;

    /// Highest value a piece can reach through merging
    pub const DEFAULT_MAX_LEVEL: u32 = 5;

    /// Pool category used for launched pieces
    pub const PIECE_CATEGORY: &str = "Piece";
    /// Instances created per pool growth when not configured
    pub const DEFAULT_POOLING_COUNT: usize = 8;
}

/// Normalize an angle in degrees to [0, 360)
#[inline]
pub fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Signed shortest rotation from `from` to `to`, in degrees within (-180, 180]
#[inline]
pub fn shortest_delta_degrees(from: f32, to: f32) -> f32 {
    let delta = normalize_degrees(to - from);
    if delta > 180.0 { delta - 360.0 } else { delta }
}

/// Convert polar (r, degrees) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, degrees: f32) -> Vec2 {
    let theta = degrees.to_radians();
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Rotate `point` around `pivot` by `degrees` (counter-clockwise)
#[inline]
pub fn rotate_about(point: Vec2, pivot: Vec2, degrees: f32) -> Vec2 {
    let rotation = Vec2::from_angle(degrees.to_radians());
    pivot + rotation.rotate(point - pivot)
}
