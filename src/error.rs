//! Error types
//!
//! Only conditions the caller can act on are errors. Illegal piece state
//! transitions are silent no-ops and never show up here.

use thiserror::Error;

/// Errors surfaced by the merge core
#[derive(Debug, Error)]
pub enum MergeError {
    /// A trigger reported a slot index outside the ring
    #[error("invalid slot index {index} (ring has {slots} slots)")]
    InvalidSlotIndex { index: i64, slots: usize },

    /// No pool template is registered for this category
    #[error("unknown pool category: {0}")]
    UnknownCategory(String),

    /// The pool needed to grow and could not
    #[error("pool exhausted for category {category}: {reason}")]
    PoolExhausted { category: String, reason: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MergeResult<T> = Result<T, MergeError>;
