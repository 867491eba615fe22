//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Single writer: ring and pool are only mutated through `MergeEngine`
//! - No rendering or platform dependencies

pub mod animator;
pub mod game;
pub mod merge;
pub mod piece;
pub mod pool;
pub mod ring;
pub mod signal;
pub mod spawn;
pub mod zones;

pub use animator::{AnimationSignal, AnimationTicket, Animator, TweenAnimator};
pub use game::Game;
pub use merge::{CascadePhase, EngineEvent, MatchingSides, MergeEngine, MergeStep, Side};
pub use piece::{Attachment, Piece, PieceId, PieceState};
pub use pool::{ObjectPool, PoolId, PoolStats, Poolable};
pub use ring::{Adjacent, SlotRing};
pub use signal::{GamePhase, GameStateBroadcaster, InputSource, ListenerId, Signal};
pub use spawn::SpawnSupervisor;
pub use zones::{PieceTrigger, RingRotor, TriggerZones};
