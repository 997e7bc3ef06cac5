//! Game Logic Module
//!
//! All round simulation code. 100% deterministic - seeded randomness only,
//! single cooperative per-frame tick, no blocking calls.
//!
//! ## Module Structure
//!
//! - `board`: Typed board geometry and validation
//! - `scoring`: Pure hit-coordinate classification
//! - `aim`: Hold-to-release reticle state machine
//! - `round`: Throw sequencing and round bookkeeping
//! - `events`: Notifications drained as plain values

pub mod aim;
pub mod board;
pub mod events;
pub mod round;
pub mod scoring;

// Re-export key types
pub use aim::{AimConfig, AimController, AimState, HitSample};
pub use board::{BoardConfig, BoardConfigError, Direction, RingRatios, SEGMENTS};
pub use events::GameEvent;
pub use round::{RoundConfig, RoundManager, RoundPhase, RoundSummary, ThrowRecord};
pub use scoring::{format_hit_for_hud, score_from_board_xy, wedge_index_from_angle, Ring, ScoreResult};
