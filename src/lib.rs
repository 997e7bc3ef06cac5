//! # Bullseye Game Server
//!
//! Dart-throwing minigame core with a per-post leaderboard service.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      BULLSEYE SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── vec2.rs     - 2D f32 vector math                        │
//! │  └── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │                                                              │
//! │  game/           - Round logic (deterministic)               │
//! │  ├── board.rs    - Board geometry and validation             │
//! │  ├── scoring.rs  - Pure hit classification                   │
//! │  ├── aim.rs      - Hold-to-release reticle                   │
//! │  ├── round.rs    - Throw sequencing                          │
//! │  └── events.rs   - Notifications as plain values             │
//! │                                                              │
//! │  network/        - Leaderboard service (non-deterministic)   │
//! │  ├── server.rs   - WebSocket host                            │
//! │  ├── protocol.rs - Message types and validation              │
//! │  ├── leaderboard.rs - Ranking arithmetic                     │
//! │  └── store.rs    - Sorted-set + hash KV abstraction          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are deterministic given a seed:
//! - All randomness from seeded Xorshift128+
//! - No system time dependencies (callers supply frame deltas)
//! - No I/O and no blocking calls
//!
//! The same seed and the same input sequence reproduce the same round,
//! throw for throw, on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::rng::{derive_round_seed, DeterministicRng};
pub use crate::core::vec2::Vec2;
pub use game::aim::{AimConfig, AimController, HitSample};
pub use game::board::BoardConfig;
pub use game::round::{RoundConfig, RoundManager, RoundSummary};
pub use game::scoring::{format_hit_for_hud, score_from_board_xy, Ring, ScoreResult};
pub use network::leaderboard::{LeaderboardEntry, LeaderboardStore};
pub use network::server::{LeaderboardServer, ServerConfig};
pub use network::store::MemoryStore;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reference client frame rate (Hz) the aim tuning is calibrated against
pub const TICK_RATE: u32 = 60;
