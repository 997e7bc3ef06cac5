//! Network Layer
//!
//! Async leaderboard service: WebSocket host, wire protocol, ranking logic
//! and the store abstraction underneath it. This layer is
//! **non-deterministic** - all game logic runs through `game/`.

pub mod leaderboard;
pub mod protocol;
pub mod server;
pub mod store;

pub use leaderboard::{
    composite_score, score_from_composite, LeaderboardEntry, LeaderboardError, LeaderboardStore,
    UpsertOutcome, COMPOSITE_MULTIPLIER, MAX_SUBMITTABLE_SCORE,
};
pub use protocol::{
    ClientMessage, ErrorCode, FetchLeaderboardRequest, JoinRequest, LeaderboardResponse,
    LeaderboardUpdate, RequestError, ServerMessage, SubmitScoreRequest,
};
pub use server::{LeaderboardServer, LeaderboardServerError, ServerConfig};
pub use store::{KvStore, MemoryStore, StoreError};
