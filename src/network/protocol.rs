//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are serialized as JSON tagged by a `type` field. Input
//! validation lives here, at the boundary - bad requests never reach
//! persistence.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::network::leaderboard::{LeaderboardEntry, MAX_SUBMITTABLE_SCORE};

/// Default number of leaderboard rows returned.
pub const DEFAULT_LIMIT: u64 = 10;

/// Largest number of leaderboard rows a client may request.
pub const MAX_LIMIT: u64 = 100;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Bind this connection to a post's leaderboard. Required before
    /// submitting or fetching.
    Join(JoinRequest),

    /// Submit a finished round's total score.
    SubmitScore(SubmitScoreRequest),

    /// Fetch the current standings without submitting.
    FetchLeaderboard(FetchLeaderboardRequest),

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back
        timestamp: u64,
    },

    /// Client is leaving the post.
    Leave,
}

/// Bind a connection to one post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Post whose leaderboard this connection uses
    pub post_id: String,
    /// Player on this connection
    pub user_id: String,
}

/// A round-score submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitScoreRequest {
    /// Player submitting the score
    pub user_id: String,
    /// Round total. Must be a finite non-negative number.
    pub score: f64,
    /// Leaderboard rows wanted back (clamped to [1, 100], default 10)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Opaque display fields stored with the entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

/// A standings query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchLeaderboardRequest {
    /// Player asking (their rank is included in the response)
    pub user_id: String,
    /// Leaderboard rows wanted back (clamped to [1, 100], default 10)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

// =============================================================================
// REQUEST VALIDATION
// =============================================================================

/// Why a request was rejected at the boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    /// `user_id` was empty.
    #[error("user_id must be a non-empty string")]
    MissingUserId,

    /// `post_id` was empty.
    #[error("post_id must be a non-empty string")]
    MissingPostId,

    /// Score was NaN, infinite or negative.
    #[error("score must be a finite non-negative number, got {0}")]
    InvalidScore(f64),

    /// Score was numerically valid but beyond what the ranking encodes.
    #[error("score {0} exceeds the maximum submittable score")]
    ScoreOutOfRange(f64),
}

/// A submission that passed boundary validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSubmission {
    /// Player submitting
    pub user_id: String,
    /// Score rounded to whole points
    pub score: i64,
    /// Clamped row count for the response
    pub limit: u64,
    /// Metadata to store (empty map when omitted)
    pub metadata: BTreeMap<String, String>,
}

/// A fetch that passed boundary validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidFetch {
    /// Player asking
    pub user_id: String,
    /// Clamped row count for the response
    pub limit: u64,
}

/// Clamp a requested row count to `[1, MAX_LIMIT]`, defaulting when absent.
#[inline]
pub fn clamp_limit(limit: Option<u32>) -> u64 {
    match limit {
        None => DEFAULT_LIMIT,
        Some(n) => u64::from(n).clamp(1, MAX_LIMIT),
    }
}

impl JoinRequest {
    /// Reject empty identifiers.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.post_id.trim().is_empty() {
            return Err(RequestError::MissingPostId);
        }
        if self.user_id.trim().is_empty() {
            return Err(RequestError::MissingUserId);
        }
        Ok(())
    }
}

impl SubmitScoreRequest {
    /// Boundary checks: non-empty user, finite non-negative in-range score.
    pub fn validate(&self) -> Result<ValidSubmission, RequestError> {
        if self.user_id.trim().is_empty() {
            return Err(RequestError::MissingUserId);
        }
        if !self.score.is_finite() || self.score < 0.0 {
            return Err(RequestError::InvalidScore(self.score));
        }
        if self.score > MAX_SUBMITTABLE_SCORE as f64 {
            return Err(RequestError::ScoreOutOfRange(self.score));
        }

        Ok(ValidSubmission {
            user_id: self.user_id.clone(),
            score: self.score.round() as i64,
            limit: clamp_limit(self.limit),
            metadata: self.metadata.clone().unwrap_or_default(),
        })
    }
}

impl FetchLeaderboardRequest {
    /// Boundary checks: non-empty user.
    pub fn validate(&self) -> Result<ValidFetch, RequestError> {
        if self.user_id.trim().is_empty() {
            return Err(RequestError::MissingUserId);
        }
        Ok(ValidFetch {
            user_id: self.user_id.clone(),
            limit: clamp_limit(self.limit),
        })
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Join outcome.
    JoinResult(JoinResult),

    /// Standings in response to a submit or fetch.
    Leaderboard(LeaderboardResponse),

    /// Pushed to every connection on a post when someone sets a new best.
    LeaderboardUpdate(LeaderboardUpdate),

    /// Pong response.
    Pong {
        /// Echo of the client timestamp
        timestamp: u64,
        /// Server wall clock, epoch ms
        server_time: u64,
    },

    /// Request failed.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown {
        /// Operator-facing reason
        reason: String,
    },
}

/// Join outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResult {
    /// Whether the join was accepted.
    pub success: bool,
    /// Post this connection is now bound to.
    pub post_id: String,
    /// Server version.
    pub server_version: String,
}

/// Standings returned to the requesting client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    /// Highest entries in descending order, ranks annotated
    pub top: Vec<LeaderboardEntry>,
    /// 1-based rank of the requesting user, None if they have no entry
    pub caller_rank: Option<u64>,
}

/// Standings pushed after a new best score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardUpdate {
    /// Post whose standings changed
    pub post_id: String,
    /// Player who set the new best
    pub user_id: String,
    /// Refreshed top entries
    pub top: Vec<LeaderboardEntry>,
}

/// Server error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Request failed boundary validation.
    InvalidInput,
    /// Connection has not joined a post yet.
    NotJoined,
    /// Backing store rejected the operation.
    StoreUnavailable,
    /// Internal error.
    InternalError,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
