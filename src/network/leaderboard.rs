//! Per-Post Leaderboard
//!
//! Best-score-per-user ranking with submission-order tie-breaking, written
//! against the [`KvStore`] primitives. Each post gets a sorted set (ranking)
//! and a hash (per-user records); the sort key packs score and submission
//! time into one integer so the remote store's ordering does all the work.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::network::store::{KvStore, StoreError};

/// Separates scores in the composite sort key. Larger than any epoch-ms
/// timestamp this century, so the timestamp only ever breaks ties between
/// equal scores - it can never promote a lower score over a higher one.
pub const COMPOSITE_MULTIPLIER: i64 = 1_000_000_000_000;

/// Largest score the leaderboard accepts. Keeps the composite multiply
/// comfortably inside i64 (a round tops out far below this anyway).
pub const MAX_SUBMITTABLE_SCORE: i64 = 10_000_000;

/// Pack a score and its submission time into the sorted-set key.
///
/// Subtracting the timestamp means the EARLIER of two equal scores ranks
/// higher (smaller timestamp, larger composite).
#[inline]
pub fn composite_score(score: i64, submitted_at_ms: i64) -> i64 {
    score * COMPOSITE_MULTIPLIER - submitted_at_ms
}

/// Recover the score component from a composite key.
///
/// Exact inverse of [`composite_score`] whenever
/// `0 < submitted_at_ms < COMPOSITE_MULTIPLIER`, which holds for every
/// real submission.
#[inline]
pub fn score_from_composite(composite: i64) -> i64 {
    composite.div_euclid(COMPOSITE_MULTIPLIER)
        + i64::from(composite.rem_euclid(COMPOSITE_MULTIPLIER) != 0)
}

/// One ranked leaderboard row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Player identifier
    pub user_id: String,
    /// Best score this player ever submitted for the post
    pub score: i64,
    /// Epoch ms of the submission that set the best score
    pub submitted_at: i64,
    /// Opaque caller-supplied fields (display name, flair, ...)
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// 1-based descending rank, computed at query time
    pub rank: u64,
}

/// What an upsert did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    /// Player identifier
    pub user_id: String,
    /// Stored best score after the call
    pub score: i64,
    /// Epoch ms of the stored best
    pub submitted_at: i64,
    /// Did this submission raise the stored best?
    pub improved: bool,
}

/// Leaderboard failures.
#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    /// The backing store failed; propagated, never retried here.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-user record kept in the post's hash, JSON-encoded.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredRecord {
    score: i64,
    submitted_at: i64,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

/// Best-score-per-user ranking for every post.
pub struct LeaderboardStore {
    store: Arc<dyn KvStore>,
    // One lock per post serializes upsert's read-modify-write; without it
    // two concurrent submissions could leave the hash and the sorted set
    // disagreeing. Reads never take these locks.
    post_locks: Mutex<BTreeMap<String, Arc<Mutex<()>>>>,
}

impl LeaderboardStore {
    /// Create a leaderboard over the given store backend.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            post_locks: Mutex::new(BTreeMap::new()),
        }
    }

    fn ranking_key(post_id: &str) -> String {
        format!("darts:rank:{}", post_id)
    }

    fn record_key(post_id: &str) -> String {
        format!("darts:record:{}", post_id)
    }

    async fn post_lock(&self, post_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.post_locks.lock().await;
        locks
            .entry(post_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Record a round score for a user.
    ///
    /// Stored scores are monotonic non-decreasing: a submission at or below
    /// the existing best is a no-op that returns the stored record
    /// unchanged. A new best rewrites the record and the ranking entry.
    pub async fn upsert_score(
        &self,
        post_id: &str,
        user_id: &str,
        score: i64,
        metadata: BTreeMap<String, String>,
    ) -> Result<UpsertOutcome, LeaderboardError> {
        self.upsert_score_at(post_id, user_id, score, metadata, Utc::now().timestamp_millis())
            .await
    }

    /// Like [`upsert_score`](Self::upsert_score) with an explicit submission
    /// time, so tie-breaking is exercisable without a real clock.
    pub async fn upsert_score_at(
        &self,
        post_id: &str,
        user_id: &str,
        score: i64,
        metadata: BTreeMap<String, String>,
        submitted_at_ms: i64,
    ) -> Result<UpsertOutcome, LeaderboardError> {
        let lock = self.post_lock(post_id).await;
        let _guard = lock.lock().await;

        let record_key = Self::record_key(post_id);
        let existing = match self.store.hget(&record_key, user_id).await? {
            Some(raw) => match serde_json::from_str::<StoredRecord>(&raw) {
                Ok(record) => Some(record),
                Err(err) => {
                    // Unreadable record: treat as absent and overwrite
                    warn!("corrupt record for {} on {}: {}", user_id, post_id, err);
                    None
                }
            },
            None => None,
        };

        if let Some(existing) = existing {
            if existing.score >= score {
                debug!(
                    "submission {} for {} on {} does not beat stored {}",
                    score, user_id, post_id, existing.score
                );
                return Ok(UpsertOutcome {
                    user_id: user_id.to_string(),
                    score: existing.score,
                    submitted_at: existing.submitted_at,
                    improved: false,
                });
            }
        }

        let record = StoredRecord {
            score,
            submitted_at: submitted_at_ms,
            metadata,
        };
        let raw = serde_json::to_string(&record)
            .map_err(|err| StoreError::Corrupt(err.to_string()))?;
        self.store.hset(&record_key, user_id, &raw).await?;
        self.store
            .zadd(
                &Self::ranking_key(post_id),
                user_id,
                composite_score(score, submitted_at_ms),
            )
            .await?;

        debug!("new best {} for {} on {}", score, user_id, post_id);
        Ok(UpsertOutcome {
            user_id: user_id.to_string(),
            score,
            submitted_at: submitted_at_ms,
            improved: true,
        })
    }

    /// Top `limit` entries in descending order, ranks annotated 1-based.
    ///
    /// A missing or unreadable per-user record downgrades gracefully: the
    /// score is recovered from the raw composite and metadata comes back
    /// empty.
    pub async fn fetch_top_n(
        &self,
        post_id: &str,
        limit: u64,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let ranked = self
            .store
            .zrange_desc(&Self::ranking_key(post_id), 0, limit)
            .await?;
        let record_key = Self::record_key(post_id);

        let mut entries = Vec::with_capacity(ranked.len());
        for (index, (user_id, composite)) in ranked.into_iter().enumerate() {
            let record = match self.store.hget(&record_key, &user_id).await? {
                Some(raw) => serde_json::from_str::<StoredRecord>(&raw).ok(),
                None => None,
            };

            let entry = match record {
                Some(record) => LeaderboardEntry {
                    user_id,
                    score: record.score,
                    submitted_at: record.submitted_at,
                    metadata: record.metadata,
                    rank: index as u64 + 1,
                },
                None => LeaderboardEntry {
                    user_id,
                    score: score_from_composite(composite),
                    submitted_at: 0,
                    metadata: BTreeMap::new(),
                    rank: index as u64 + 1,
                },
            };
            entries.push(entry);
        }
        Ok(entries)
    }

    /// 1-based descending rank for a user, `None` when they have no entry.
    pub async fn rank_for_user(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> Result<Option<u64>, LeaderboardError> {
        let key = Self::ranking_key(post_id);
        let ascending = match self.store.zrank_asc(&key, user_id).await? {
            Some(rank) => rank,
            None => return Ok(None),
        };
        let total = self.store.zcard(&key).await?;
        Ok(Some(total - ascending))
    }
}

// =============================================================================
// TESTS
// =============================================================================
