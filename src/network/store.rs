//! Key-Value Store Abstraction
//!
//! The leaderboard persists through two remote-store primitives: a sorted
//! set (ranking) and a hash (per-user records). [`KvStore`] captures exactly
//! that surface so the ranking logic stays backend-agnostic; [`MemoryStore`]
//! is the in-process backend, with checksummed snapshots so a restart does
//! not lose standings.
//!
//! Every trait method is atomic on its own. Multi-step read-modify-write
//! sequences are the caller's problem (see the leaderboard's per-post lock).

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Persistence layer failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend cannot be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The key already holds a value of a different type.
    #[error("key {key} holds a different value type")]
    WrongType {
        /// Offending key
        key: String,
    },

    /// Snapshot payload failed integrity or format checks.
    #[error("snapshot corrupt: {0}")]
    Corrupt(String),

    /// Snapshot (de)serialization failure.
    #[error("snapshot encoding: {0}")]
    Encoding(#[from] bincode::Error),

    /// Snapshot file I/O failure.
    #[error("snapshot I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Sorted-set + hash primitives the leaderboard is written against.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Insert or update a member's score in the sorted set at `key`.
    async fn zadd(&self, key: &str, member: &str, score: i64) -> Result<(), StoreError>;

    /// Score of `member` in the sorted set, if present.
    async fn zscore(&self, key: &str, member: &str) -> Result<Option<i64>, StoreError>;

    /// Up to `count` members from position `offset`, highest score first.
    async fn zrange_desc(
        &self,
        key: &str,
        offset: u64,
        count: u64,
    ) -> Result<Vec<(String, i64)>, StoreError>;

    /// 0-based position of `member` counting from the lowest score.
    async fn zrank_asc(&self, key: &str, member: &str) -> Result<Option<u64>, StoreError>;

    /// Cardinality of the sorted set at `key`.
    async fn zcard(&self, key: &str) -> Result<u64, StoreError>;

    /// Set `field` in the hash at `key`.
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;

    /// Read `field` from the hash at `key`.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;
}

/// One key's value. Keys are typed like the remote store types them:
/// using a key as the wrong kind is an error, not a silent overwrite.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum Keyspace {
    Sorted(BTreeMap<String, i64>),
    Hash(BTreeMap<String, String>),
}

/// In-process [`KvStore`] backend.
///
/// BTreeMap keyspaces behind a tokio `RwLock`; reads share, writes
/// serialize. Deterministic iteration order makes snapshot bytes stable.
#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: RwLock<BTreeMap<String, Keyspace>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize the full store state with an integrity checksum prefix.
    pub async fn to_snapshot_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let keys = self.keys.read().await;
        let payload = bincode::serialize(&*keys)?;

        let checksum = Sha256::digest(&payload);
        let mut bytes = Vec::with_capacity(32 + payload.len());
        bytes.extend_from_slice(&checksum);
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Rebuild a store from snapshot bytes, verifying the checksum.
    pub fn from_snapshot_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() < 32 {
            return Err(StoreError::Corrupt(format!(
                "snapshot truncated at {} bytes",
                bytes.len()
            )));
        }
        let (checksum, payload) = bytes.split_at(32);

        let actual = Sha256::digest(payload);
        if actual.as_slice() != checksum {
            return Err(StoreError::Corrupt(format!(
                "checksum mismatch: stored {}, computed {}",
                hex::encode(checksum),
                hex::encode(actual)
            )));
        }

        let keys: BTreeMap<String, Keyspace> = bincode::deserialize(payload)?;
        Ok(Self {
            keys: RwLock::new(keys),
        })
    }

    /// Write a checksummed snapshot to disk.
    pub async fn save_snapshot(&self, path: &Path) -> Result<(), StoreError> {
        let bytes = self.to_snapshot_bytes().await?;
        tokio::fs::write(path, &bytes).await?;
        info!("saved store snapshot ({} bytes) to {}", bytes.len(), path.display());
        Ok(())
    }

    /// Load a snapshot from disk, verifying integrity.
    pub async fn load_snapshot(path: &Path) -> Result<Self, StoreError> {
        let bytes = tokio::fs::read(path).await?;
        let store = Self::from_snapshot_bytes(&bytes)?;
        info!("loaded store snapshot from {}", path.display());
        Ok(store)
    }

    /// Number of keys currently held (all types).
    pub async fn key_count(&self) -> usize {
        self.keys.read().await.len()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn zadd(&self, key: &str, member: &str, score: i64) -> Result<(), StoreError> {
        let mut keys = self.keys.write().await;
        match keys
            .entry(key.to_string())
            .or_insert_with(|| Keyspace::Sorted(BTreeMap::new()))
        {
            Keyspace::Sorted(set) => {
                set.insert(member.to_string(), score);
                debug!("zadd {} {} = {}", key, member, score);
                Ok(())
            }
            Keyspace::Hash(_) => Err(StoreError::WrongType { key: key.to_string() }),
        }
    }

    async fn zscore(&self, key: &str, member: &str) -> Result<Option<i64>, StoreError> {
        let keys = self.keys.read().await;
        match keys.get(key) {
            None => Ok(None),
            Some(Keyspace::Sorted(set)) => Ok(set.get(member).copied()),
            Some(Keyspace::Hash(_)) => Err(StoreError::WrongType { key: key.to_string() }),
        }
    }

    async fn zrange_desc(
        &self,
        key: &str,
        offset: u64,
        count: u64,
    ) -> Result<Vec<(String, i64)>, StoreError> {
        let keys = self.keys.read().await;
        let set = match keys.get(key) {
            None => return Ok(Vec::new()),
            Some(Keyspace::Sorted(set)) => set,
            Some(Keyspace::Hash(_)) => {
                return Err(StoreError::WrongType { key: key.to_string() })
            }
        };

        let mut members: Vec<(String, i64)> =
            set.iter().map(|(m, s)| (m.clone(), *s)).collect();
        // Highest score first; equal scores ordered by member for stability
        members.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Ok(members
            .into_iter()
            .skip(offset as usize)
            .take(count as usize)
            .collect())
    }

    async fn zrank_asc(&self, key: &str, member: &str) -> Result<Option<u64>, StoreError> {
        let keys = self.keys.read().await;
        let set = match keys.get(key) {
            None => return Ok(None),
            Some(Keyspace::Sorted(set)) => set,
            Some(Keyspace::Hash(_)) => {
                return Err(StoreError::WrongType { key: key.to_string() })
            }
        };

        // Ascending rank is the exact mirror of the descending order, so
        // `total - 1 - desc_position` holds for every member.
        let mut members: Vec<(&String, &i64)> = set.iter().collect();
        members.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let total = members.len() as u64;
        Ok(members
            .iter()
            .position(|(m, _)| m.as_str() == member)
            .map(|desc_pos| total - 1 - desc_pos as u64))
    }

    async fn zcard(&self, key: &str) -> Result<u64, StoreError> {
        let keys = self.keys.read().await;
        match keys.get(key) {
            None => Ok(0),
            Some(Keyspace::Sorted(set)) => Ok(set.len() as u64),
            Some(Keyspace::Hash(_)) => Err(StoreError::WrongType { key: key.to_string() }),
        }
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut keys = self.keys.write().await;
        match keys
            .entry(key.to_string())
            .or_insert_with(|| Keyspace::Hash(BTreeMap::new()))
        {
            Keyspace::Hash(hash) => {
                hash.insert(field.to_string(), value.to_string());
                Ok(())
            }
            Keyspace::Sorted(_) => Err(StoreError::WrongType { key: key.to_string() }),
        }
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let keys = self.keys.read().await;
        match keys.get(key) {
            None => Ok(None),
            Some(Keyspace::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(Keyspace::Sorted(_)) => Err(StoreError::WrongType { key: key.to_string() }),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
