//! # Ordered Key Store
//!
//! The narrow storage contract every collection and entity is written against.
//!
//! ## Shapes
//!
//! - Record: opaque JSON string under a key (lists, items, users, events)
//! - Sequence: ordered list of ids (insertion order, repositioned by `move`)
//! - Scored set: ids ordered by ascending score, ties by id bytes
//! - Counter: signed integer, used for cached counts and list clocks
//!
//! Every operation is atomic for the single key it touches. Nothing here spans keys, so
//! multi-step mutations (record + sequence + count) are a causal chain, not a transaction.
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Key {0} holds the wrong kind of value")]
    WrongType(String),

    #[error("Corrupt value under {0}")]
    Corrupt(String),
}

/// Where [`OrderedKeyStore::sequence_move`] puts an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveTarget {
    Head,
    Before(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    MissingElement,
    MissingAnchor,
}

#[async_trait]
pub trait OrderedKeyStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, record: &str) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn sequence_append(&self, key: &str, id: &str) -> Result<(), StoreError>;

    /// Removes the first occurrence of `id`. Returns `false` if it was not there.
    async fn sequence_remove(&self, key: &str, id: &str) -> Result<bool, StoreError>;

    async fn sequence_move(
        &self,
        key: &str,
        id: &str,
        target: &MoveTarget,
    ) -> Result<MoveOutcome, StoreError>;

    async fn sequence_range(&self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn sequence_len(&self, key: &str) -> Result<u64, StoreError>;

    /// Adds or rescores `id`.
    async fn scored_set_add(&self, key: &str, id: &str, score: f64) -> Result<(), StoreError>;

    async fn scored_set_remove(&self, key: &str, id: &str) -> Result<bool, StoreError>;

    async fn scored_set_score(&self, key: &str, id: &str) -> Result<Option<f64>, StoreError>;

    /// Ids by ascending score.
    async fn scored_set_range(&self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn scored_set_len(&self, key: &str) -> Result<u64, StoreError>;

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, StoreError>;
}

/// Handle passed into every component; there is no process-wide store.
pub type Store = Arc<dyn OrderedKeyStore>;

pub async fn get_object<T: DeserializeOwned>(
    store: &dyn OrderedKeyStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub async fn set_object<T: Serialize + ?Sized>(
    store: &dyn OrderedKeyStore,
    key: &str,
    object: &T,
) -> Result<(), StoreError> {
    store.set(key, &serde_json::to_string(object)?).await
}

pub async fn get_counter(store: &dyn OrderedKeyStore, key: &str) -> Result<i64, StoreError> {
    match store.get(key).await? {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| StoreError::Corrupt(key.to_string())),
        None => Ok(0),
    }
}
