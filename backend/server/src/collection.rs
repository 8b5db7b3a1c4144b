//! # Collections
//!
//! A typed view over one index in the store plus a cached count.
//!
//! ## Backing
//!
//! - Sequence: insertion order, repositionable (see [`crate::orderable`])
//! - Scored: ascending score order, rescored in place (see [`crate::ranked`])
//!
//! ## Count
//!
//! `<key>.count` holds the number of counted (non-trashed) members. It is adjusted with an atomic
//! increment right after the structural change it mirrors. The two are separate keys, so a crash
//! between them leaves the count off by one until the next [`Collection::recount`].
use std::marker::PhantomData;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::{
    error::AppError,
    store::{Store, get_counter, get_object, set_object},
};

/// Anything stored as a record under its own id and indexed by collections.
pub trait Member: Serialize + DeserializeOwned + Send + Sync {
    fn id(&self) -> &str;

    /// Trashed members stay indexed but do not count.
    fn is_trashed(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backing {
    Sequence,
    Scored,
}

pub struct Collection<T> {
    pub(crate) store: Store,
    pub(crate) key: String,
    pub(crate) backing: Backing,
    count_key: String,
    _member: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: self.key.clone(),
            backing: self.backing,
            count_key: self.count_key.clone(),
            _member: PhantomData,
        }
    }
}

impl<T: Member> Collection<T> {
    pub fn sequence(store: Store, key: impl Into<String>) -> Self {
        Self::new(store, key.into(), Backing::Sequence)
    }

    pub fn scored(store: Store, key: impl Into<String>) -> Self {
        Self::new(store, key.into(), Backing::Scored)
    }

    fn new(store: Store, key: String, backing: Backing) -> Self {
        let count_key = format!("{key}.count");
        Self {
            store,
            key,
            backing,
            count_key,
            _member: PhantomData,
        }
    }

    /// Shares one cached count between several indexes over the same members.
    pub fn with_count_key(mut self, count_key: impl Into<String>) -> Self {
        self.count_key = count_key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Persists a new member, indexes it and counts it.
    pub async fn insert(&self, member: &T, score: f64) -> Result<(), AppError> {
        set_object(self.store.as_ref(), member.id(), member).await?;
        self.index(member.id(), score).await?;
        if !member.is_trashed() {
            self.adjust_count(1).await?;
        }
        Ok(())
    }

    /// Indexes an existing record and counts it. Re-adding to a scored collection only rescores.
    pub async fn add(&self, id: &str, score: f64) -> Result<bool, AppError> {
        let added = self.index(id, score).await?;
        if added {
            self.adjust_count(1).await?;
        }
        Ok(added)
    }

    /// Structural add without touching the count.
    pub async fn index(&self, id: &str, score: f64) -> Result<bool, AppError> {
        match self.backing {
            Backing::Sequence => {
                self.store.sequence_append(&self.key, id).await?;
                Ok(true)
            }
            Backing::Scored => {
                let existed = self.store.scored_set_score(&self.key, id).await?.is_some();
                self.store.scored_set_add(&self.key, id, score).await?;
                Ok(!existed)
            }
        }
    }

    /// Unindexes a member and uncounts it unless trashed.
    pub async fn remove(&self, member: &T) -> Result<(), AppError> {
        if !self.unindex(member.id()).await? {
            return Err(AppError::not_found(member.id()));
        }
        if !member.is_trashed() {
            self.adjust_count(-1).await?;
        }
        Ok(())
    }

    /// Like [`Collection::remove`] for bare ids, but absence is reported rather than an error.
    pub async fn discard(&self, id: &str) -> Result<bool, AppError> {
        let removed = self.unindex(id).await?;
        if removed {
            self.adjust_count(-1).await?;
        }
        Ok(removed)
    }

    /// Structural remove without touching the count.
    pub async fn unindex(&self, id: &str) -> Result<bool, AppError> {
        Ok(match self.backing {
            Backing::Sequence => self.store.sequence_remove(&self.key, id).await?,
            Backing::Scored => self.store.scored_set_remove(&self.key, id).await?,
        })
    }

    pub async fn adjust_count(&self, delta: i64) -> Result<i64, AppError> {
        Ok(self.store.increment(&self.count_key, delta).await?)
    }

    pub async fn count(&self) -> Result<u64, AppError> {
        let count = get_counter(self.store.as_ref(), &self.count_key).await?;
        Ok(count.max(0) as u64)
    }

    /// Rebuilds the cached count from the index and member records.
    pub async fn recount(&self) -> Result<u64, AppError> {
        let mut members = self.iter().await?;
        let mut count = 0u64;
        while let Some(member) = members.next().await {
            if !member?.is_trashed() {
                count += 1;
            }
        }
        self.store.set(&self.count_key, &count.to_string()).await?;
        Ok(count)
    }

    pub async fn ids(&self) -> Result<Vec<String>, AppError> {
        Ok(match self.backing {
            Backing::Sequence => self.store.sequence_range(&self.key).await?,
            Backing::Scored => self.store.scored_set_range(&self.key).await?,
        })
    }

    pub async fn contains(&self, id: &str) -> Result<bool, AppError> {
        Ok(match self.backing {
            Backing::Sequence => self.ids().await?.iter().any(|member| member == id),
            Backing::Scored => self.store.scored_set_score(&self.key, id).await?.is_some(),
        })
    }

    /// Member `id` if it belongs to this collection.
    pub async fn get(&self, id: &str) -> Result<T, AppError> {
        if !self.contains(id).await? {
            return Err(AppError::not_found(id));
        }
        get_object(self.store.as_ref(), id)
            .await?
            .ok_or_else(|| AppError::not_found(id))
    }

    /// Snapshot of the index; member records are fetched one at a time as the cursor advances.
    pub async fn iter(&self) -> Result<Members<T>, AppError> {
        Ok(Members {
            store: self.store.clone(),
            ids: self.ids().await?.into_iter(),
            _member: PhantomData,
        })
    }

    pub async fn values(&self) -> Result<Vec<T>, AppError> {
        let mut members = self.iter().await?;
        let mut values = Vec::new();
        while let Some(member) = members.next().await {
            values.push(member?);
        }
        Ok(values)
    }

    /// `{count}` always, `{items}` only when asked so list summaries stay small.
    pub async fn serialize<F>(&self, include_items: bool, view: F) -> Result<Value, AppError>
    where
        F: Fn(&T) -> Value,
    {
        let count = self.count().await?;
        if !include_items {
            return Ok(json!({ "count": count }));
        }
        let items: Vec<Value> = self.values().await?.iter().map(view).collect();
        Ok(json!({ "count": count, "items": items }))
    }
}

/// Cursor over a collection snapshot. Finite; call [`Collection::iter`] again to restart.
pub struct Members<T> {
    store: Store,
    ids: std::vec::IntoIter<String>,
    _member: PhantomData<fn() -> T>,
}

impl<T: Member> Members<T> {
    pub async fn next(&mut self) -> Option<Result<T, AppError>> {
        // ids whose record vanished mid-iteration are skipped
        for id in self.ids.by_ref() {
            match get_object(self.store.as_ref(), &id).await {
                Ok(Some(member)) => return Some(Ok(member)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
        None
    }

    pub fn remaining(&self) -> usize {
        self.ids.len()
    }
}
