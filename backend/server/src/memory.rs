//! # Memory Store
//!
//! Process-local [`OrderedKeyStore`]. One lock guards the whole map, which gives every
//! operation the same single-key atomicity Redis does. Used by tests and `--memory` mode.
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::store::{MoveOutcome, MoveTarget, OrderedKeyStore, StoreError};

#[derive(Debug, Clone)]
enum Value {
    Record(String),
    Sequence(Vec<String>),
    Scored(Vec<(f64, String)>),
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::WrongType(key.to_string())
}

/// Sequence at `key`, created empty if absent.
fn sequence_mut<'a>(
    values: &'a mut HashMap<String, Value>,
    key: &str,
) -> Result<&'a mut Vec<String>, StoreError> {
    match values
        .entry(key.to_string())
        .or_insert_with(|| Value::Sequence(Vec::new()))
    {
        Value::Sequence(ids) => Ok(ids),
        _ => Err(wrong_type(key)),
    }
}

/// Existing sequence at `key`. Removal paths use this so an absent key stays absent.
fn existing_sequence<'a>(
    values: &'a mut HashMap<String, Value>,
    key: &str,
) -> Result<Option<&'a mut Vec<String>>, StoreError> {
    match values.get_mut(key) {
        Some(Value::Sequence(ids)) => Ok(Some(ids)),
        Some(_) => Err(wrong_type(key)),
        None => Ok(None),
    }
}

fn existing_scored<'a>(
    values: &'a mut HashMap<String, Value>,
    key: &str,
) -> Result<Option<&'a mut Vec<(f64, String)>>, StoreError> {
    match values.get_mut(key) {
        Some(Value::Scored(entries)) => Ok(Some(entries)),
        Some(_) => Err(wrong_type(key)),
        None => Ok(None),
    }
}

/// Drops `key` once its list or set is empty, as Redis does.
fn prune_empty(values: &mut HashMap<String, Value>, key: &str) {
    let empty = match values.get(key) {
        Some(Value::Sequence(ids)) => ids.is_empty(),
        Some(Value::Scored(entries)) => entries.is_empty(),
        _ => false,
    };
    if empty {
        values.remove(key);
    }
}

fn scored_mut<'a>(
    values: &'a mut HashMap<String, Value>,
    key: &str,
) -> Result<&'a mut Vec<(f64, String)>, StoreError> {
    match values
        .entry(key.to_string())
        .or_insert_with(|| Value::Scored(Vec::new()))
    {
        Value::Scored(entries) => Ok(entries),
        _ => Err(wrong_type(key)),
    }
}

#[async_trait]
impl OrderedKeyStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.values.lock().await.get(key) {
            Some(Value::Record(raw)) => Ok(Some(raw.clone())),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, record: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), Value::Record(record.to_string()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.values.lock().await.remove(key);
        Ok(())
    }

    async fn sequence_append(&self, key: &str, id: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().await;
        sequence_mut(&mut values, key)?.push(id.to_string());
        Ok(())
    }

    async fn sequence_remove(&self, key: &str, id: &str) -> Result<bool, StoreError> {
        let mut values = self.values.lock().await;
        let Some(ids) = existing_sequence(&mut values, key)? else {
            return Ok(false);
        };
        let Some(index) = ids.iter().position(|member| member == id) else {
            return Ok(false);
        };
        ids.remove(index);
        prune_empty(&mut values, key);
        Ok(true)
    }

    async fn sequence_move(
        &self,
        key: &str,
        id: &str,
        target: &MoveTarget,
    ) -> Result<MoveOutcome, StoreError> {
        let mut values = self.values.lock().await;
        let Some(ids) = existing_sequence(&mut values, key)? else {
            return Ok(MoveOutcome::MissingElement);
        };

        let Some(from) = ids.iter().position(|member| member == id) else {
            return Ok(MoveOutcome::MissingElement);
        };

        match target {
            MoveTarget::Head => {
                let moved = ids.remove(from);
                ids.insert(0, moved);
            }
            MoveTarget::Before(anchor) if anchor == id => {}
            MoveTarget::Before(anchor) => {
                if !ids.iter().any(|member| member == anchor) {
                    return Ok(MoveOutcome::MissingAnchor);
                }
                let moved = ids.remove(from);
                // anchor position is looked up after removal so it is never stale
                let to = ids
                    .iter()
                    .position(|member| member == anchor)
                    .unwrap_or(ids.len());
                ids.insert(to, moved);
            }
        }

        Ok(MoveOutcome::Moved)
    }

    async fn sequence_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self.values.lock().await.get(key) {
            Some(Value::Sequence(ids)) => Ok(ids.clone()),
            Some(_) => Err(wrong_type(key)),
            None => Ok(Vec::new()),
        }
    }

    async fn sequence_len(&self, key: &str) -> Result<u64, StoreError> {
        match self.values.lock().await.get(key) {
            Some(Value::Sequence(ids)) => Ok(ids.len() as u64),
            Some(_) => Err(wrong_type(key)),
            None => Ok(0),
        }
    }

    async fn scored_set_add(&self, key: &str, id: &str, score: f64) -> Result<(), StoreError> {
        let mut values = self.values.lock().await;
        let entries = scored_mut(&mut values, key)?;

        entries.retain(|(_, member)| member != id);
        let at = entries
            .iter()
            .position(|(other, member)| (*other, member.as_str()) > (score, id))
            .unwrap_or(entries.len());
        entries.insert(at, (score, id.to_string()));

        Ok(())
    }

    async fn scored_set_remove(&self, key: &str, id: &str) -> Result<bool, StoreError> {
        let mut values = self.values.lock().await;
        let Some(entries) = existing_scored(&mut values, key)? else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|(_, member)| member != id);
        let removed = entries.len() != before;
        prune_empty(&mut values, key);
        Ok(removed)
    }

    async fn scored_set_score(&self, key: &str, id: &str) -> Result<Option<f64>, StoreError> {
        match self.values.lock().await.get(key) {
            Some(Value::Scored(entries)) => Ok(entries
                .iter()
                .find(|(_, member)| member == id)
                .map(|(score, _)| *score)),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn scored_set_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self.values.lock().await.get(key) {
            Some(Value::Scored(entries)) => {
                Ok(entries.iter().map(|(_, member)| member.clone()).collect())
            }
            Some(_) => Err(wrong_type(key)),
            None => Ok(Vec::new()),
        }
    }

    async fn scored_set_len(&self, key: &str) -> Result<u64, StoreError> {
        match self.values.lock().await.get(key) {
            Some(Value::Scored(entries)) => Ok(entries.len() as u64),
            Some(_) => Err(wrong_type(key)),
            None => Ok(0),
        }
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let mut values = self.values.lock().await;
        let current = match values.get(key) {
            Some(Value::Record(raw)) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| StoreError::Corrupt(key.to_string()))?,
            Some(_) => return Err(wrong_type(key)),
            None => 0,
        };
        let next = current + delta;
        values.insert(key.to_string(), Value::Record(next.to_string()));
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequence_move() {
        let store = MemoryStore::new();
        for id in ["a", "b", "c", "d"] {
            store.sequence_append("seq", id).await.unwrap();
        }

        let moved = store
            .sequence_move("seq", "d", &MoveTarget::Before("b".to_string()))
            .await
            .unwrap();
        assert_eq!(moved, MoveOutcome::Moved);
        assert_eq!(store.sequence_range("seq").await.unwrap(), ["a", "d", "b", "c"]);

        store.sequence_move("seq", "c", &MoveTarget::Head).await.unwrap();
        assert_eq!(store.sequence_range("seq").await.unwrap(), ["c", "a", "d", "b"]);

        // moving forward, the anchor sits after the element's old slot
        store
            .sequence_move("seq", "a", &MoveTarget::Before("b".to_string()))
            .await
            .unwrap();
        assert_eq!(store.sequence_range("seq").await.unwrap(), ["c", "d", "a", "b"]);
    }

    #[tokio::test]
    async fn test_sequence_move_missing() {
        let store = MemoryStore::new();
        store.sequence_append("seq", "a").await.unwrap();

        let outcome = store.sequence_move("seq", "x", &MoveTarget::Head).await.unwrap();
        assert_eq!(outcome, MoveOutcome::MissingElement);

        let outcome = store
            .sequence_move("seq", "a", &MoveTarget::Before("x".to_string()))
            .await
            .unwrap();
        assert_eq!(outcome, MoveOutcome::MissingAnchor);
        assert_eq!(store.sequence_range("seq").await.unwrap(), ["a"]);
    }

    #[tokio::test]
    async fn test_scored_set_order_and_rescore() {
        let store = MemoryStore::new();
        store.scored_set_add("set", "b", 2.0).await.unwrap();
        store.scored_set_add("set", "a", 1.0).await.unwrap();
        store.scored_set_add("set", "c", 1.0).await.unwrap();
        assert_eq!(store.scored_set_range("set").await.unwrap(), ["a", "c", "b"]);

        store.scored_set_add("set", "b", -1.0).await.unwrap();
        assert_eq!(store.scored_set_range("set").await.unwrap(), ["b", "a", "c"]);
        assert_eq!(store.scored_set_len("set").await.unwrap(), 3);
        assert_eq!(store.scored_set_score("set", "b").await.unwrap(), Some(-1.0));

        assert!(store.scored_set_remove("set", "a").await.unwrap());
        assert!(!store.scored_set_remove("set", "a").await.unwrap());
    }

    #[tokio::test]
    async fn test_removal_leaves_no_empty_keys() {
        let store = MemoryStore::new();
        assert!(!store.scored_set_remove("Item:a.votes", "User:x").await.unwrap());
        assert!(!store.sequence_remove("List:a.items", "Item:a").await.unwrap());
        let outcome = store
            .sequence_move("List:a.items", "Item:a", &MoveTarget::Head)
            .await
            .unwrap();
        assert_eq!(outcome, MoveOutcome::MissingElement);
        assert!(store.values.lock().await.is_empty());

        store.scored_set_add("set", "a", 1.0).await.unwrap();
        store.sequence_append("seq", "a").await.unwrap();
        assert!(store.scored_set_remove("set", "a").await.unwrap());
        assert!(store.sequence_remove("seq", "a").await.unwrap());
        assert!(store.values.lock().await.is_empty());

        // an absent key can be recreated with another shape, as in Redis
        store.set("set", "{}").await.unwrap();
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let store = MemoryStore::new();
        store.set("key", "{}").await.unwrap();
        assert!(matches!(
            store.sequence_append("key", "a").await,
            Err(StoreError::WrongType(_))
        ));
        assert_eq!(store.increment("count", 2).await.unwrap(), 2);
        assert_eq!(store.increment("count", -1).await.unwrap(), 1);
    }
}
