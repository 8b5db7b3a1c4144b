//! # Application
//!
//! [`Listling`] is the explicit handle every entity operation receives: the store, the staff
//! roster and the per-entity locks. There is no global registry; lookups go through here.
use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::AppError,
    item::Item,
    list::{List, Lists},
    store::Store,
    user::{User, UserLists, Users},
};

/// One async mutex per entity id. A guard serializes a whole read-modify-write chain on that
/// entity (vote then rerank, trash then recount) without blocking unrelated entities.
#[derive(Clone, Default)]
pub struct EntityLocks {
    inflight: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl EntityLocks {
    pub async fn acquire(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut inflight = self.inflight.lock().await;
            // entries only referenced by the map are idle
            inflight.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                inflight
                    .entry(id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

#[derive(Clone)]
pub struct Listling {
    pub store: Store,
    staff: Arc<Vec<String>>,
    locks: EntityLocks,
}

impl Listling {
    pub fn new(store: Store, staff: Vec<String>) -> Self {
        Self {
            store,
            staff: Arc::new(staff),
            locks: EntityLocks::default(),
        }
    }

    pub fn is_staff(&self, user: &User) -> bool {
        self.staff.iter().any(|id| *id == user.id)
    }

    pub(crate) async fn lock(&self, id: &str) -> OwnedMutexGuard<()> {
        self.locks.acquire(id).await
    }

    pub fn lists(&self) -> Lists {
        Lists::new(self.clone())
    }

    pub fn users(&self) -> Users {
        Users::new(self.clone())
    }

    pub fn user_lists(&self, owner: User) -> UserLists {
        UserLists::new(self, owner)
    }

    pub async fn list(&self, id: &str) -> Result<List, AppError> {
        self.lists().get(id).await
    }

    pub async fn user(&self, id: &str) -> Result<User, AppError> {
        self.users().get(id).await
    }

    /// Item `item_id` of list `list_id`; an item of another list is not found.
    pub async fn item(&self, list_id: &str, item_id: &str) -> Result<(List, Item), AppError> {
        let lst = self.list(list_id).await?;
        let item = lst.items(self).get(item_id).await?;
        Ok((lst, item))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_locks_serialize_same_id() {
        let locks = EntityLocks::default();
        let guard = locks.acquire("Item:a").await;

        let contended = tokio::time::timeout(Duration::from_millis(20), locks.acquire("Item:a"));
        assert!(contended.await.is_err());

        let other = tokio::time::timeout(Duration::from_millis(20), locks.acquire("Item:b"));
        assert!(other.await.is_ok());

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(20), locks.acquire("Item:a"));
        assert!(reacquired.await.is_ok());
    }
}
