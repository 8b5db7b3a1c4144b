//! # Redis
//!
//! RAM database.
//!
//! Core purpose is to hold every record and every collection index. All collection mutations map
//! onto single-key Redis commands, so Redis itself queues and serializes them.
//!
//! ## Layout
//!
//! - `List:<id>`, `Item:<id>`, `User:<id>`, `Event:<id>`: JSON records
//! - `lists`: sequence of all list ids
//! - `users`: sorted set of all user ids by creation time
//! - `<list>.items`: sequence of item ids (insertion / move order)
//! - `<list>.items.ranked`: sorted set of item ids by vote score
//! - `<list>.items.count`: cached number of non-trashed items
//! - `<list>.clock`: counter handing out item and vote ticks
//! - `<list>.activity`: sequence of event ids
//! - `<item>.votes`: sorted set of voter ids by vote tick
//! - `<user>.lists`: sorted set of list ids by negative creation time
//! - `auth:<secret>`: user id for an auth secret
//!
//! ## Implementation
//!
//! - Records: `GET` / `SET` / `DEL`
//! - Sequences: Redis lists, `RPUSH` / `LREM key 1` / `LRANGE` / `LLEN`
//! - Scored sets: Redis sorted sets, `ZADD` / `ZREM` / `ZSCORE` / `ZRANGE` / `ZCARD`
//! - Counters: `INCRBY`
//! - Reposition: one Lua script, so check, remove and insert run as a single step on the key
use std::time::Duration;

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tracing::info;

use crate::store::{MoveOutcome, MoveTarget, OrderedKeyStore, StoreError};

const MOVE_SCRIPT: &str = r#"
if not redis.call('LPOS', KEYS[1], ARGV[1]) then
    return 0
end
if ARGV[2] == 'head' then
    redis.call('LREM', KEYS[1], 1, ARGV[1])
    redis.call('LPUSH', KEYS[1], ARGV[1])
    return 1
end
if ARGV[3] == ARGV[1] then
    return 1
end
if not redis.call('LPOS', KEYS[1], ARGV[3]) then
    return -1
end
redis.call('LREM', KEYS[1], 1, ARGV[1])
redis.call('LINSERT', KEYS[1], 'BEFORE', ARGV[3], ARGV[1])
return 1
"#;

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, StoreError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    info!("Connected to Redis");
    Ok(connection_manager)
}

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    move_script: Script,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        Ok(Self::new(init_redis(redis_url).await?))
    }

    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection,
            move_script: Script::new(MOVE_SCRIPT),
        }
    }

    // ConnectionManager is a cheap handle onto one multiplexed connection
    fn conn(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

#[async_trait]
impl OrderedKeyStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.conn().get(key).await?)
    }

    async fn set(&self, key: &str, record: &str) -> Result<(), StoreError> {
        let _: () = self.conn().set(key, record).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _: usize = self.conn().del(key).await?;
        Ok(())
    }

    async fn sequence_append(&self, key: &str, id: &str) -> Result<(), StoreError> {
        let _: usize = self.conn().rpush(key, id).await?;
        Ok(())
    }

    async fn sequence_remove(&self, key: &str, id: &str) -> Result<bool, StoreError> {
        let removed: usize = self.conn().lrem(key, 1, id).await?;
        Ok(removed > 0)
    }

    async fn sequence_move(
        &self,
        key: &str,
        id: &str,
        target: &MoveTarget,
    ) -> Result<MoveOutcome, StoreError> {
        let (mode, anchor) = match target {
            MoveTarget::Head => ("head", ""),
            MoveTarget::Before(anchor) => ("before", anchor.as_str()),
        };

        let mut conn = self.conn();
        let code: i64 = self
            .move_script
            .key(key)
            .arg(id)
            .arg(mode)
            .arg(anchor)
            .invoke_async(&mut conn)
            .await?;

        Ok(match code {
            1 => MoveOutcome::Moved,
            0 => MoveOutcome::MissingElement,
            _ => MoveOutcome::MissingAnchor,
        })
    }

    async fn sequence_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.conn().lrange(key, 0, -1).await?)
    }

    async fn sequence_len(&self, key: &str) -> Result<u64, StoreError> {
        Ok(self.conn().llen(key).await?)
    }

    async fn scored_set_add(&self, key: &str, id: &str, score: f64) -> Result<(), StoreError> {
        let _: usize = self.conn().zadd(key, id, score).await?;
        Ok(())
    }

    async fn scored_set_remove(&self, key: &str, id: &str) -> Result<bool, StoreError> {
        let removed: usize = self.conn().zrem(key, id).await?;
        Ok(removed > 0)
    }

    async fn scored_set_score(&self, key: &str, id: &str) -> Result<Option<f64>, StoreError> {
        Ok(self.conn().zscore(key, id).await?)
    }

    async fn scored_set_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.conn().zrange(key, 0, -1).await?)
    }

    async fn scored_set_len(&self, key: &str) -> Result<u64, StoreError> {
        Ok(self.conn().zcard(key).await?)
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        Ok(self.conn().incr(key, delta).await?)
    }
}
