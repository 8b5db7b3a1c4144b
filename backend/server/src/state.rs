use std::sync::Arc;

use tracing::info;

use super::{
    app::Listling,
    config::{Config, StoreKind},
    database::RedisStore,
    error::AppError,
    memory::MemoryStore,
    store::Store,
};

pub struct State {
    pub config: Config,
    pub app: Listling,
}

impl State {
    pub async fn new(config: Config) -> Result<Arc<Self>, AppError> {
        let store: Store = match config.store {
            StoreKind::Redis => Arc::new(RedisStore::connect(&config.redis_url).await?),
            StoreKind::Memory => {
                info!("Using in-memory store, data is lost on exit");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Store) -> Arc<Self> {
        let app = Listling::new(store, config.staff.clone());
        Arc::new(Self { config, app })
    }
}
