//! Documentation of Open Listling, a collaborative list-making service.
//!
//! Lists are todo lists, shopping lists, polls, meeting agendas, playlists or maps. Anyone with a
//! link can collaborate on a list unless its owner switches it to view mode.
//!
//!
//!
//! # Architecture
//! - [`store`]: the ordered key store contract, backed by Redis ([`database`]) or memory ([`memory`])
//! - [`collection`]: typed indexes with a cached count, made repositionable by [`orderable`] and
//!   vote-ranked by [`ranked`]
//! - [`list`], [`item`], [`user`], [`activity`]: the entities, driven through the [`app::Listling`]
//!   handle
//! - [`routes`]: the JSON API on top
//!
//!
//!
//! # Notes
//!
//! ## Counts
//! Item counts are cached next to the index and adjusted with `INCRBY` after each change. Redis
//! runs each command atomically, but the pair is two commands. A crash in between leaves the count
//! off by one; `POST /api/lists/{id}/recount` rebuilds it from the index.
//!
//! ## Vote ranking
//! A vote-ranked list orders items by descending vote count, and among equal counts by who
//! reached that count first. Both are folded into one sorted-set score, see [`ranked::rank_score`].
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! `````
//!
//! Run against a local Redis.
//! ```sh
//! REDIS_URL=redis://127.0.0.1:6379/0 RUST_LOG=info cargo run
//! `````
//!
//! Run without Redis.
//! ```sh
//! cargo run -- --memory
//! `````
//!
//!
//!
//! # Environment
//!
//! - `RUST_PORT`: listen port, default `8080`
//! - `REDIS_URL`: default `redis://127.0.0.1:6379/0`
//! - `LISTLING_STORE`: `redis` or `memory`
//! - `LISTLING_STAFF`: comma separated user ids with owner rights on every list
//! - `/run/secrets/REDIS_PASSWORD`: optional, merged into `REDIS_URL`
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod activity;
pub mod app;
pub mod collection;
pub mod config;
pub mod database;
pub mod error;
pub mod item;
pub mod list;
pub mod memory;
pub mod orderable;
pub mod ranked;
pub mod routes;
pub mod state;
pub mod store;
pub mod templates;
pub mod user;
pub mod utils;
pub mod views;

pub use app::Listling;
pub use config::{Config, StoreKind};
pub use error::AppError;
pub use state::State;

use routes::*;

pub fn build_router(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/login", post(login_handler))
        .route("/api/users/{id}", get(user_handler))
        .route(
            "/api/users/{id}/lists",
            get(user_lists_handler).post(user_lists_add_handler),
        )
        .route(
            "/api/users/{id}/lists/{list_id}",
            delete(user_lists_remove_handler),
        )
        .route("/api/lists", post(create_list_handler))
        .route("/api/lists/create-example", post(create_example_handler))
        .route("/api/lists/{id}", get(list_handler).post(edit_list_handler))
        .route("/api/lists/{id}/activity", get(activity_handler))
        .route("/api/lists/{id}/recount", post(recount_handler))
        .route(
            "/api/lists/{id}/items",
            get(items_handler).post(create_item_handler),
        )
        .route("/api/lists/{id}/items/move", post(move_item_handler))
        .route(
            "/api/lists/{id}/items/{item_id}",
            get(item_handler)
                .post(edit_item_handler)
                .delete(delete_item_handler),
        )
        .route("/api/lists/{id}/items/{item_id}/check", post(check_item_handler))
        .route(
            "/api/lists/{id}/items/{item_id}/uncheck",
            post(uncheck_item_handler),
        )
        .route("/api/lists/{id}/items/{item_id}/trash", post(trash_item_handler))
        .route(
            "/api/lists/{id}/items/{item_id}/restore",
            post(restore_item_handler),
        )
        .route(
            "/api/lists/{id}/items/{item_id}/votes",
            get(votes_handler).post(vote_handler).delete(unvote_handler),
        )
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(config: Config) -> Result<(), AppError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new(config).await?;

    info!("Starting server...");
    let address = format!("0.0.0.0:{}", state.config.port);
    let app = build_router(state);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
