//! Per-list event log, newest last.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    collection::{Collection, Member},
    error::AppError,
    store::Store,
    user::User,
    utils::randstr,
    views,
};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub object: Option<String>,
    pub user: Option<String>,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub detail: Value,
}

impl Member for Event {
    fn id(&self) -> &str {
        &self.id
    }
}

pub fn event_json(event: &Event) -> Value {
    views::merge([
        views::identity("Event", &event.id),
        json!({
            "type": event.kind,
            "object": event.object,
            "user": event.user,
            "time": event.time,
            "detail": event.detail,
        }),
    ])
}

#[derive(Clone)]
pub struct Activity {
    events: Collection<Event>,
}

impl Activity {
    pub fn new(store: Store, host_id: &str) -> Self {
        Self {
            events: Collection::sequence(store, format!("{host_id}.activity")),
        }
    }

    pub async fn publish(
        &self,
        kind: &str,
        object: Option<&str>,
        user: Option<&User>,
        detail: Value,
    ) -> Result<Event, AppError> {
        let event = Event {
            id: format!("Event:{}", randstr()),
            kind: kind.to_string(),
            object: object.map(str::to_string),
            user: user.map(|u| u.id.clone()),
            time: Utc::now(),
            detail,
        };
        self.events.insert(&event, 0.0).await?;

        debug!("Published {kind} on {}", self.events.key());
        Ok(event)
    }

    pub async fn events(&self) -> Result<Vec<Event>, AppError> {
        self.events.values().await
    }

    pub async fn serialize(&self, include_items: bool) -> Result<Value, AppError> {
        self.events.serialize(include_items, event_json).await
    }
}
