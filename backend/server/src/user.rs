//! # Users
//!
//! Authentication is kept to the minimum the API needs: `POST /api/login` hands out an anonymous
//! user plus an auth secret, and every later request presents the secret as a bearer token.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::{
    app::Listling,
    collection::{Collection, Member},
    error::AppError,
    list::List,
    store::{get_object, set_object},
    utils::randstr,
    views,
};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: String,
    pub name: String,
    pub auth_secret: String,
    pub created: DateTime<Utc>,
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Member for User {
    fn id(&self) -> &str {
        &self.id
    }
}

fn auth_key(secret: &str) -> String {
    format!("auth:{secret}")
}

/// Public view; the auth secret is only shown to the user it belongs to.
pub fn user_json(user: &User, viewer: Option<&User>) -> Value {
    let secret = (viewer == Some(user)).then(|| json!({ "auth_secret": user.auth_secret }));
    views::merge(
        [
            views::identity("User", &user.id),
            json!({ "name": user.name }),
        ]
        .into_iter()
        .chain(secret),
    )
}

/// Registry of every user, by creation time.
pub struct Users {
    app: Listling,
    collection: Collection<User>,
}

impl Users {
    pub fn new(app: Listling) -> Self {
        let collection = Collection::scored(app.store.clone(), "users");
        Self { app, collection }
    }

    pub async fn login(&self) -> Result<User, AppError> {
        let user = User {
            id: format!("User:{}", randstr()),
            name: "Guest".to_string(),
            auth_secret: randstr(),
            created: Utc::now(),
        };

        let score = user.created.timestamp_micros() as f64 / 1e6;
        self.collection.insert(&user, score).await?;
        set_object(self.app.store.as_ref(), &auth_key(&user.auth_secret), &user.id).await?;

        info!("Created user {}", user.id);
        Ok(user)
    }

    pub async fn authenticate(&self, secret: &str) -> Result<Option<User>, AppError> {
        let store = self.app.store.as_ref();
        let Some(id) = get_object::<String>(store, &auth_key(secret)).await? else {
            return Ok(None);
        };
        Ok(get_object(store, &id).await?)
    }

    /// User `id`; ids of other entities are not found.
    pub async fn get(&self, id: &str) -> Result<User, AppError> {
        self.collection.get(id).await
    }
}

/// A user's personal list collection, newest first. Only the user may read or change it.
pub struct UserLists {
    owner: User,
    collection: Collection<List>,
}

impl UserLists {
    pub fn new(app: &Listling, owner: User) -> Self {
        let collection = Collection::scored(app.store.clone(), format!("{}.lists", owner.id));
        Self { owner, collection }
    }

    fn check_user(&self, user: Option<&User>) -> Result<(), AppError> {
        if user != Some(&self.owner) {
            return Err(AppError::Permission);
        }
        Ok(())
    }

    pub async fn add(&self, lst: &List, user: Option<&User>) -> Result<(), AppError> {
        self.check_user(user)?;
        let score = -(Utc::now().timestamp_micros() as f64) / 1e6;
        self.collection.add(&lst.id, score).await?;
        Ok(())
    }

    pub async fn remove(&self, lst: &List, user: Option<&User>) -> Result<(), AppError> {
        self.check_user(user)?;
        if lst.owner() == Some(self.owner.id.as_str()) {
            return Err(AppError::validation("user_is_owner"));
        }
        if !self.collection.discard(&lst.id).await? {
            return Err(AppError::not_found(&lst.id));
        }
        Ok(())
    }

    pub fn read(&self, user: Option<&User>) -> Result<&Collection<List>, AppError> {
        self.check_user(user)?;
        Ok(&self.collection)
    }
}
