//! # Lists
//!
//! A list owns an [`Items`] collection and an [`Activity`] log, both namespaced under its id.
//!
//! ## Permissions
//!
//! | mode          | any authenticated user        | owner / staff |
//! |---------------|-------------------------------|---------------|
//! | `collaborate` | `list-modify`, `item-modify`  | everything    |
//! | `view`        | nothing                       | everything    |
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::{
    activity::Activity,
    app::Listling,
    collection::{Collection, Member},
    error::AppError,
    item::{Items, Location, NewItem},
    store::{get_object, set_object},
    templates::{self, EXAMPLE_NOTE},
    user::User,
    utils::{double_option, randstr, str_or_none},
    views,
};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Check,
    Location,
    Play,
    Vote,
}

impl FromStr for Feature {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check" => Ok(Feature::Check),
            "location" => Ok(Feature::Location),
            "play" => Ok(Feature::Play),
            "vote" => Ok(Feature::Vote),
            _ => Err(AppError::validation("feature_unknown")),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Collaborate,
    View,
}

impl FromStr for Mode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "collaborate" => Ok(Mode::Collaborate),
            "view" => Ok(Mode::View),
            _ => Err(AppError::validation("mode_unknown")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    ListModify,
    ItemModify,
}

impl Mode {
    /// What any authenticated user may do under this mode.
    pub fn grants(self, _op: Op) -> bool {
        match self {
            Mode::Collaborate => true,
            Mode::View => false,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct List {
    pub id: String,
    pub authors: Vec<String>,
    pub title: String,
    pub description: Option<String>,
    pub features: Vec<Feature>,
    pub mode: Mode,
    pub created: DateTime<Utc>,
}

impl Member for List {
    fn id(&self) -> &str {
        &self.id
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ListEdit {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub features: Option<Vec<String>>,
    pub mode: Option<String>,
}

impl List {
    /// First author. A record without authors has no owner, so nobody gets owner rights.
    pub fn owner(&self) -> Option<&str> {
        self.authors.first().map(String::as_str)
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    pub fn check_permission(
        &self,
        app: &Listling,
        user: Option<&User>,
        op: Op,
    ) -> Result<(), AppError> {
        let Some(user) = user else {
            return Err(AppError::Permission);
        };
        let is_owner = self.owner() == Some(user.id.as_str());
        if self.mode.grants(op) || is_owner || app.is_staff(user) {
            Ok(())
        } else {
            Err(AppError::Permission)
        }
    }

    /// Feature gate for item operations. A disabled feature wins over a missing user.
    pub fn check_feature(&self, feature: Feature, user: Option<&User>) -> Result<(), AppError> {
        if !self.has_feature(feature) {
            return Err(AppError::validation("feature_disabled"));
        }
        if user.is_none() {
            return Err(AppError::Permission);
        }
        Ok(())
    }

    pub fn items(&self, app: &Listling) -> Items {
        Items::new(app.clone(), self.clone())
    }

    pub fn activity(&self, app: &Listling) -> Activity {
        Activity::new(app.store.clone(), &self.id)
    }

    /// Next tick of the list clock. Ticks order item creation and votes within the list.
    pub async fn tick(&self, app: &Listling) -> Result<i64, AppError> {
        Ok(app.store.increment(&format!("{}.clock", self.id), 1).await?)
    }

    pub async fn edit(
        &mut self,
        app: &Listling,
        user: Option<&User>,
        edit: ListEdit,
    ) -> Result<(), AppError> {
        self.check_permission(app, user, Op::ListModify)?;

        if let Some(title) = &edit.title {
            if str_or_none(Some(title)).is_none() {
                return Err(AppError::validation("title_empty"));
            }
        }
        let features = edit
            .features
            .as_ref()
            .map(|names| {
                names
                    .iter()
                    .map(|name| name.parse::<Feature>())
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;
        let mode = edit.mode.as_deref().map(Mode::from_str).transpose()?;

        let _guard = app.lock(&self.id).await;
        if let Some(current) = get_object::<List>(app.store.as_ref(), &self.id).await? {
            *self = current;
        }

        if let Some(title) = edit.title {
            self.title = title;
        }
        if let Some(description) = edit.description {
            self.description = str_or_none(description.as_deref());
        }
        if let Some(features) = features {
            self.features.clear();
            for feature in features {
                if !self.features.contains(&feature) {
                    self.features.push(feature);
                }
            }
        }
        if let Some(mode) = mode {
            self.mode = mode;
        }
        if let Some(user) = user {
            if !self.authors.contains(&user.id) {
                self.authors.push(user.id.clone());
            }
        }
        set_object(app.store.as_ref(), &self.id, &*self).await?;

        self.activity(app)
            .publish("editable-edit", Some(&self.id), user, json!({}))
            .await?;
        info!("Edited list {}", self.id);
        Ok(())
    }
}

pub async fn list_json(
    app: &Listling,
    lst: &List,
    user: Option<&User>,
    include_items: bool,
) -> Result<Value, AppError> {
    let activity = lst.activity(app).serialize(false).await?;
    let items = lst.items(app).serialize(user, include_items).await?;

    Ok(views::merge([
        views::identity("List", &lst.id),
        views::editable(&lst.authors),
        json!({
            "title": lst.title,
            "description": lst.description,
            "features": lst.features,
            "mode": lst.mode,
            "activity": activity,
            "items": items,
        }),
    ]))
}

/// Summary without activity or items, as shown in a user's list collection.
pub fn list_summary_json(lst: &List) -> Value {
    views::merge([
        views::identity("List", &lst.id),
        views::editable(&lst.authors),
        json!({
            "title": lst.title,
            "description": lst.description,
            "features": lst.features,
            "mode": lst.mode,
        }),
    ])
}

/// Root collection of every list.
pub struct Lists {
    app: Listling,
    collection: Collection<List>,
}

impl Lists {
    pub fn new(app: Listling) -> Self {
        let collection = Collection::sequence(app.store.clone(), "lists");
        Self { app, collection }
    }

    pub async fn create(&self, user: Option<&User>, use_case: Option<&str>) -> Result<List, AppError> {
        let user = user.ok_or(AppError::Permission)?;
        let template = templates::use_case(use_case.unwrap_or("simple"))
            .ok_or_else(|| AppError::validation("use_case_unknown"))?;

        let lst = List {
            id: format!("List:{}", randstr()),
            authors: vec![user.id.clone()],
            title: template.title.to_string(),
            description: None,
            features: template.features.to_vec(),
            mode: Mode::Collaborate,
            created: Utc::now(),
        };
        self.collection.insert(&lst, 0.0).await?;
        self.app.user_lists(user.clone()).add(&lst, Some(user)).await?;
        lst.activity(&self.app)
            .publish("create-list", Some(&lst.id), Some(user), json!({}))
            .await?;

        info!("Created list {} ({})", lst.id, template.name);
        Ok(lst)
    }

    /// Creates a list from `use_case` and applies an optional title and description on top.
    pub async fn create_titled(
        &self,
        user: Option<&User>,
        use_case: Option<&str>,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<List, AppError> {
        let mut lst = self.create(user, use_case).await?;
        if title.is_some() || description.is_some() {
            let edit = ListEdit {
                title,
                description: description.map(Some),
                ..Default::default()
            };
            lst.edit(&self.app, user, edit).await?;
        }
        Ok(lst)
    }

    pub async fn create_example(&self, user: Option<&User>, use_case: &str) -> Result<List, AppError> {
        let example = templates::example(use_case)
            .ok_or_else(|| AppError::validation("use_case_unknown"))?;

        let description = format!("{}\n\n{}", example.description, EXAMPLE_NOTE);
        let lst = self
            .create_titled(
                user,
                Some(use_case),
                Some(example.title.to_string()),
                Some(description),
            )
            .await?;

        let items = lst.items(&self.app);
        for seed in &example.items {
            let new_item = NewItem {
                title: seed.title.to_string(),
                text: seed.text.map(str::to_string),
                resource: seed.resource.map(str::to_string),
                location: seed.location.map(|(name, coords)| Location {
                    name: name.to_string(),
                    coords: Some(coords),
                }),
            };
            let mut item = items.create(user, new_item).await?;
            if seed.checked {
                item.check(&self.app, user).await?;
            }
        }

        Ok(lst)
    }

    /// List `id`; ids outside the root collection are not found, whatever they hold.
    pub async fn get(&self, id: &str) -> Result<List, AppError> {
        self.collection.get(id).await
    }
}
