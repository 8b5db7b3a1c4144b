//! # Items
//!
//! Items of one list live in two indexes that share a single cached count:
//!
//! - `<list>.items`: insertion order, repositioned by `move`
//! - `<list>.items.ranked`: vote score, see [`crate::ranked`]
//!
//! The list's feature set picks which one is the primary (iteration, count upkeep, removal
//! errors); the other is kept in step structurally, so switching `vote` on or off never loses
//! order. Voting is one causal chain per item, held under the item lock:
//!
//! 1. tick the list clock
//! 2. add or rescore the voter in `<item>.votes`
//! 3. if the tally changed, store the tick as the item's `reached` and rescore it in
//!    `<list>.items.ranked`
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::{
    app::Listling,
    collection::{Collection, Member, Members},
    error::AppError,
    list::{Feature, List, Op},
    ranked::rank_score,
    store::{MoveTarget, get_object, set_object},
    user::User,
    utils::{randstr, str_or_none},
    views,
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Location {
    pub name: String,
    pub coords: Option<[f64; 2]>,
}

impl Location {
    pub fn parse(value: Value) -> Result<Self, AppError> {
        serde_json::from_value(value).map_err(|_| AppError::validation("bad_location_type"))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Item {
    pub id: String,
    pub authors: Vec<String>,
    pub trashed: bool,
    pub text: Option<String>,
    pub resource: Option<String>,
    /// Owning list, resolved through [`Listling::list`] when needed.
    pub list_id: String,
    pub title: String,
    pub location: Option<Location>,
    pub checked: bool,
    /// List clock tick at creation.
    pub arrival: i64,
    /// List clock tick at which the current vote tally was reached; orders equal tallies.
    pub reached: i64,
}

impl Member for Item {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_trashed(&self) -> bool {
        self.trashed
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub title: String,
    pub text: Option<String>,
    pub resource: Option<String>,
    pub location: Option<Location>,
}

/// Partial update; `Some(None)` clears a field.
#[derive(Debug, Clone, Default)]
pub struct ItemEdit {
    pub title: Option<String>,
    pub text: Option<Option<String>>,
    pub resource: Option<Option<String>>,
    pub location: Option<Option<Location>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOrdering {
    Sequence,
    VoteRanked,
}

impl ItemOrdering {
    pub fn for_features(features: &[Feature]) -> Self {
        if features.contains(&Feature::Vote) {
            ItemOrdering::VoteRanked
        } else {
            ItemOrdering::Sequence
        }
    }
}

pub struct Items {
    app: Listling,
    list: List,
    ordering: ItemOrdering,
    sequence: Collection<Item>,
    ranked: Collection<Item>,
}

impl Items {
    pub fn new(app: Listling, list: List) -> Self {
        let count_key = format!("{}.items.count", list.id);
        let sequence = Collection::sequence(app.store.clone(), format!("{}.items", list.id))
            .with_count_key(count_key.clone());
        let ranked = Collection::scored(app.store.clone(), format!("{}.items.ranked", list.id))
            .with_count_key(count_key);

        Self {
            ordering: ItemOrdering::for_features(&list.features),
            app,
            list,
            sequence,
            ranked,
        }
    }

    fn primary(&self) -> &Collection<Item> {
        match self.ordering {
            ItemOrdering::Sequence => &self.sequence,
            ItemOrdering::VoteRanked => &self.ranked,
        }
    }

    fn secondary(&self) -> &Collection<Item> {
        match self.ordering {
            ItemOrdering::Sequence => &self.ranked,
            ItemOrdering::VoteRanked => &self.sequence,
        }
    }

    pub async fn create(&self, user: Option<&User>, new: NewItem) -> Result<Item, AppError> {
        self.list.check_permission(&self.app, user, Op::ListModify)?;
        let Some(user) = user else {
            return Err(AppError::Permission);
        };
        if str_or_none(Some(&new.title)).is_none() {
            return Err(AppError::validation("title_empty"));
        }

        let arrival = self.list.tick(&self.app).await?;
        let item = Item {
            id: format!("Item:{}", randstr()),
            authors: vec![user.id.clone()],
            trashed: false,
            text: str_or_none(new.text.as_deref()),
            resource: str_or_none(new.resource.as_deref()),
            list_id: self.list.id.clone(),
            title: new.title,
            location: new.location,
            checked: false,
            arrival,
            reached: arrival,
        };

        let score = rank_score(0, arrival);
        self.primary().insert(&item, score).await?;
        self.secondary().index(&item.id, score).await?;

        self.list
            .activity(&self.app)
            .publish(
                "list-create-item",
                Some(&self.list.id),
                Some(user),
                json!({ "item": item.id }),
            )
            .await?;
        info!("Created item {} in {}", item.id, self.list.id);
        Ok(item)
    }

    pub async fn get(&self, id: &str) -> Result<Item, AppError> {
        self.primary().get(id).await
    }

    pub async fn contains(&self, id: &str) -> Result<bool, AppError> {
        self.primary().contains(id).await
    }

    pub async fn count(&self) -> Result<u64, AppError> {
        self.primary().count().await
    }

    pub async fn recount(&self) -> Result<u64, AppError> {
        let count = self.primary().recount().await?;
        info!("Recounted {} items of {}", count, self.list.id);
        Ok(count)
    }

    pub async fn iter(&self) -> Result<Members<Item>, AppError> {
        self.primary().iter().await
    }

    pub async fn values(&self) -> Result<Vec<Item>, AppError> {
        self.primary().values().await
    }

    /// Hard delete. The record, both index entries and the item's votes go away.
    pub async fn remove(&self, user: Option<&User>, item: &Item) -> Result<(), AppError> {
        self.list.check_permission(&self.app, user, Op::ListModify)?;

        let _guard = self.app.lock(&item.id).await;
        let item: Item = get_object(self.app.store.as_ref(), &item.id)
            .await?
            .ok_or_else(|| AppError::not_found(&item.id))?;

        self.primary().remove(&item).await?;
        self.secondary().unindex(&item.id).await?;

        let store = self.app.store.as_ref();
        let votes = item.votes(&self.app);
        store.delete(votes.key()).await?;
        store.delete(&format!("{}.count", votes.key())).await?;
        store.delete(&item.id).await?;

        info!("Deleted item {} from {}", item.id, self.list.id);
        Ok(())
    }

    pub async fn move_item(
        &self,
        user: Option<&User>,
        id: &str,
        target: &MoveTarget,
    ) -> Result<(), AppError> {
        self.list.check_permission(&self.app, user, Op::ListModify)?;
        if self.ordering == ItemOrdering::VoteRanked {
            return Err(AppError::validation("ordered_by_votes"));
        }
        self.sequence.move_member(id, target).await
    }

    /// Re-derives the rank of `item` from its tally and `reached` tick. Call once per tally
    /// change, under the item lock, after `<item>.votes` and the item record have been written.
    pub async fn on_vote_changed(&self, item: &Item) -> Result<(), AppError> {
        let tally = item.votes(&self.app).count().await?;
        self.ranked.rank(&item.id, tally, item.reached).await
    }

    async fn adjust_count(&self, delta: i64) -> Result<(), AppError> {
        self.primary().adjust_count(delta).await?;
        Ok(())
    }

    pub async fn serialize(&self, user: Option<&User>, include_items: bool) -> Result<Value, AppError> {
        let count = self.count().await?;
        if !include_items {
            return Ok(json!({ "count": count }));
        }

        let mut rendered = Vec::new();
        for item in self.values().await? {
            rendered.push(item_json(&self.app, &item, user).await?);
        }
        Ok(json!({ "count": count, "items": rendered }))
    }
}

impl Item {
    /// Owning list, looked up by id.
    pub async fn list(&self, app: &Listling) -> Result<List, AppError> {
        app.list(&self.list_id).await
    }

    pub fn votes(&self, app: &Listling) -> Collection<User> {
        Collection::scored(app.store.clone(), format!("{}.votes", self.id))
    }

    async fn reload(&mut self, app: &Listling) -> Result<(), AppError> {
        let id = self.id.clone();
        *self = get_object(app.store.as_ref(), &id)
            .await?
            .ok_or_else(|| AppError::not_found(&id))?;
        Ok(())
    }

    async fn save(&self, app: &Listling) -> Result<(), AppError> {
        Ok(set_object(app.store.as_ref(), &self.id, self).await?)
    }

    pub async fn check(&mut self, app: &Listling, user: Option<&User>) -> Result<(), AppError> {
        self.set_checked(app, user, true).await
    }

    pub async fn uncheck(&mut self, app: &Listling, user: Option<&User>) -> Result<(), AppError> {
        self.set_checked(app, user, false).await
    }

    async fn set_checked(
        &mut self,
        app: &Listling,
        user: Option<&User>,
        checked: bool,
    ) -> Result<(), AppError> {
        let lst = self.list(app).await?;
        lst.check_feature(Feature::Check, user)?;
        lst.check_permission(app, user, Op::ItemModify)?;

        let _guard = app.lock(&self.id).await;
        self.reload(app).await?;
        self.checked = checked;
        self.save(app).await?;

        let kind = if checked { "item-check" } else { "item-uncheck" };
        lst.activity(app)
            .publish(kind, Some(&self.id), user, json!({}))
            .await?;
        Ok(())
    }

    pub async fn edit(
        &mut self,
        app: &Listling,
        user: Option<&User>,
        edit: ItemEdit,
    ) -> Result<(), AppError> {
        let lst = self.list(app).await?;
        lst.check_permission(app, user, Op::ItemModify)?;
        if let Some(title) = &edit.title {
            if str_or_none(Some(title)).is_none() {
                return Err(AppError::validation("title_empty"));
            }
        }

        let _guard = app.lock(&self.id).await;
        self.reload(app).await?;

        if let Some(title) = edit.title {
            self.title = title;
        }
        if let Some(text) = edit.text {
            self.text = str_or_none(text.as_deref());
        }
        if let Some(resource) = edit.resource {
            self.resource = str_or_none(resource.as_deref());
        }
        if let Some(location) = edit.location {
            self.location = location;
        }
        if let Some(user) = user {
            if !self.authors.contains(&user.id) {
                self.authors.push(user.id.clone());
            }
        }
        self.save(app).await?;

        lst.activity(app)
            .publish("editable-edit", Some(&self.id), user, json!({}))
            .await?;
        Ok(())
    }

    pub async fn trash(&mut self, app: &Listling, user: Option<&User>) -> Result<(), AppError> {
        self.set_trashed(app, user, true).await
    }

    pub async fn restore(&mut self, app: &Listling, user: Option<&User>) -> Result<(), AppError> {
        self.set_trashed(app, user, false).await
    }

    async fn set_trashed(
        &mut self,
        app: &Listling,
        user: Option<&User>,
        trashed: bool,
    ) -> Result<(), AppError> {
        let lst = self.list(app).await?;
        lst.check_permission(app, user, Op::ItemModify)?;

        let _guard = app.lock(&self.id).await;
        self.reload(app).await?;
        if self.trashed == trashed {
            return Ok(());
        }

        self.trashed = trashed;
        self.save(app).await?;
        lst.items(app)
            .adjust_count(if trashed { -1 } else { 1 })
            .await?;

        let kind = if trashed {
            "trashable-trash"
        } else {
            "trashable-restore"
        };
        lst.activity(app)
            .publish(kind, Some(&self.id), user, json!({}))
            .await?;
        Ok(())
    }

    /// Votes as `user`. Voting again only refreshes the vote time; the rank stays put.
    pub async fn vote(&mut self, app: &Listling, user: Option<&User>) -> Result<(), AppError> {
        let lst = self.list(app).await?;
        lst.check_feature(Feature::Vote, user)?;
        let Some(user) = user else {
            return Err(AppError::Permission);
        };

        let _guard = app.lock(&self.id).await;
        self.reload(app).await?;
        let tick = lst.tick(app).await?;
        if self.votes(app).add(&user.id, tick as f64).await? {
            self.reached = tick;
            self.save(app).await?;
            lst.items(app).on_vote_changed(self).await?;
        }

        lst.activity(app)
            .publish("item-vote", Some(&self.id), Some(user), json!({}))
            .await?;
        info!("{} voted for {}", user.id, self.id);
        Ok(())
    }

    /// Withdraws `user`'s vote. Without a prior vote this is a no-op.
    pub async fn unvote(&mut self, app: &Listling, user: Option<&User>) -> Result<(), AppError> {
        let lst = self.list(app).await?;
        lst.check_feature(Feature::Vote, user)?;
        let Some(user) = user else {
            return Err(AppError::Permission);
        };

        let _guard = app.lock(&self.id).await;
        self.reload(app).await?;
        if !self.votes(app).discard(&user.id).await? {
            return Ok(());
        }
        self.reached = lst.tick(app).await?;
        self.save(app).await?;
        lst.items(app).on_vote_changed(self).await?;

        lst.activity(app)
            .publish("item-unvote", Some(&self.id), Some(user), json!({}))
            .await?;
        info!("{} unvoted {}", user.id, self.id);
        Ok(())
    }
}

pub async fn item_json(app: &Listling, item: &Item, user: Option<&User>) -> Result<Value, AppError> {
    let votes = item.votes(app);
    let mut vote_view = json!({ "count": votes.count().await? });
    if let Some(user) = user {
        vote_view["user_voted"] = json!(votes.contains(&user.id).await?);
    }

    Ok(views::merge([
        views::identity("Item", &item.id),
        views::editable(&item.authors),
        views::trashable(item.trashed),
        views::content(item.text.as_deref(), item.resource.as_deref()),
        json!({
            "list_id": item.list_id,
            "title": item.title,
            "location": item.location,
            "checked": item.checked,
            "votes": vote_view,
        }),
    ]))
}
