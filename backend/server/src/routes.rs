use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State as AxumState},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    error::AppError,
    item::{ItemEdit, Location, NewItem, item_json},
    list::{ListEdit, Op, list_json, list_summary_json},
    state::State,
    store::MoveTarget,
    user::{User, user_json},
    utils::{double_option, parse_body},
};

type AppState = AxumState<Arc<State>>;
type JsonResult = Result<Json<Value>, AppError>;

/// Caller identified by `Authorization: Bearer <auth_secret>`. Without the header the caller is
/// anonymous; an unknown secret is rejected.
async fn current_user(state: &State, headers: &HeaderMap) -> Result<Option<User>, AppError> {
    let Some(header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let secret = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AppError::Permission)?;

    let user = state
        .app
        .users()
        .authenticate(secret)
        .await?
        .ok_or(AppError::Permission)?;
    Ok(Some(user))
}

#[derive(Deserialize)]
struct CreateList {
    use_case: Option<String>,
    title: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct CreateExample {
    use_case: String,
}

#[derive(Deserialize)]
struct AddUserList {
    list_id: String,
}

#[derive(Deserialize)]
struct ItemBody {
    title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    text: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    resource: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    location: Option<Option<Value>>,
}

#[derive(Deserialize)]
struct MoveBody {
    item_id: String,
    #[serde(default)]
    to_id: Option<String>,
}

pub async fn login_handler(AxumState(state): AppState) -> JsonResult {
    let user = state.app.users().login().await?;
    Ok(Json(user_json(&user, Some(&user))))
}

pub async fn user_handler(
    AxumState(state): AppState,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let target = state.app.user(&id).await?;
    Ok(Json(user_json(&target, user.as_ref())))
}

pub async fn user_lists_handler(
    AxumState(state): AppState,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let owner = state.app.user(&id).await?;
    let lists = state.app.user_lists(owner);
    let view = lists.read(user.as_ref())?.serialize(true, list_summary_json).await?;
    Ok(Json(view))
}

pub async fn user_lists_add_handler(
    AxumState(state): AppState,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let user = current_user(&state, &headers).await?;
    let AddUserList { list_id } = parse_body(body)?;
    let owner = state.app.user(&id).await?;
    let lst = state.app.list(&list_id).await?;
    state.app.user_lists(owner).add(&lst, user.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn user_lists_remove_handler(
    AxumState(state): AppState,
    Path((id, list_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let user = current_user(&state, &headers).await?;
    let owner = state.app.user(&id).await?;
    let lst = state.app.list(&list_id).await?;
    state.app.user_lists(owner).remove(&lst, user.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_list_handler(
    AxumState(state): AppState,
    headers: HeaderMap,
    body: Bytes,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let payload: CreateList = parse_body(body)?;
    let lst = state
        .app
        .lists()
        .create_titled(
            user.as_ref(),
            payload.use_case.as_deref(),
            payload.title,
            payload.description,
        )
        .await?;
    Ok(Json(list_json(&state.app, &lst, user.as_ref(), true).await?))
}

pub async fn create_example_handler(
    AxumState(state): AppState,
    headers: HeaderMap,
    body: Bytes,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let CreateExample { use_case } = parse_body(body)?;
    let lst = state.app.lists().create_example(user.as_ref(), &use_case).await?;
    Ok(Json(list_json(&state.app, &lst, user.as_ref(), true).await?))
}

pub async fn list_handler(
    AxumState(state): AppState,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let lst = state.app.list(&id).await?;
    Ok(Json(list_json(&state.app, &lst, user.as_ref(), true).await?))
}

pub async fn edit_list_handler(
    AxumState(state): AppState,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let edit: ListEdit = parse_body(body)?;
    let mut lst = state.app.list(&id).await?;
    lst.edit(&state.app, user.as_ref(), edit).await?;
    Ok(Json(list_json(&state.app, &lst, user.as_ref(), true).await?))
}

pub async fn activity_handler(
    AxumState(state): AppState,
    Path(id): Path<String>,
) -> JsonResult {
    let lst = state.app.list(&id).await?;
    Ok(Json(lst.activity(&state.app).serialize(true).await?))
}

pub async fn recount_handler(
    AxumState(state): AppState,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let lst = state.app.list(&id).await?;
    lst.check_permission(&state.app, user.as_ref(), Op::ListModify)?;
    let count = lst.items(&state.app).recount().await?;
    Ok(Json(json!({ "count": count })))
}

pub async fn items_handler(
    AxumState(state): AppState,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let lst = state.app.list(&id).await?;
    let mut items = Vec::new();
    for item in lst.items(&state.app).values().await? {
        items.push(item_json(&state.app, &item, user.as_ref()).await?);
    }
    Ok(Json(Value::Array(items)))
}

pub async fn create_item_handler(
    AxumState(state): AppState,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let payload: ItemBody = parse_body(body)?;
    let new_item = NewItem {
        title: payload.title.unwrap_or_default(),
        text: payload.text.flatten(),
        resource: payload.resource.flatten(),
        location: payload.location.flatten().map(Location::parse).transpose()?,
    };

    let lst = state.app.list(&id).await?;
    let item = lst.items(&state.app).create(user.as_ref(), new_item).await?;
    Ok(Json(item_json(&state.app, &item, user.as_ref()).await?))
}

pub async fn move_item_handler(
    AxumState(state): AppState,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let user = current_user(&state, &headers).await?;
    let MoveBody { item_id, to_id } = parse_body(body)?;
    let target = match to_id {
        Some(anchor) => MoveTarget::Before(anchor),
        None => MoveTarget::Head,
    };

    let lst = state.app.list(&id).await?;
    lst.items(&state.app)
        .move_item(user.as_ref(), &item_id, &target)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn item_handler(
    AxumState(state): AppState,
    Path((id, item_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let (_, item) = state.app.item(&id, &item_id).await?;
    Ok(Json(item_json(&state.app, &item, user.as_ref()).await?))
}

pub async fn edit_item_handler(
    AxumState(state): AppState,
    Path((id, item_id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let payload: ItemBody = parse_body(body)?;
    let edit = ItemEdit {
        title: payload.title,
        text: payload.text,
        resource: payload.resource,
        location: payload
            .location
            .map(|location| location.map(Location::parse).transpose())
            .transpose()?,
    };

    let (_, mut item) = state.app.item(&id, &item_id).await?;
    item.edit(&state.app, user.as_ref(), edit).await?;
    Ok(Json(item_json(&state.app, &item, user.as_ref()).await?))
}

pub async fn delete_item_handler(
    AxumState(state): AppState,
    Path((id, item_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let user = current_user(&state, &headers).await?;
    let (lst, item) = state.app.item(&id, &item_id).await?;
    lst.items(&state.app).remove(user.as_ref(), &item).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn check_item_handler(
    AxumState(state): AppState,
    Path((id, item_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let (_, mut item) = state.app.item(&id, &item_id).await?;
    item.check(&state.app, user.as_ref()).await?;
    Ok(Json(item_json(&state.app, &item, user.as_ref()).await?))
}

pub async fn uncheck_item_handler(
    AxumState(state): AppState,
    Path((id, item_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let (_, mut item) = state.app.item(&id, &item_id).await?;
    item.uncheck(&state.app, user.as_ref()).await?;
    Ok(Json(item_json(&state.app, &item, user.as_ref()).await?))
}

pub async fn trash_item_handler(
    AxumState(state): AppState,
    Path((id, item_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let (_, mut item) = state.app.item(&id, &item_id).await?;
    item.trash(&state.app, user.as_ref()).await?;
    Ok(Json(item_json(&state.app, &item, user.as_ref()).await?))
}

pub async fn restore_item_handler(
    AxumState(state): AppState,
    Path((id, item_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let (_, mut item) = state.app.item(&id, &item_id).await?;
    item.restore(&state.app, user.as_ref()).await?;
    Ok(Json(item_json(&state.app, &item, user.as_ref()).await?))
}

pub async fn votes_handler(
    AxumState(state): AppState,
    Path((id, item_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let (_, item) = state.app.item(&id, &item_id).await?;
    let view = item
        .votes(&state.app)
        .serialize(true, |voter| user_json(voter, user.as_ref()))
        .await?;
    Ok(Json(view))
}

pub async fn vote_handler(
    AxumState(state): AppState,
    Path((id, item_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let (_, mut item) = state.app.item(&id, &item_id).await?;
    item.vote(&state.app, user.as_ref()).await?;
    Ok(Json(item_json(&state.app, &item, user.as_ref()).await?))
}

pub async fn unvote_handler(
    AxumState(state): AppState,
    Path((id, item_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> JsonResult {
    let user = current_user(&state, &headers).await?;
    let (_, mut item) = state.app.item(&id, &item_id).await?;
    item.unvote(&state.app, user.as_ref()).await?;
    Ok(Json(item_json(&state.app, &item, user.as_ref()).await?))
}
