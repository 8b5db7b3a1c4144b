use std::{net::SocketAddr, sync::Arc};

use listling::{Config, State, build_router, memory::MemoryStore};
use serde_json::{Value, json};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

async fn spawn_server() -> SocketAddr {
    let state = State::with_store(Config::default(), Arc::new(MemoryStore::new()));
    let app = build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    addr
}

async fn send_raw(
    addr: SocketAddr,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: &str,
) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    if let Some(token) = token {
        req.push_str(&format!("Authorization: Bearer {token}\r\n"));
    }
    req.push_str(&format!(
        "Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    ));
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");

    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response must have separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    (status, body.to_string())
}

async fn send(
    addr: SocketAddr,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (u16, Value) {
    let body = body.map(|body| body.to_string()).unwrap_or_default();
    let (status, raw) = send_raw(addr, method, path, token, &body).await;
    let value = if raw.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&raw).expect("json body")
    };
    (status, value)
}

async fn login(addr: SocketAddr) -> (String, String) {
    let (status, user) = send(addr, "POST", "/api/login", None, None).await;
    assert_eq!(status, 200);
    (
        user["id"].as_str().expect("id").to_string(),
        user["auth_secret"].as_str().expect("secret").to_string(),
    )
}

async fn create_list(addr: SocketAddr, token: &str, use_case: &str) -> String {
    let (status, lst) = send(
        addr,
        "POST",
        "/api/lists",
        Some(token),
        Some(json!({ "use_case": use_case })),
    )
    .await;
    assert_eq!(status, 200);
    lst["id"].as_str().expect("list id").to_string()
}

async fn create_item(addr: SocketAddr, token: &str, list_id: &str, title: &str) -> String {
    let (status, item) = send(
        addr,
        "POST",
        &format!("/api/lists/{list_id}/items"),
        Some(token),
        Some(json!({ "title": title })),
    )
    .await;
    assert_eq!(status, 200, "{item}");
    item["id"].as_str().expect("item id").to_string()
}

async fn item_titles(addr: SocketAddr, list_id: &str) -> Vec<String> {
    let (status, items) = send(
        addr,
        "GET",
        &format!("/api/lists/{list_id}/items"),
        None,
        None,
    )
    .await;
    assert_eq!(status, 200);
    items
        .as_array()
        .expect("items array")
        .iter()
        .map(|item| item["title"].as_str().expect("title").to_string())
        .collect()
}

#[tokio::test]
async fn login_reveals_secret_only_to_its_user() {
    let addr = spawn_server().await;
    let (alice, alice_token) = login(addr).await;
    let (_, bob_token) = login(addr).await;

    let uri = format!("/api/users/{alice}");
    let (status, own) = send(addr, "GET", &uri, Some(alice_token.as_str()), None).await;
    assert_eq!(status, 200);
    assert_eq!(own["__type__"], "User");
    assert_eq!(own["auth_secret"], alice_token.as_str());

    let (_, other) = send(addr, "GET", &uri, Some(bob_token.as_str()), None).await;
    assert!(other.get("auth_secret").is_none());
}

#[tokio::test]
async fn errors_map_to_status_and_type() {
    let addr = spawn_server().await;
    let (_, token) = login(addr).await;

    let (status, body) = send(
        addr,
        "POST",
        "/api/lists",
        None,
        Some(json!({ "use_case": "todo" })),
    )
    .await;
    assert_eq!(status, 403);
    assert_eq!(body["__type__"], "PermissionError");

    let (status, body) = send(
        addr,
        "POST",
        "/api/lists",
        Some(token.as_str()),
        Some(json!({ "use_case": "bogus" })),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({ "__type__": "ValueError", "message": "use_case_unknown" }));

    let (status, body) = send(addr, "GET", "/api/lists/List:nope", None, None).await;
    assert_eq!(status, 404);
    assert_eq!(body["__type__"], "NotFoundError");

    let (status, _) = send(addr, "GET", "/api/users/User:nope", Some("wrong"), None).await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let addr = spawn_server().await;
    let (_, token) = login(addr).await;

    let (status, body) = send_raw(addr, "POST", "/api/lists", Some(token.as_str()), "{not json").await;
    assert_eq!(status, 400);
    assert!(body.contains("ValueError"));
}

#[tokio::test]
async fn list_lifecycle() {
    let addr = spawn_server().await;
    let (user, token) = login(addr).await;

    let (status, lst) = send(
        addr,
        "POST",
        "/api/lists",
        Some(token.as_str()),
        Some(json!({ "use_case": "todo", "title": "Chores", "description": "Weekend" })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(lst["title"], "Chores");
    assert_eq!(lst["features"], json!(["check"]));
    assert_eq!(lst["items"], json!({ "count": 0, "items": [] }));
    let list_id = lst["id"].as_str().expect("id").to_string();

    let (status, edited) = send(
        addr,
        "POST",
        &format!("/api/lists/{list_id}"),
        Some(token.as_str()),
        Some(json!({ "description": null, "mode": "view" })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(edited["description"], Value::Null);
    assert_eq!(edited["mode"], "view");
    assert_eq!(edited["title"], "Chores");

    let (status, lists) = send(
        addr,
        "GET",
        &format!("/api/users/{user}/lists"),
        Some(token.as_str()),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(lists["count"], 1);
    assert_eq!(lists["items"][0]["id"], list_id.as_str());

    let (status, activity) = send(
        addr,
        "GET",
        &format!("/api/lists/{list_id}/activity"),
        None,
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(activity["items"][0]["type"], "create-list");
}

#[tokio::test]
async fn item_endpoints() {
    let addr = spawn_server().await;
    let (_, token) = login(addr).await;
    let list_id = create_list(addr, &token, "todo").await;

    let (status, body) = send(
        addr,
        "POST",
        &format!("/api/lists/{list_id}/items"),
        Some(token.as_str()),
        Some(json!({ "title": "  " })),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "title_empty");

    let item_id = create_item(addr, &token, &list_id, "Laundry").await;
    let item_uri = format!("/api/lists/{list_id}/items/{item_id}");

    let (status, item) = send(
        addr,
        "POST",
        &format!("{item_uri}/check"),
        Some(token.as_str()),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(item["checked"], true);

    let (status, item) = send(
        addr,
        "POST",
        &item_uri,
        Some(token.as_str()),
        Some(json!({ "text": "Whites only" })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(item["text"], "Whites only");
    assert_eq!(item["title"], "Laundry");

    let (status, item) = send(
        addr,
        "POST",
        &format!("{item_uri}/trash"),
        Some(token.as_str()),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(item["trashed"], true);

    let (_, lst) = send(addr, "GET", &format!("/api/lists/{list_id}"), None, None).await;
    assert_eq!(lst["items"]["count"], 0);

    let (status, _) = send(addr, "DELETE", &item_uri, Some(token.as_str()), None).await;
    assert_eq!(status, 204);
    let (status, _) = send(addr, "GET", &item_uri, None, None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn check_on_list_without_feature_fails() {
    let addr = spawn_server().await;
    let (_, token) = login(addr).await;
    let list_id = create_list(addr, &token, "simple").await;
    let item_id = create_item(addr, &token, &list_id, "Milk").await;

    let (status, body) = send(
        addr,
        "POST",
        &format!("/api/lists/{list_id}/items/{item_id}/check"),
        Some(token.as_str()),
        None,
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "feature_disabled");
}

#[tokio::test]
async fn location_must_be_an_object() {
    let addr = spawn_server().await;
    let (_, token) = login(addr).await;
    let list_id = create_list(addr, &token, "map").await;

    let (status, body) = send(
        addr,
        "POST",
        &format!("/api/lists/{list_id}/items"),
        Some(token.as_str()),
        Some(json!({ "title": "Cafe", "location": "somewhere" })),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "bad_location_type");

    let (status, item) = send(
        addr,
        "POST",
        &format!("/api/lists/{list_id}/items"),
        Some(token.as_str()),
        Some(json!({
            "title": "Cafe",
            "location": { "name": "Pier", "coords": [52.5, 13.4] },
        })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(item["location"]["name"], "Pier");
}

#[tokio::test]
async fn move_endpoint_reorders_items() {
    let addr = spawn_server().await;
    let (_, token) = login(addr).await;
    let list_id = create_list(addr, &token, "shopping").await;

    let a = create_item(addr, &token, &list_id, "A").await;
    create_item(addr, &token, &list_id, "B").await;
    let c = create_item(addr, &token, &list_id, "C").await;
    let move_uri = format!("/api/lists/{list_id}/items/move");

    let (status, _) = send(
        addr,
        "POST",
        &move_uri,
        Some(token.as_str()),
        Some(json!({ "item_id": c, "to_id": a })),
    )
    .await;
    assert_eq!(status, 204);
    assert_eq!(item_titles(addr, &list_id).await, ["C", "A", "B"]);

    let (status, _) = send(
        addr,
        "POST",
        &move_uri,
        Some(token.as_str()),
        Some(json!({ "item_id": a, "to_id": null })),
    )
    .await;
    assert_eq!(status, 204);
    assert_eq!(item_titles(addr, &list_id).await, ["A", "C", "B"]);
}

#[tokio::test]
async fn votes_endpoints_rank_items() {
    let addr = spawn_server().await;
    let (_, alice) = login(addr).await;
    let (_, bob) = login(addr).await;
    let list_id = create_list(addr, &alice, "poll").await;

    create_item(addr, &alice, &list_id, "A").await;
    let b = create_item(addr, &alice, &list_id, "B").await;
    let c = create_item(addr, &alice, &list_id, "C").await;
    let votes = |item: &str| format!("/api/lists/{list_id}/items/{item}/votes");

    for token in [alice.as_str(), bob.as_str()] {
        let (status, _) = send(addr, "POST", &votes(b.as_str()), Some(token), None).await;
        assert_eq!(status, 200);
    }
    let (status, item) = send(addr, "POST", &votes(c.as_str()), Some(alice.as_str()), None).await;
    assert_eq!(status, 200);
    assert_eq!(item["votes"], json!({ "count": 1, "user_voted": true }));
    assert_eq!(item_titles(addr, &list_id).await, ["B", "C", "A"]);

    let (status, voters) = send(addr, "GET", &votes(b.as_str()), None, None).await;
    assert_eq!(status, 200);
    assert_eq!(voters["count"], 2);

    let (status, item) = send(addr, "DELETE", &votes(c.as_str()), Some(bob.as_str()), None).await;
    assert_eq!(status, 200);
    assert_eq!(item["votes"], json!({ "count": 1, "user_voted": false }));

    let (status, body) = send(
        addr,
        "POST",
        &format!("/api/lists/{list_id}/items/move"),
        Some(alice.as_str()),
        Some(json!({ "item_id": c, "to_id": null })),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "ordered_by_votes");
}

#[tokio::test]
async fn create_example_and_recount() {
    let addr = spawn_server().await;
    let (_, token) = login(addr).await;

    let (status, lst) = send(
        addr,
        "POST",
        "/api/lists/create-example",
        Some(token.as_str()),
        Some(json!({ "use_case": "shopping" })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(lst["title"], "Kitchen shopping list");
    assert_eq!(lst["items"]["count"], 3);
    let list_id = lst["id"].as_str().expect("id");

    let (status, body) = send(
        addr,
        "POST",
        &format!("/api/lists/{list_id}/recount"),
        Some(token.as_str()),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "count": 3 }));
}

#[tokio::test]
async fn user_lists_membership_endpoints() {
    let addr = spawn_server().await;
    let (_, owner_token) = login(addr).await;
    let (guest, guest_token) = login(addr).await;
    let list_id = create_list(addr, &owner_token, "simple").await;
    let lists_uri = format!("/api/users/{guest}/lists");

    let (status, _) = send(
        addr,
        "POST",
        &lists_uri,
        Some(guest_token.as_str()),
        Some(json!({ "list_id": list_id })),
    )
    .await;
    assert_eq!(status, 204);

    let (status, _) = send(addr, "GET", &lists_uri, Some(owner_token.as_str()), None).await;
    assert_eq!(status, 403);

    let (_, lists) = send(addr, "GET", &lists_uri, Some(guest_token.as_str()), None).await;
    assert_eq!(lists["count"], 1);

    let remove_uri = format!("{lists_uri}/{list_id}");
    let (status, _) = send(addr, "DELETE", &remove_uri, Some(guest_token.as_str()), None).await;
    assert_eq!(status, 204);
    let (status, _) = send(addr, "DELETE", &remove_uri, Some(guest_token.as_str()), None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn items_endpoint_returns_item_array() {
    let addr = spawn_server().await;
    let (_, token) = login(addr).await;
    let list_id = create_list(addr, &token, "todo").await;

    let (status, items) = send(addr, "GET", &format!("/api/lists/{list_id}/items"), None, None).await;
    assert_eq!(status, 200);
    assert_eq!(items, json!([]));

    let item_id = create_item(addr, &token, &list_id, "Laundry").await;
    let (status, items) = send(
        addr,
        "GET",
        &format!("/api/lists/{list_id}/items"),
        Some(token.as_str()),
        None,
    )
    .await;
    assert_eq!(status, 200);
    let items = items.as_array().expect("items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["__type__"], "Item");
    assert_eq!(items[0]["id"], item_id.as_str());
    assert_eq!(items[0]["list_id"], list_id.as_str());
    assert_eq!(items[0]["checked"], false);
    assert_eq!(items[0]["votes"], json!({ "count": 0, "user_voted": false }));
}

#[tokio::test]
async fn collection_endpoints_return_count_and_items() {
    let addr = spawn_server().await;
    let (user, token) = login(addr).await;
    let list_id = create_list(addr, &token, "poll").await;
    let item_id = create_item(addr, &token, &list_id, "A").await;
    let votes_uri = format!("/api/lists/{list_id}/items/{item_id}/votes");
    send(addr, "POST", &votes_uri, Some(token.as_str()), None).await;

    let (status, voters) = send(addr, "GET", &votes_uri, None, None).await;
    assert_eq!(status, 200);
    assert_eq!(voters["count"], 1);
    assert_eq!(voters["items"][0]["__type__"], "User");
    assert_eq!(voters["items"][0]["id"], user.as_str());

    let (status, activity) = send(
        addr,
        "GET",
        &format!("/api/lists/{list_id}/activity"),
        None,
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(activity["count"], 3);
    let kinds: Vec<&str> = activity["items"]
        .as_array()
        .expect("events")
        .iter()
        .map(|event| event["type"].as_str().expect("type"))
        .collect();
    assert_eq!(kinds, ["create-list", "list-create-item", "item-vote"]);

    let (status, lists) = send(
        addr,
        "GET",
        &format!("/api/users/{user}/lists"),
        Some(token.as_str()),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(lists["count"], 1);
    assert_eq!(lists["items"][0]["__type__"], "List");
    assert!(lists["items"][0].get("items").is_none());
}

#[tokio::test]
async fn ids_of_other_kinds_are_not_found() {
    let addr = spawn_server().await;
    let (user, token) = login(addr).await;
    let list_id = create_list(addr, &token, "todo").await;
    let item_id = create_item(addr, &token, &list_id, "A").await;

    for id in [user.as_str(), item_id.as_str(), "lists", "users"] {
        let (status, body) = send(addr, "GET", &format!("/api/lists/{id}"), None, None).await;
        assert_eq!(status, 404, "{id}: {body}");
        assert_eq!(body["__type__"], "NotFoundError");

        let (status, _) = send(addr, "GET", &format!("/api/lists/{id}/items"), None, None).await;
        assert_eq!(status, 404, "{id}");
    }

    for id in [list_id.as_str(), item_id.as_str(), "users"] {
        let (status, body) = send(addr, "GET", &format!("/api/users/{id}"), None, None).await;
        assert_eq!(status, 404, "{id}: {body}");
        assert_eq!(body["__type__"], "NotFoundError");
    }

    let (status, _) = send(
        addr,
        "GET",
        &format!("/api/lists/{list_id}/items/{user}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, 404);
}
