use std::sync::Arc;

use operator_repo_db_memory::InMemoryStorage;
use operator_repo_server::{AppConfig, build_app};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

struct TestServer {
    base: String,
    client: reqwest::Client,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(AppConfig::default()).await
    }

    async fn start_with(cfg: AppConfig) -> Self {
        let app = build_app(&cfg, Arc::new(InMemoryStorage::new())).expect("build app");
        let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind");
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await;
        });
        Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn create(&self, user: &str, body: Value) -> Value {
        let resp = self
            .client
            .put(self.url("/operator"))
            .header("X-UserID", user)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        resp.json().await.unwrap()
    }

    async fn list(&self, user: &str, query: &str) -> Value {
        let resp = self
            .client
            .get(self.url(&format!("/operator{query}")))
            .header("X-UserID", user)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        resp.json().await.unwrap()
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

fn names(page: &Value) -> Vec<String> {
    page["operators"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["name"].as_str().unwrap().to_string())
        .collect()
}

fn id_of(op: &Value) -> String {
    op["_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn create_then_read_round_trips_and_overwrites_owner() {
    let server = TestServer::start().await;
    let payload = json!({
        "name": "adder",
        "image": "repo/adder:1.0",
        "description": "adds two values",
        "pub": false,
        "deploymentType": "cloud",
        "inputs": [{"name": "a", "type": "float"}, {"name": "b", "type": "float"}],
        "outputs": [{"name": "sum", "type": "float"}],
        "config_values": [{"name": "precision", "type": "int"}],
        "userId": "mallory"
    });
    let created = server.create("alice", payload.clone()).await;
    assert_eq!(created["userId"], "alice");
    assert_eq!(id_of(&created).len(), 24);

    let resp = server
        .client
        .get(server.url(&format!("/operator/{}", id_of(&created))))
        .header("X-UserID", "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    let read: Value = resp.json().await.unwrap();
    for key in [
        "name",
        "image",
        "description",
        "pub",
        "deploymentType",
        "inputs",
        "outputs",
        "config_values",
    ] {
        assert_eq!(read[key], payload[key], "field {key}");
    }
    assert_eq!(read["userId"], "alice");
    assert_eq!(read, created);

    server.stop().await;
}

#[tokio::test]
async fn missing_identity_header_uses_default_user() {
    let server = TestServer::start().await;
    let resp = server
        .client
        .put(server.url("/operator"))
        .json(&json!({"name": "anon"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["userId"], "test");
    assert!(created["image"].is_null());

    server.stop().await;
}

#[tokio::test]
async fn create_validation_errors() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .put(server.url("/operator"))
        .json(&json!({"image": "no-name"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "unprocessable");

    let resp = server
        .client
        .put(server.url("/operator"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = server
        .client
        .put(server.url("/operator"))
        .json(&json!({"name": "x", "inputs": [{"name": "a"}]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    server.stop().await;
}

#[tokio::test]
async fn private_operators_are_hidden_from_other_users() {
    let server = TestServer::start().await;
    server
        .create("alice", json!({"name": "alice-private", "pub": false}))
        .await;
    server
        .create("alice", json!({"name": "alice-public", "pub": true}))
        .await;
    server.create("alice", json!({"name": "alice-unset"})).await;
    server
        .create("bob", json!({"name": "bob-private", "pub": false}))
        .await;

    let page = server.list("bob", "").await;
    assert_eq!(names(&page), vec!["alice-public", "bob-private"]);
    assert_eq!(page["totalCount"], 2);

    let page = server.list("alice", "").await;
    assert_eq!(
        names(&page),
        vec!["alice-private", "alice-public", "alice-unset"]
    );
    assert_eq!(page["totalCount"], 3);

    server.stop().await;
}

#[tokio::test]
async fn list_search_sort_and_pagination() {
    let server = TestServer::start().await;
    for name in ["echo", "alpha", "delta", "bravo", "charlie", "alpha"] {
        server.create("alice", json!({"name": name})).await;
    }

    let page = server.list("alice", "?sort=name:desc").await;
    assert_eq!(
        names(&page),
        vec!["echo", "delta", "charlie", "bravo", "alpha", "alpha"]
    );

    // Equal names are ordered by id ascending
    let page = server.list("alice", "?search=alpha").await;
    let ids: Vec<String> = page["operators"]
        .as_array()
        .unwrap()
        .iter()
        .map(id_of)
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids[0] < ids[1]);

    let page = server.list("alice", "?offset=1&limit=2").await;
    assert_eq!(names(&page), vec!["alpha", "bravo"]);
    assert_eq!(page["totalCount"], 6);

    let page = server.list("alice", "?limit=0").await;
    assert_eq!(names(&page).len(), 6);

    let page = server.list("alice", "?search=").await;
    assert_eq!(page["totalCount"], 6);

    let page = server.list("alice", "?search=^[bc]&sort=name:asc").await;
    assert_eq!(names(&page), vec!["bravo", "charlie"]);
    assert_eq!(page["totalCount"], 2);

    server.stop().await;
}

#[tokio::test]
async fn list_rejects_bad_parameters() {
    let server = TestServer::start().await;
    for query in ["?sort=name:up", "?limit=abc", "?offset=-1", "?search=("] {
        let resp = server
            .client
            .get(server.url(&format!("/operator{query}")))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "query {query}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], "invalid");
    }

    server.stop().await;
}

#[tokio::test]
async fn read_missing_operator_is_not_found() {
    let server = TestServer::start().await;
    for id in ["000000000000000000000000", "not-an-object-id"] {
        let resp = server
            .client
            .get(server.url(&format!("/operator/{id}")))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], "not-found");
    }

    server.stop().await;
}

#[tokio::test]
async fn read_visibility_follows_configuration() {
    let server = TestServer::start().await;
    let private = server
        .create("alice", json!({"name": "secret", "pub": false}))
        .await;
    let resp = server
        .client
        .get(server.url(&format!("/operator/{}", id_of(&private))))
        .header("X-UserID", "bob")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    server.stop().await;

    let mut cfg = AppConfig::default();
    cfg.registry.enforce_read_visibility = true;
    let server = TestServer::start_with(cfg).await;
    let private = server
        .create("alice", json!({"name": "secret", "pub": false}))
        .await;
    let resp = server
        .client
        .get(server.url(&format!("/operator/{}", id_of(&private))))
        .header("X-UserID", "bob")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    server.stop().await;
}

#[tokio::test]
async fn update_is_owner_only_shallow_merge() {
    let server = TestServer::start().await;
    let created = server
        .create(
            "alice",
            json!({
                "name": "adder",
                "description": "v1",
                "inputs": [{"name": "a", "type": "float"}, {"name": "b", "type": "float"}]
            }),
        )
        .await;
    let url = server.url(&format!("/operator/{}", id_of(&created)));

    let resp = server
        .client
        .post(&url)
        .header("X-UserID", "bob")
        .json(&json!({"description": "hijacked"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let unchanged: Value = server
        .client
        .get(&url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unchanged["description"], "v1");

    let resp = server
        .client
        .post(&url)
        .header("X-UserID", "alice")
        .json(&json!({"description": "v2", "inputs": [{"name": "x", "type": "int"}]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["name"], "adder");
    assert_eq!(updated["description"], "v2");
    assert_eq!(updated["inputs"], json!([{"name": "x", "type": "int"}]));
    assert_eq!(updated["_id"], created["_id"]);
    assert_eq!(updated["userId"], "alice");

    let resp = server
        .client
        .post(server.url("/operator/000000000000000000000000"))
        .header("X-UserID", "alice")
        .json(&json!({"description": "v3"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn update_with_null_clears_fields() {
    let server = TestServer::start().await;
    let created = server
        .create(
            "alice",
            json!({
                "name": "adder",
                "description": "v1",
                "pub": true,
                "outputs": [{"name": "sum", "type": "float"}]
            }),
        )
        .await;
    assert_eq!(server.list("bob", "").await["totalCount"], 1);
    let url = server.url(&format!("/operator/{}", id_of(&created)));

    let resp = server
        .client
        .post(&url)
        .header("X-UserID", "alice")
        .json(&json!({"description": null, "pub": null, "name": null}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert!(updated["description"].is_null());
    assert!(updated["pub"].is_null());
    assert_eq!(updated["name"], "adder");
    assert_eq!(updated["outputs"], json!([{"name": "sum", "type": "float"}]));

    let stored: Value = server
        .client
        .get(&url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(stored["description"].is_null());
    // no longer public
    assert_eq!(server.list("bob", "").await["totalCount"], 0);

    server.stop().await;
}

#[tokio::test]
async fn delete_single_is_owner_only() {
    let server = TestServer::start().await;
    let created = server
        .create("alice", json!({"name": "adder", "pub": true}))
        .await;
    let url = server.url(&format!("/operator/{}", id_of(&created)));

    let resp = server
        .client
        .delete(&url)
        .header("X-UserID", "bob")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = server
        .client
        .delete(&url)
        .header("X-UserID", "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(resp.bytes().await.unwrap().is_empty());

    let resp = server.client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn batch_delete_is_all_or_nothing() {
    let server = TestServer::start().await;
    let a1 = id_of(&server.create("alice", json!({"name": "a1"})).await);
    let a2 = id_of(&server.create("alice", json!({"name": "a2"})).await);
    let a3 = id_of(&server.create("alice", json!({"name": "a3"})).await);
    let b1 = id_of(&server.create("bob", json!({"name": "b1"})).await);

    // One foreign id: nothing is deleted
    let resp = server
        .client
        .delete(server.url("/operator"))
        .header("X-UserID", "alice")
        .json(&json!([a1, a2, b1]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.list("alice", "").await["totalCount"], 3);
    assert_eq!(server.list("bob", "").await["totalCount"], 1);

    // One unknown id: nothing is deleted
    let resp = server
        .client
        .delete(server.url("/operator"))
        .header("X-UserID", "alice")
        .json(&json!([a1, "000000000000000000000000"]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.list("alice", "").await["totalCount"], 3);

    // All owned: exactly those are deleted
    let resp = server
        .client
        .delete(server.url("/operator"))
        .header("X-UserID", "alice")
        .json(&json!([a1, a2]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let page = server.list("alice", "").await;
    assert_eq!(names(&page), vec!["a3"]);
    assert_eq!(id_of(&page["operators"][0]), a3);

    // Body must be an array of strings
    let resp = server
        .client
        .delete(server.url("/operator"))
        .header("X-UserID", "alice")
        .json(&json!({"ids": [a3]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    server.stop().await;
}
