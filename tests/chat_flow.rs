//! End-to-end flows against stub external services.
//!
//! The real router runs unmodified; the identity, GraphQL and completion
//! APIs are replaced by a stub server bound on an ephemeral port, so every
//! test exercises the same request sequencing the browser would.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use axum_test::TestServer;
use serde_json::{Value, json};
use uuid::Uuid;

use chatapp::AppState;
use chatapp::config::{
    AppConfig, AssistantSettings, BackendConfig, ServerConfig, SessionConfig,
};
use chatapp::server::router;

const USER_ID: &str = "6f2b5a1e-0a57-4a9f-9c53-6a5cf7f2b001";
const STAMP: &str = "2024-05-01T12:00:00Z";

// ─────────────────────────────────────────────────────────────────────────────
// Stub external services
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Stub {
    /// Chats as the hosted database would hold them, messages inline.
    chats: Arc<Mutex<Vec<Value>>>,
    /// When set, every GraphQL document fails.
    fail_graphql: Arc<AtomicBool>,
}

impl Stub {
    fn chat_count(&self) -> usize {
        self.chats.lock().unwrap().len()
    }

    fn messages_of(&self, chat_id: &str) -> Vec<Value> {
        self.chats
            .lock()
            .unwrap()
            .iter()
            .find(|c| c["id"] == chat_id)
            .and_then(|c| c["messages"].as_array().cloned())
            .unwrap_or_default()
    }
}

async fn stub_sign_in(Json(body): Json<Value>) -> Response {
    if body["email"] == "user@example.com" && body["password"] == "secret" {
        Json(json!({
            "session": {
                "accessToken": "stub-access-token",
                "refreshToken": "stub-refresh-token",
                "user": {
                    "id": USER_ID,
                    "email": "user@example.com",
                    "displayName": "Stub User"
                }
            }
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "status": 401,
                "error": "invalid-email-password",
                "message": "Incorrect email or password"
            })),
        )
            .into_response()
    }
}

async fn stub_sign_up(Json(_body): Json<Value>) -> Json<Value> {
    // Verification-pending flavor: account created, no session issued.
    Json(json!({ "session": null }))
}

async fn stub_completions(Json(body): Json<Value>) -> Json<Value> {
    let user_msg = body["messages"][1]["content"].as_str().unwrap_or_default();
    Json(json!({
        "choices": [{
            "message": { "role": "assistant", "content": format!("Echo: {user_msg}") }
        }]
    }))
}

async fn stub_graphql(State(stub): State<Stub>, Json(body): Json<Value>) -> Json<Value> {
    if stub.fail_graphql.load(Ordering::SeqCst) {
        return Json(json!({ "errors": [{ "message": "database unavailable" }] }));
    }

    let query = body["query"].as_str().unwrap_or_default().to_string();
    let vars = body["variables"].clone();
    let mut chats = stub.chats.lock().unwrap();

    if query.contains("query GetUserChats") {
        Json(json!({ "data": { "chatapp_chats": *chats } }))
    } else if query.contains("mutation CreateChat") {
        let chat = json!({
            "id": Uuid::new_v4().to_string(),
            "title": vars["title"],
            "created_at": STAMP,
            "messages": []
        });
        chats.push(chat.clone());
        Json(json!({
            "data": {
                "insert_chatapp_chats_one": {
                    "id": chat["id"],
                    "title": chat["title"],
                    "created_at": chat["created_at"]
                }
            }
        }))
    } else if query.contains("mutation UpdateChat") {
        let mut updated = None;
        for chat in chats.iter_mut() {
            if chat["id"] == vars["chat_id"] {
                chat["title"] = vars["title"].clone();
                updated = Some(json!({
                    "id": chat["id"],
                    "title": chat["title"],
                    "created_at": chat["created_at"]
                }));
            }
        }
        Json(json!({ "data": { "update_chatapp_chats_by_pk": updated } }))
    } else if query.contains("mutation DeleteChat") {
        let removed_messages = chats
            .iter()
            .find(|c| c["id"] == vars["chat_id"])
            .and_then(|c| c["messages"].as_array().map(Vec::len))
            .unwrap_or(0);
        let existed = chats.iter().any(|c| c["id"] == vars["chat_id"]);
        chats.retain(|c| c["id"] != vars["chat_id"]);
        Json(json!({
            "data": {
                "delete_chatapp_messages": { "affected_rows": removed_messages },
                "delete_chatapp_chats_by_pk": if existed {
                    json!({ "id": vars["chat_id"] })
                } else {
                    Value::Null
                }
            }
        }))
    } else if query.contains("mutation SendMessage") {
        let msg = json!({
            "id": Uuid::new_v4().to_string(),
            "chat_id": vars["chat_id"],
            "user_id": vars["user_id"],
            "content": vars["content"],
            "created_at": STAMP
        });
        if let Some(chat) = chats.iter_mut().find(|c| c["id"] == vars["chat_id"]) {
            chat["messages"].as_array_mut().unwrap().push(msg.clone());
        }
        Json(json!({ "data": { "insert_chatapp_messages_one": msg } }))
    } else {
        Json(json!({ "errors": [{ "message": "unknown operation" }] }))
    }
}

async fn spawn_stub(stub: Stub) -> SocketAddr {
    let app = Router::new()
        .route("/auth/signin/email-password", post(stub_sign_in))
        .route("/auth/signup/email-password", post(stub_sign_up))
        // Sign-out always fails remotely; the local session must still die.
        .route(
            "/auth/signout",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route("/v1/graphql", post(stub_graphql))
        .route("/v1/chat/completions", post(stub_completions))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

// ─────────────────────────────────────────────────────────────────────────────
// App under test
// ─────────────────────────────────────────────────────────────────────────────

async fn test_app(stub: Stub, api_key: Option<&str>) -> TestServer {
    let addr = spawn_stub(stub).await;

    let config = Arc::new(AppConfig {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
        },
        backend: BackendConfig {
            auth_url: format!("http://{addr}/auth"),
            graphql_url: format!("http://{addr}/v1/graphql"),
        },
        session: SessionConfig {
            timeout_minutes: 30,
        },
    });
    let assistant = AssistantSettings {
        base_url: format!("http://{addr}"),
        api_key: api_key.map(ToString::to_string),
        model: "test-model".to_string(),
        referer: "http://localhost:3000".to_string(),
    };

    let state = AppState::new(config, assistant);
    TestServer::builder()
        .save_cookies()
        .build(router(state))
        .unwrap()
}

async fn sign_in(server: &TestServer) {
    let res = server
        .post("/login")
        .form(&json!({ "email": "user@example.com", "password": "secret" }))
        .await;
    res.assert_status(StatusCode::SEE_OTHER);
}

/// Create a chat through the UI and return its id from the redirect.
async fn create_chat(server: &TestServer, title: &str) -> String {
    let res = server.post("/chats").form(&json!({ "title": title })).await;
    res.assert_status(StatusCode::SEE_OTHER);
    let location = res.header("location").to_str().unwrap().to_string();
    location
        .split_once("chat=")
        .map(|(_, id)| id.to_string())
        .expect("create redirect selects the new chat")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn anonymous_chats_access_redirects_to_sign_in() {
    let server = test_app(Stub::default(), Some("key")).await;

    let res = server.get("/chats").await;
    res.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(res.header("location").to_str().unwrap(), "/");
}

#[tokio::test(flavor = "multi_thread")]
async fn sign_in_failure_surfaces_service_message() {
    let server = test_app(Stub::default(), Some("key")).await;

    let res = server
        .post("/login")
        .form(&json!({ "email": "user@example.com", "password": "wrong" }))
        .await;
    res.assert_status_ok();
    let page = res.text();
    assert!(page.contains("Incorrect email or password"));
    // the typed email survives the re-render
    assert!(page.contains(r#"value="user@example.com""#));
}

#[tokio::test(flavor = "multi_thread")]
async fn sign_in_reaches_empty_chat_screen() {
    let server = test_app(Stub::default(), Some("key")).await;
    sign_in(&server).await;

    let res = server.get("/chats").await;
    res.assert_status_ok();
    let page = res.text();
    assert!(page.contains("Your Chats"));
    assert!(page.contains("No chats yet. Create your first chat!"));
    assert!(page.contains("Welcome to your chats!"));
}

#[tokio::test(flavor = "multi_thread")]
async fn sign_up_routes_back_to_sign_in() {
    let server = test_app(Stub::default(), Some("key")).await;

    let res = server
        .post("/signup")
        .form(&json!({ "email": "new@example.com", "password": "hunter22" }))
        .await;
    res.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(res.header("location").to_str().unwrap(), "/");
}

#[tokio::test(flavor = "multi_thread")]
async fn creating_a_chat_selects_it() {
    let stub = Stub::default();
    let server = test_app(stub.clone(), Some("key")).await;
    sign_in(&server).await;

    let chat_id = create_chat(&server, "Rust questions").await;
    assert_eq!(stub.chat_count(), 1);

    let res = server.get(&format!("/chats?chat={chat_id}")).await;
    res.assert_status_ok();
    let page = res.text();
    assert!(page.contains("Rust questions"));
    assert!(page.contains("chat-item active"));
    assert!(page.contains("No messages in this chat yet"));
}

#[tokio::test(flavor = "multi_thread")]
async fn blank_title_is_a_noop() {
    let stub = Stub::default();
    let server = test_app(stub.clone(), Some("key")).await;
    sign_in(&server).await;

    let res = server.post("/chats").form(&json!({ "title": "   " })).await;
    res.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(res.header("location").to_str().unwrap(), "/chats");
    assert_eq!(stub.chat_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn send_sequence_persists_user_message_then_bot_reply() {
    let stub = Stub::default();
    let server = test_app(stub.clone(), Some("key")).await;
    sign_in(&server).await;
    let chat_id = create_chat(&server, "Echo chamber").await;

    let res = server
        .post(&format!("/chats/{chat_id}/messages"))
        .form(&json!({ "message": "Hello bot" }))
        .await;
    res.assert_status_ok();

    // The persisted rows, in order: user message first, bot reply second,
    // both attributed to the signed-in user's id.
    let messages = stub.messages_of(&chat_id);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "Hello bot");
    assert_eq!(messages[1]["content"], "Echo: Hello bot");
    assert_eq!(messages[0]["user_id"], USER_ID);
    assert_eq!(messages[1]["user_id"], USER_ID);

    // The returned fragment is the re-synchronized region.
    let fragment = res.text();
    assert!(fragment.contains("Hello bot"));
    assert!(fragment.contains("Echo: Hello bot"));
}

#[tokio::test(flavor = "multi_thread")]
async fn blank_message_is_a_noop() {
    let stub = Stub::default();
    let server = test_app(stub.clone(), Some("key")).await;
    sign_in(&server).await;
    let chat_id = create_chat(&server, "Quiet room").await;

    let res = server
        .post(&format!("/chats/{chat_id}/messages"))
        .form(&json!({ "message": "   " }))
        .await;
    res.assert_status(StatusCode::NO_CONTENT);
    assert!(stub.messages_of(&chat_id).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_api_key_degrades_to_canned_reply() {
    let stub = Stub::default();
    let server = test_app(stub.clone(), None).await;
    sign_in(&server).await;
    let chat_id = create_chat(&server, "No key").await;

    let res = server
        .post(&format!("/chats/{chat_id}/messages"))
        .form(&json!({ "message": "anyone there?" }))
        .await;
    res.assert_status_ok();

    // The apology still flows through the normal persistence path.
    let messages = stub.messages_of(&chat_id);
    assert_eq!(messages.len(), 2);
    assert_eq!(
        messages[1]["content"],
        "Sorry, the assistant API key is not configured."
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_fetch_offers_manual_retry() {
    let stub = Stub::default();
    let server = test_app(stub.clone(), Some("key")).await;
    sign_in(&server).await;

    stub.fail_graphql.store(true, Ordering::SeqCst);
    let res = server.get("/chats").await;
    res.assert_status_ok();
    let page = res.text();
    assert!(page.contains("Error loading chats"));
    assert!(page.contains("database unavailable"));
    assert!(page.contains("Retry"));

    // The affordance is manual: clearing the fault and retrying recovers.
    stub.fail_graphql.store(false, Ordering::SeqCst);
    let res = server.get("/chats").await;
    res.assert_status_ok();
    assert!(res.text().contains("Your Chats"));
}

#[tokio::test(flavor = "multi_thread")]
async fn rename_updates_the_sidebar() {
    let stub = Stub::default();
    let server = test_app(stub.clone(), Some("key")).await;
    sign_in(&server).await;
    let chat_id = create_chat(&server, "Old name").await;

    let res = server
        .post(&format!("/chats/{chat_id}/rename"))
        .form(&json!({ "title": "New name" }))
        .await;
    res.assert_status(StatusCode::SEE_OTHER);

    let page = server.get(&format!("/chats?chat={chat_id}")).await.text();
    assert!(page.contains("New name"));
    assert!(!page.contains("Old name"));
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_removes_chat_and_messages() {
    let stub = Stub::default();
    let server = test_app(stub.clone(), Some("key")).await;
    sign_in(&server).await;
    let chat_id = create_chat(&server, "Doomed").await;
    server
        .post(&format!("/chats/{chat_id}/messages"))
        .form(&json!({ "message": "last words" }))
        .await;

    let res = server.post(&format!("/chats/{chat_id}/delete")).await;
    res.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(res.header("location").to_str().unwrap(), "/chats");
    assert_eq!(stub.chat_count(), 0);

    let page = server.get("/chats").await.text();
    assert!(page.contains("No chats yet"));
}

#[tokio::test(flavor = "multi_thread")]
async fn logout_invalidates_the_session() {
    let server = test_app(Stub::default(), Some("key")).await;
    sign_in(&server).await;
    server.get("/chats").await.assert_status_ok();

    let res = server.post("/logout").await;
    res.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(res.header("location").to_str().unwrap(), "/");

    let res = server.get("/chats").await;
    res.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(res.header("location").to_str().unwrap(), "/");
}
