use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use whisperline::{app, auth::TokenKeys, chat::Registry, db, AppState};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_app() -> String {
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::init(&db_pool).await.unwrap();

    let state = AppState {
        db_pool,
        registry: Registry::new(),
        keys: TokenKeys::from_secret("integration-secret"),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });

    addr.to_string()
}

async fn signup(client: &reqwest::Client, addr: &str, username: &str) -> (String, String) {
    let res = client
        .post(format!("http://{addr}/api/auth/signup"))
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "correct horse battery staple",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);

    let body: Value = res.json().await.unwrap();
    (
        body["id"].as_str().unwrap().to_owned(),
        body["token"].as_str().unwrap().to_owned(),
    )
}

async fn connect(addr: &str, token: &str) -> Ws {
    let (ws, _) = connect_async(format!("ws://{addr}/ws?token={token}"))
        .await
        .unwrap();
    ws
}

/// Next text frame as JSON, skipping everything else.
async fn next_json(ws: &mut Ws) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed early")
            .expect("socket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn send_json(ws: &mut Ws, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

/// The upgrade response races the server-side registration, so tests that
/// depend on "x was already registered" wait for the directory to agree.
async fn wait_until_online(client: &reqwest::Client, addr: &str, token: &str, username: &str) {
    for _ in 0..100 {
        let users: Value = client
            .get(format!("http://{addr}/api/users"))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let online = users["users"]
            .as_array()
            .unwrap()
            .iter()
            .any(|user| user["username"] == username && user["is_online"] == true);
        if online {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("{username} never came online");
}

#[tokio::test]
async fn chat_flow_end_to_end() {
    let addr = spawn_app().await;
    let client = reqwest::Client::new();

    let (a_id, a_token) = signup(&client, &addr, "alice").await;
    let (b_id, b_token) = signup(&client, &addr, "bob").await;

    let mut a_ws = connect(&addr, &a_token).await;
    wait_until_online(&client, &addr, &b_token, "alice").await;
    let mut b_ws = connect(&addr, &b_token).await;

    // alice was already connected, so bob coming online is her first event
    let event = next_json(&mut a_ws).await;
    assert_eq!(event["type"], "presence_changed");
    assert_eq!(event["user_id"], b_id.as_str());
    assert_eq!(event["username"], "bob");
    assert_eq!(event["online"], true);

    // the directory agrees
    let users: Value = client
        .get(format!("http://{addr}/api/users"))
        .bearer_auth(&a_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(users["users"][0]["username"], "bob");
    assert_eq!(users["users"][0]["is_online"], true);

    // alice -> bob lands on bob's socket
    send_json(&mut a_ws, json!({ "type": "send_message", "receiver_id": b_id, "content": "hi" })).await;
    let event = next_json(&mut b_ws).await;
    assert_eq!(event["type"], "message_delivered");
    assert_eq!(event["message"]["sender_id"], a_id.as_str());
    assert_eq!(event["message"]["receiver_id"], b_id.as_str());
    assert_eq!(event["message"]["content"], "hi");

    // and was durable before bob ever asked for it
    let history: Value = client
        .get(format!("http://{addr}/api/messages/{a_id}"))
        .bearer_auth(&b_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["messages"].as_array().unwrap().len(), 1);
    assert_eq!(history["messages"][0]["content"], "hi");

    // whitespace-only content bounces back to the sender and stores nothing
    send_json(&mut a_ws, json!({ "type": "send_message", "receiver_id": b_id, "content": "   " })).await;
    let event = next_json(&mut a_ws).await;
    assert_eq!(event["type"], "send_failed");

    let history: Value = client
        .get(format!("http://{addr}/api/messages/{b_id}"))
        .bearer_auth(&a_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["messages"].as_array().unwrap().len(), 1);

    // alice leaving reaches bob as an offline notice
    a_ws.close(None).await.unwrap();
    let event = next_json(&mut b_ws).await;
    assert_eq!(event["type"], "presence_changed");
    assert_eq!(event["user_id"], a_id.as_str());
    assert_eq!(event["online"], false);
}

#[tokio::test]
async fn handshake_without_a_valid_token_is_refused() {
    let addr = spawn_app().await;

    assert!(connect_async(format!("ws://{addr}/ws")).await.is_err());
    assert!(connect_async(format!("ws://{addr}/ws?token=bogus")).await.is_err());
}

#[tokio::test]
async fn a_stale_close_does_not_take_the_new_session_offline() {
    let addr = spawn_app().await;
    let client = reqwest::Client::new();

    let (_a_id, a_token) = signup(&client, &addr, "alice").await;
    let (b_id, b_token) = signup(&client, &addr, "bob").await;

    let mut b_ws = connect(&addr, &b_token).await;
    wait_until_online(&client, &addr, &a_token, "bob").await;

    // bob watches alice connect twice; the second session replaces the first
    let mut first = connect(&addr, &a_token).await;
    assert_eq!(next_json(&mut b_ws).await["online"], true);
    let mut second = connect(&addr, &a_token).await;
    assert_eq!(next_json(&mut b_ws).await["online"], true);

    // the superseded socket closing must not deregister the live session
    first.close(None).await.unwrap();

    send_json(&mut second, json!({ "type": "send_message", "receiver_id": b_id, "content": "still here" })).await;
    let event = next_json(&mut b_ws).await;
    assert_eq!(event["type"], "message_delivered");
    assert_eq!(event["message"]["content"], "still here");
}
