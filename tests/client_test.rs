// Integration tests for SosClient against an in-process websocket server.
//
// The server replays a scripted list of frames per connection, so each test
// controls exactly what the client sees on every (re)connect.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use sos_client::{ConnectionState, SosClient};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

const RETRY_SECONDS: f64 = 0.05;

// ── Test server ───────────────────────────────────────────────────────────────

#[derive(Clone)]
struct Feed {
    /// Frames to send on the Nth connection
    sessions: Arc<Vec<Vec<String>>>,
    /// Close each connection after its frames are sent
    close_after_send: bool,
    connections: Arc<AtomicUsize>,
}

async fn feed_handler(ws: WebSocketUpgrade, State(feed): State<Feed>) -> Response {
    ws.on_upgrade(move |socket| serve_feed(socket, feed))
}

async fn serve_feed(mut socket: WebSocket, feed: Feed) {
    let index = feed.connections.fetch_add(1, Ordering::SeqCst);
    let frames = feed.sessions.get(index).cloned().unwrap_or_default();

    for frame in frames {
        if socket.send(Message::Text(frame)).await.is_err() {
            return;
        }
    }

    if feed.close_after_send {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    // Hold the connection open until the client leaves
    while let Some(Ok(_)) = socket.recv().await {}
}

async fn spawn_feed(sessions: Vec<Vec<String>>, close_after_send: bool) -> (String, Arc<AtomicUsize>) {
    let connections = Arc::new(AtomicUsize::new(0));
    let feed = Feed {
        sessions: Arc::new(sessions),
        close_after_send,
        connections: connections.clone(),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/", get(feed_handler)).with_state(feed);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("ws://{}/", addr), connections)
}

fn frame(data: Value, event: &str) -> String {
    json!({"data": data, "event": event}).to_string()
}

fn forward_to(tx: mpsc::UnboundedSender<Value>) -> impl Fn(&Value) + Send + Sync + 'static {
    move |data: &Value| {
        let _ = tx.send(data.clone());
    }
}

async fn next_value<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for callback")
        .expect("callback channel closed")
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_state_reaches_subscriber() {
    let (uri, _) = spawn_feed(
        vec![vec![
            frame(json!({"score": 3}), "game:update_state"),
            frame(json!("done"), "game:update_state"),
        ]],
        false,
    )
    .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut client = SosClient::new();
    client.subscribe("game", "update_state", forward_to(tx)).unwrap();
    client.init(&uri, RETRY_SECONDS).unwrap();

    assert_eq!(next_value(&mut rx).await, json!({"score": 3}));
    assert_eq!(next_value(&mut rx).await, json!("done"));

    client.shutdown().await;
}

#[tokio::test]
async fn test_malformed_frames_are_dropped_and_connection_survives() {
    let (uri, connections) = spawn_feed(
        vec![vec![
            "this is not json".to_string(),
            json!([1, 2, 3]).to_string(),
            json!({"event": "game:update_state"}).to_string(),
            frame(json!(1), "noColonHere"),
            frame(json!(2), "sos:version"),
            frame(json!("after"), "game:update_state"),
        ]],
        false,
    )
    .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut client = SosClient::new();
    client.subscribe("game", "update_state", forward_to(tx)).unwrap();
    client.init(&uri, RETRY_SECONDS).unwrap();

    // Frames arrive in order, so the first delivery proves the earlier ones were dropped
    assert_eq!(next_value(&mut rx).await, json!("after"));
    assert_eq!(connections.load(Ordering::SeqCst), 1);
    assert_eq!(client.state(), ConnectionState::Open);

    client.shutdown().await;
}

#[tokio::test]
async fn test_callbacks_run_in_registration_order() {
    let (uri, _) = spawn_feed(vec![vec![frame(json!({"ball": 1}), "game:update_state")]], false).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut client = SosClient::new();
    for name in ["first", "second", "third"] {
        let tx = tx.clone();
        client
            .subscribe("game", "update_state", move |data: &Value| {
                let _ = tx.send((name, data.clone()));
            })
            .unwrap();
    }
    client.init(&uri, RETRY_SECONDS).unwrap();

    for expected in ["first", "second", "third"] {
        let (name, data) = next_value(&mut rx).await;
        assert_eq!(name, expected);
        assert_eq!(data, json!({"ball": 1}));
    }

    client.shutdown().await;
}

// ── Connection lifecycle ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let (uri, connections) = spawn_feed(
        vec![
            vec![frame(json!(1), "game:update_state")],
            vec![frame(json!(2), "game:update_state")],
        ],
        true,
    )
    .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut client = SosClient::new();
    client.subscribe("game", "update_state", forward_to(tx)).unwrap();
    client.init(&uri, RETRY_SECONDS).unwrap();

    assert_eq!(next_value(&mut rx).await, json!(1));
    assert_eq!(next_value(&mut rx).await, json!(2));
    assert!(connections.load(Ordering::SeqCst) >= 2);

    client.shutdown().await;
}

#[tokio::test]
async fn test_state_open_then_closed_after_shutdown() {
    let (uri, _) = spawn_feed(vec![vec![]], false).await;

    let mut client = SosClient::new();
    let mut states = client.state_changes();
    client.init(&uri, RETRY_SECONDS).unwrap();

    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|state| *state == ConnectionState::Open),
    )
    .await
    .expect("connection did not open in time")
    .unwrap();

    client.shutdown().await;
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_subscribe_after_init_is_honoured() {
    // First connection closes at once; the frame arrives on the reconnect
    let (uri, connections) = spawn_feed(
        vec![vec![], vec![frame(json!("late"), "game:goal_scored")]],
        true,
    )
    .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut client = SosClient::new();
    let mut states = client.state_changes();
    client.init(&uri, 0.5).unwrap();

    // Closed/Error persist for the whole retry interval, so they are always observed
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|state| matches!(state, ConnectionState::Closed | ConnectionState::Error)),
    )
    .await
    .expect("first connection did not end in time")
    .unwrap();
    assert_eq!(connections.load(Ordering::SeqCst), 1);

    client.subscribe("game", "goal_scored", forward_to(tx)).unwrap();

    assert_eq!(next_value(&mut rx).await, json!("late"));
    assert_eq!(connections.load(Ordering::SeqCst), 2);

    client.shutdown().await;
}
