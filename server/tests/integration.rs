//! Integration tests for the disaster server.
//!
//! These tests start a real server instance and connect via WebSocket
//! to verify end-to-end behavior.

use std::sync::Arc;
use std::time::Duration;

use disaster_server::config::ServerConfig;
use disaster_server::http::router;
use disaster_server::seed::ImpactPoint;
use disaster_server::session::Session;
use disaster_server::world::WorldState;
use disaster_server::ws::AppState;
use disaster_shared::protocol::{ClientMsg, PersonDeltaWire, ServerMsg, ShapeWire};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::Message};

type Ws =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

struct TestServer {
    url: String,
    world: Arc<WorldState>,
}

/// Start a test server on a random available port.
async fn start_test_server(session_length_secs: u32) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = ServerConfig {
        listen_addr: addr.to_string(),
        session_length_secs,
        impact_points: vec![ImpactPoint::new(100.0, 100.0, 2)],
        ..Default::default()
    };

    let session = Session::new(&config);
    // Detached: the broadcasts live as long as the test runtime.
    let _broadcasts = session.spawn_broadcasts();

    let app = router(AppState {
        world: session.world.clone(),
        gateway: session.gateway.clone(),
        broadcast_tx: session.broadcast_tx.clone(),
        max_message_bytes: config.max_message_bytes,
    });

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        url: format!("ws://{}/ws", addr),
        world: session.world.clone(),
    }
}

async fn connect(url: &str) -> Ws {
    let (ws, _) = connect_async(url).await.expect("Failed to connect");
    ws
}

async fn send(ws: &mut Ws, msg: &ClientMsg) {
    let json = serde_json::to_string(msg).unwrap();
    ws.send(Message::Text(json.into())).await.unwrap();
}

/// Collect every server message that arrives within `window`.
async fn collect_for(ws: &mut Ws, window: Duration) -> Vec<ServerMsg> {
    let mut out = Vec::new();
    let deadline = tokio::time::Instant::now() + window;
    loop {
        match tokio::time::timeout_at(deadline, ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                out.push(serde_json::from_str(&text).expect("Failed to parse server message"));
            }
            Ok(Some(Ok(_))) => continue,
            Ok(Some(Err(_))) | Ok(None) | Err(_) => return out,
        }
    }
}

/// Wait for the first message matching `pred`, skipping everything else.
async fn recv_matching(
    ws: &mut Ws,
    timeout: Duration,
    pred: impl Fn(&ServerMsg) -> bool,
) -> Option<ServerMsg> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match tokio::time::timeout_at(deadline, ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                let msg: ServerMsg = serde_json::from_str(&text).unwrap();
                if pred(&msg) {
                    return Some(msg);
                }
            }
            Ok(Some(Ok(_))) => continue,
            _ => return None,
        }
    }
}

/// Drain until the server closes the socket or two seconds pass.
async fn is_disconnected(ws: &mut Ws) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        match tokio::time::timeout_at(deadline, ws.next()).await {
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Ok(Some(Err(_))) => return true,
            Ok(Some(Ok(_))) => continue,
            Err(_) => return false,
        }
    }
}

fn shape(id: &str, left: f64) -> ClientMsg {
    ClientMsg::UpdateShape(ShapeWire {
        id: id.to_string(),
        left,
        top: 20.0,
        full: false,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_shape_update_reaches_peers_but_not_sender() {
    let server = start_test_server(60).await;
    let mut ws1 = connect(&server.url).await;
    let mut ws2 = connect(&server.url).await;
    // Let both subscriptions register before the update.
    tokio::time::sleep(Duration::from_millis(50)).await;

    send(&mut ws1, &shape("box-1", 33.0)).await;

    let got = recv_matching(&mut ws2, Duration::from_secs(2), |m| {
        matches!(m, ServerMsg::ShapeChanged(_))
    })
    .await;
    match got {
        Some(ServerMsg::ShapeChanged(s)) => {
            assert_eq!(s.id, "box-1");
            assert!((s.left - 33.0).abs() < 1e-9);
        }
        other => panic!("Expected ShapeChanged, got {:?}", other),
    }

    let echoed = collect_for(&mut ws1, Duration::from_millis(300)).await;
    assert!(
        !echoed
            .iter()
            .any(|m| matches!(m, ServerMsg::ShapeChanged(_))),
        "Sender should not receive its own shape"
    );
    assert_eq!(server.world.snapshot_shapes().len(), 1);
}

#[tokio::test]
async fn test_person_visibility_end_to_end() {
    let server = start_test_server(60).await;
    let people = server.world.snapshot_people();
    assert_eq!(people.len(), 2);
    assert_eq!((people[0].x, people[0].y), (100.0, 100.0));
    assert_eq!((people[1].x, people[1].y), (92.0, 77.0));

    let mut sender = connect(&server.url).await;
    let mut watcher = connect(&server.url).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    send(
        &mut sender,
        &ClientMsg::UpdatePerson(PersonDeltaWire {
            id: people[0].id.clone(),
            visible: false,
        }),
    )
    .await;

    let seen = collect_for(&mut watcher, Duration::from_millis(400)).await;
    let changes: Vec<_> = seen
        .iter()
        .filter_map(|m| match m {
            ServerMsg::PersonChanged(p) => Some(p),
            _ => None,
        })
        .collect();
    assert_eq!(changes.len(), 1, "Exactly one person_changed expected");
    assert_eq!(changes[0].id, people[0].id);
    assert!(!changes[0].visible);

    let echoed = collect_for(&mut sender, Duration::from_millis(200)).await;
    assert!(!echoed
        .iter()
        .any(|m| matches!(m, ServerMsg::PersonChanged(_))));

    let after = server.world.snapshot_people();
    assert!(!after[0].visible);
    assert!(after[1].visible);
}

#[tokio::test]
async fn test_time_updates_then_single_session_end() {
    let server = start_test_server(1).await;
    let mut ws = connect(&server.url).await;

    let seen = collect_for(&mut ws, Duration::from_millis(2600)).await;
    let end_pos = seen
        .iter()
        .position(|m| matches!(m, ServerMsg::SessionEnded(_)))
        .expect("session_ended should arrive");

    assert!(seen[..end_pos]
        .iter()
        .any(|m| matches!(m, ServerMsg::TimeUpdate(_))));
    assert!(
        !seen[end_pos + 1..]
            .iter()
            .any(|m| matches!(m, ServerMsg::TimeUpdate(_) | ServerMsg::SessionEnded(_))),
        "Nothing time-related after session_ended"
    );
    match &seen[end_pos] {
        ServerMsg::SessionEnded(end) => {
            assert_eq!(end.victim_count, 2);
            assert_eq!(end.survivor_count, 0);
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_disconnected_peer_does_not_stop_broadcasts() {
    let server = start_test_server(60).await;

    let mut gone = connect(&server.url).await;
    gone.close(None).await.unwrap();
    drop(gone);

    let mut sender = connect(&server.url).await;
    let mut watcher = connect(&server.url).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    for i in 0..3 {
        send(&mut sender, &shape("box-2", i as f64)).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
    }

    let got = recv_matching(&mut watcher, Duration::from_secs(2), |m| {
        matches!(m, ServerMsg::ShapeChanged(s) if s.id == "box-2")
    })
    .await;
    assert!(got.is_some());
}

#[tokio::test]
async fn test_parse_spam_disconnects_client() {
    let server = start_test_server(60).await;
    let mut ws = connect(&server.url).await;

    for _ in 0..10 {
        if ws
            .send(Message::Text("not valid json".into()))
            .await
            .is_err()
        {
            return;
        }
    }

    assert!(
        is_disconnected(&mut ws).await,
        "Client should be disconnected after too many parse errors"
    );
}

#[tokio::test]
async fn test_oversized_message_disconnects_client() {
    let server = start_test_server(60).await;
    let mut ws = connect(&server.url).await;

    let huge = format!(
        r#"{{"type":"update_shape","id":"{}","left":1.0,"top":1.0}}"#,
        "x".repeat(2000)
    );
    let _ = ws.send(Message::Text(huge.into())).await;

    assert!(
        is_disconnected(&mut ws).await,
        "Client should be disconnected after oversized message"
    );
    assert!(server.world.snapshot_shapes().is_empty());
}
