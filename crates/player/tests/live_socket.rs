//! End-to-end run of the live channel against a local WebSocket server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use wordrush_player::application::GameEvents;
use wordrush_player::{
    ConnectionManager, ConnectionState, PlayerIdentity, ReconnectPolicy, StepOutcome, WsConnector,
};
use wordrush_shared::ClientEvent;

/// Accepts one client, forwards every text frame it sends to `received` and
/// writes every frame from `outbound` to it.
async fn serve_one(
    listener: TcpListener,
    received: mpsc::UnboundedSender<Value>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
) {
    let (stream, _) = listener.accept().await.unwrap();
    let socket = tokio_tungstenite::accept_async(stream).await.unwrap();
    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let _ = received.send(serde_json::from_str(&text).unwrap());
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
            frame = outbound.recv() => match frame {
                Some(frame) => write.send(frame).await.unwrap(),
                None => break,
            },
        }
    }
}

async fn next_json(received: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    tokio::time::timeout(Duration::from_secs(5), received.recv())
        .await
        .expect("server received nothing")
        .expect("server stopped")
}

#[tokio::test]
async fn test_round_trip_over_real_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("ws://{}", listener.local_addr().unwrap());
    let (received_tx, mut received) = mpsc::unbounded_channel();
    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let server = tokio::spawn(serve_one(listener, received_tx, outbound_rx));

    let mut manager = ConnectionManager::new(Arc::new(WsConnector::new()), ReconnectPolicy::default());
    let timers = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&timers);
    manager.on_timer(move |timer| {
        sink.lock().unwrap().push(timer.seconds_left);
        Ok(())
    });

    let identity = PlayerIdentity::new("alice").unwrap();
    assert_eq!(
        manager.open(address.as_str(), Some(identity)).await,
        ConnectionState::Connected
    );

    let join = next_json(&mut received).await;
    assert_eq!(join["type"], "playerJoin");
    assert_eq!(join["user"], "alice");
    assert!(join["timestamp"].is_i64());

    outbound
        .send(Message::Text(
            json!({"type": "timer", "timeRemaining": 42, "timestamp": 1}).to_string(),
        ))
        .unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(5), manager.step())
        .await
        .unwrap();
    assert_eq!(outcome, StepOutcome::Dispatched { handlers: 1 });

    // Binary frames carrying UTF-8 JSON are routed like text frames.
    outbound
        .send(Message::Binary(
            json!({"type": "timer", "secondsLeft": 41}).to_string().into_bytes(),
        ))
        .unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(5), manager.step())
        .await
        .unwrap();
    assert_eq!(outcome, StepOutcome::Dispatched { handlers: 1 });
    assert_eq!(*timers.lock().unwrap(), vec![42, 41]);

    assert!(manager.emit(ClientEvent::guess("apple", "alice")).await);
    let guess = next_json(&mut received).await;
    assert_eq!(guess["type"], "guess");
    assert_eq!(guess["guess"], "apple");
    assert_eq!(guess["user"], "alice");

    manager.close().await;
    assert_eq!(manager.connection_state(), ConnectionState::Disconnected);
    assert!(!manager.emit(ClientEvent::Ping).await);

    drop(outbound);
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_refused_connection_schedules_retry() {
    // Bind and drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let mut manager = ConnectionManager::new(Arc::new(WsConnector::new()), ReconnectPolicy::default());

    assert_eq!(
        manager.open(address, None).await,
        ConnectionState::Disconnected
    );
    assert_eq!(manager.reconnect_attempts(), 1);
    assert!(!manager.is_idle());

    manager.close().await;
    assert!(manager.is_idle());
}
