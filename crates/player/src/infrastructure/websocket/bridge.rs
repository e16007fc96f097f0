//! WebSocket Bridge - runs a `ConnectionManager` on its own task.
//!
//! `spawn_connection` moves the manager into a background task and returns:
//! - A cloneable `ConnectionHandle` that queues commands for the task
//! - A `ConnectionStateObserver` for lock-free state reads
//! - The task's `JoinHandle`
//!
//! The task alternates between serving commands and pumping the manager
//! (inbound frames and reconnect deadlines). Commands only interrupt the
//! waiting; a reconnect handshake in progress finishes before the next command. When the last handle is dropped it
//! closes the channel and exits.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::manager::ConnectionManager;
use crate::infrastructure::messaging::{BridgeCommand, ConnectionHandle, ConnectionStateObserver};

const COMMAND_BUFFER: usize = 32;

/// Result of spawning a connection.
pub struct Connection {
    pub handle: ConnectionHandle,
    pub state_observer: ConnectionStateObserver,
    pub task: JoinHandle<()>,
}

/// Move `manager` onto a new tokio task. Must be called inside a runtime.
pub fn spawn_connection(manager: ConnectionManager) -> Connection {
    let (cmd_tx, cmd_rx) = mpsc::channel::<BridgeCommand>(COMMAND_BUFFER);
    let state_observer = manager.observer();
    let handle = ConnectionHandle::new(cmd_tx, state_observer.clone());

    let task = tokio::spawn(bridge_task(manager, cmd_rx));

    Connection {
        handle,
        state_observer,
        task,
    }
}

async fn bridge_task(mut manager: ConnectionManager, mut commands: mpsc::Receiver<BridgeCommand>) {
    loop {
        let pumping = !manager.is_idle();

        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(command) => apply(&mut manager, command).await,
                    None => {
                        tracing::debug!("All connection handles dropped");
                        break;
                    }
                }
            }
            // Only the wait races against commands; acting on the event
            // (dispatch, reconnect handshake) always runs to completion.
            event = manager.next_event(), if pumping => {
                let outcome = manager.handle_event(event).await;
                tracing::trace!(?outcome, "Connection step");
            }
        }
    }

    manager.close().await;
    tracing::info!("Connection bridge stopped");
}

async fn apply(manager: &mut ConnectionManager, command: BridgeCommand) {
    match command {
        BridgeCommand::Open {
            address,
            identity,
            reply,
        } => {
            let state = manager.open(address, identity).await;
            let _ = reply.send(state);
        }
        BridgeCommand::Close { reply } => {
            manager.close().await;
            let _ = reply.send(());
        }
        BridgeCommand::Publish { envelope, reply } => {
            let sent = manager.send(&envelope).await;
            let _ = reply.send(sent);
        }
        BridgeCommand::Subscribe { kind, handler } => manager.subscribe(kind, handler),
        BridgeCommand::Unsubscribe { kind, handler } => {
            manager.unsubscribe(kind, &handler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use wordrush_shared::{ClientEvent, TimerUpdate};

    use crate::identity::PlayerIdentity;
    use crate::infrastructure::messaging::{handler, ConnectionState};
    use crate::infrastructure::testing::InMemoryConnector;
    use crate::infrastructure::websocket::ReconnectPolicy;

    const ADDRESS: &str = "ws://game.test:3000";

    fn spawn(connector: &InMemoryConnector) -> Connection {
        spawn_connection(ConnectionManager::new(
            Arc::new(connector.clone()),
            ReconnectPolicy::default(),
        ))
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_handle_open_publish_close() {
        let connector = InMemoryConnector::new();
        let connection = spawn(&connector);
        let handle = connection.handle.clone();

        let identity = PlayerIdentity::new("alice").unwrap();
        let state = handle.open(ADDRESS, Some(identity)).await.unwrap();
        assert_eq!(state, ConnectionState::Connected);
        assert!(connection.state_observer.is_connected());

        assert!(handle.emit(ClientEvent::guess("apple", "alice")).await.unwrap());
        let sent = connector.sent_json();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1]["type"], "guess");
        assert_eq!(sent[1]["guess"], "apple");

        handle.close().await.unwrap();
        assert_eq!(handle.state(), ConnectionState::Disconnected);
        assert_eq!(connector.close_count(), 1);
    }

    #[tokio::test]
    async fn test_handle_subscription_receives_inbound() {
        let connector = InMemoryConnector::new();
        let connection = spawn(&connector);
        let handle = connection.handle.clone();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let on_timer = handler(move |envelope| {
            let timer: TimerUpdate = envelope.decode()?;
            sink.lock().unwrap().push(timer.seconds_left);
            Ok(())
        });
        handle.subscribe("timer", Arc::clone(&on_timer)).await.unwrap();
        handle.open(ADDRESS, None).await.unwrap();

        connector.push_inbound(r#"{"type":"timer","secondsLeft":42}"#);
        wait_until(|| seen.lock().unwrap().len() == 1).await;
        assert_eq!(*seen.lock().unwrap(), vec![42]);

        handle.unsubscribe("timer", &on_timer).await.unwrap();
        // Commands are served in order, so the reply means the unsubscribe ran.
        handle.emit(ClientEvent::Ping).await.unwrap();
        connector.push_inbound(r#"{"type":"timer","secondsLeft":41}"#);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*seen.lock().unwrap(), vec![42]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_during_slow_reconnect_do_not_restart_handshake() {
        let connector = InMemoryConnector::new();
        connector.set_connect_delay(Duration::from_millis(200));
        let connection = spawn_connection(ConnectionManager::new(
            Arc::new(connector.clone()),
            ReconnectPolicy {
                base_delay_ms: 100,
                ..ReconnectPolicy::default()
            },
        ));
        let handle = connection.handle.clone();
        handle.open(ADDRESS, None).await.unwrap();
        assert_eq!(connector.connect_count(), 1);

        connector.drop_connection();
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(150)).await;
            handle.emit(ClientEvent::Ping).await.unwrap();
        }

        assert_eq!(handle.state(), ConnectionState::Connected);
        assert_eq!(connector.connect_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_ceiling_holds_while_commands_arrive() {
        let connector = InMemoryConnector::new();
        connector.set_connect_delay(Duration::from_millis(200));
        connector.set_refusing(true);
        let connection = spawn_connection(ConnectionManager::new(
            Arc::new(connector.clone()),
            ReconnectPolicy {
                base_delay_ms: 100,
                max_delay_ms: 100,
                ..ReconnectPolicy::default()
            },
        ));
        let handle = connection.handle.clone();
        handle.open(ADDRESS, None).await.unwrap();

        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.emit(ClientEvent::Ping).await.unwrap();
        }

        // One initial attempt plus five automatic ones.
        assert_eq!(connector.connect_count(), 6);
        assert_eq!(handle.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_publish_while_disconnected_reports_false() {
        let connector = InMemoryConnector::new();
        let connection = spawn(&connector);

        assert!(!connection.handle.emit(ClientEvent::Ping).await.unwrap());
        assert!(connector.sent().is_empty());
    }

    #[tokio::test]
    async fn test_dropping_handles_stops_task() {
        let connector = InMemoryConnector::new();
        let connection = spawn(&connector);
        connection.handle.open(ADDRESS, None).await.unwrap();

        let Connection {
            handle,
            state_observer,
            task,
        } = connection;
        drop(handle);

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state_observer.state(), ConnectionState::Disconnected);
        assert_eq!(connector.close_count(), 1);
    }

    #[tokio::test]
    async fn test_handle_errors_once_task_is_gone() {
        let connector = InMemoryConnector::new();
        let connection = spawn(&connector);
        connection.task.abort();
        let _ = connection.task.await;

        assert!(connection.handle.open(ADDRESS, None).await.is_err());
    }
}
