//! Wordrush Player - headless live-channel client.
//!
//! Connects to the game server, logs game events and turns stdin lines into
//! guesses. `/sync`, `/ping`, `/say <text>` and `/quit` are commands.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordrush_player::application::{GameCommandService, GameEvents};
use wordrush_player::config::ClientConfig;
use wordrush_player::infrastructure::websocket::{spawn_connection, ConnectionManager, WsConnector};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordrush_player=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Wordrush Player");

    let config = ClientConfig::from_env().context("invalid client configuration")?;

    let mut manager = ConnectionManager::new(Arc::new(WsConnector::new()), config.reconnect.clone());
    register_event_log(&mut manager);

    let connection = spawn_connection(manager);
    let commands = GameCommandService::new(connection.handle.clone(), config.identity.clone());

    let state = connection
        .handle
        .open(config.ws_url.as_str(), config.identity.clone())
        .await?;
    tracing::info!(url = %config.ws_url, state = %state, "Live channel requested");
    if commands.identity().is_none() {
        tracing::warn!("WORDRUSH_USER is not set; guesses are disabled");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !run_command(&commands, line.trim()).await? {
                    break;
                }
            }
        }
    }

    connection.handle.close().await?;
    drop(commands);
    drop(connection.handle);
    let _ = connection.task.await;
    Ok(())
}

/// Execute one input line. Returns false when the user asked to quit.
async fn run_command(commands: &GameCommandService, line: &str) -> anyhow::Result<bool> {
    let sent = match line {
        "" => return Ok(true),
        "/quit" => return Ok(false),
        "/sync" => commands.request_sync().await?,
        "/ping" => commands.ping().await?,
        _ => {
            if let Some(text) = line.strip_prefix("/say ") {
                commands.send_chat(text).await?
            } else {
                match commands.submit_guess(line).await {
                    Ok(sent) => sent,
                    Err(e) => {
                        tracing::warn!(error = %e, "Guess not sent");
                        return Ok(true);
                    }
                }
            }
        }
    };
    if !sent {
        tracing::warn!("Not connected; input dropped");
    }
    Ok(true)
}

fn register_event_log(manager: &mut ConnectionManager) {
    manager.on_welcome(|welcome| {
        tracing::info!(data = ?welcome.data, "Welcome");
        Ok(())
    });
    manager.on_new_round(|round| {
        let round_id = round.round_id.map(|id| id.to_string()).unwrap_or_default();
        tracing::info!(word_length = round.word_length, round_id = %round_id, "New round");
        Ok(())
    });
    manager.on_round_started(|round| {
        tracing::info!(data = ?round.data, "Round started");
        Ok(())
    });
    manager.on_round_ended(|round| {
        tracing::info!(solution = %round.solution, winners = ?round.winners, "Round ended");
        Ok(())
    });
    manager.on_timer(|timer| {
        tracing::debug!(seconds_left = timer.seconds_left, "Timer");
        Ok(())
    });
    manager.on_guess(|guess| {
        tracing::info!(user = %guess.user, guess = %guess.guess, "Guess");
        Ok(())
    });
    manager.on_correct_guess(|hit| {
        tracing::info!(user = %hit.user, guess = %hit.guess, "Correct guess");
        Ok(())
    });
    manager.on_player_list(|list| {
        tracing::info!(users = ?list.users, "Players");
        Ok(())
    });
    manager.on_sync(|snapshot| {
        tracing::info!(fields = snapshot.state.len(), "Game state synced");
        Ok(())
    });
    manager.on_user_joined(|presence| {
        tracing::info!(user = %presence.user, "User joined");
        Ok(())
    });
    manager.on_user_left(|presence| {
        tracing::info!(user = %presence.user, "User left");
        Ok(())
    });
    manager.on_error(|notice| {
        tracing::error!(message = %notice.message, "Server error");
        Ok(())
    });
    manager.on_pong(|_| {
        tracing::debug!("Pong");
        Ok(())
    });
    manager.on_chat_message(|message| {
        tracing::info!(text = %message.text, "Message");
        Ok(())
    });
}
