//! Game server implementation.

use crate::config::Config;
use futures_util::{Sink, SinkExt, StreamExt};
use protocol::packets::{ClientMessage, ServerMessage};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

pub mod game;

pub use game::{run_game_loop, GameState, Intent, IntentSender};

/// Connection tracking state (shared across connection handlers).
#[derive(Debug, Default)]
struct ConnectionState {
    /// Number of connections per IP address.
    ip_connections: HashMap<IpAddr, usize>,
    /// Total number of connections.
    total_connections: usize,
}

impl ConnectionState {
    /// Try to add a connection, returns true if allowed.
    fn try_add_connection(&mut self, ip: IpAddr, max_total: usize, max_per_ip: usize) -> bool {
        if self.total_connections >= max_total {
            return false;
        }

        let current = self.ip_connections.get(&ip).copied().unwrap_or(0);
        if current >= max_per_ip {
            return false;
        }

        *self.ip_connections.entry(ip).or_insert(0) += 1;
        self.total_connections += 1;
        true
    }

    /// Remove a connection.
    fn remove_connection(&mut self, ip: IpAddr) {
        if let Some(count) = self.ip_connections.get_mut(&ip) {
            *count -= 1;
            self.total_connections = self.total_connections.saturating_sub(1);
            if *count == 0 {
                self.ip_connections.remove(&ip);
            }
        }
    }
}

/// Broadcast channels shared by every connection.
#[derive(Clone)]
struct Channels {
    /// Encoded `state` frames from the game loop.
    state_tx: broadcast::Sender<String>,
    /// Encoded `chat` frames from any connection.
    chat_tx: broadcast::Sender<String>,
    intent_tx: IntentSender,
}

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", addr);

    let conn_state = Arc::new(RwLock::new(ConnectionState::default()));

    let (state_tx, _state_rx) = broadcast::channel::<String>(4);
    let (chat_tx, _chat_rx) = broadcast::channel::<String>(100);

    let game = GameState::new(&config);
    let channels = Channels {
        state_tx: state_tx.clone(),
        chat_tx,
        intent_tx: game.intent_sender(),
    };
    let game_state = Arc::new(RwLock::new(game));

    // Start the game loop
    let game_loop_state = Arc::clone(&game_state);
    let tick_interval = config.server.tick_interval_ms;
    tokio::spawn(async move {
        run_game_loop(game_loop_state, state_tx, tick_interval).await;
    });

    let max_connections = config.server.max_connections;
    let ip_limit = config.server.ip_limit;

    loop {
        let (stream, addr) = listener.accept().await?;
        let ip = addr.ip();

        if !conn_state.write().await.try_add_connection(ip, max_connections, ip_limit) {
            warn!("Connection rejected (limit reached): {}", addr);
            continue;
        }

        let game_state = Arc::clone(&game_state);
        let conn_state = Arc::clone(&conn_state);
        let channels = channels.clone();

        tokio::spawn(async move {
            let result = handle_connection(stream, addr, game_state, channels).await;

            // Always remove from connection tracking when done
            conn_state.write().await.remove_connection(ip);

            if let Err(e) = result {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    game_state: Arc<RwLock<GameState>>,
    channels: Channels,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();

    let mut chat_rx = channels.chat_tx.subscribe();

    // Subscribing under the write lock lines the receiver up with the initial snapshot.
    let (player_id, initial_state, mut state_rx) = {
        let mut game = game_state.write().await;
        let id = game.add_player();
        (id, game.world.snapshot(), channels.state_tx.subscribe())
    };
    info!("Player {} connected from {}", player_id, addr);

    let result = async {
        write
            .send(Message::Text(ServerMessage::Welcome { id: player_id }.to_json()?.into()))
            .await?;
        write
            .send(Message::Text(ServerMessage::State(initial_state).to_json()?.into()))
            .await?;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            handle_text(text.as_str(), player_id, &game_state, &channels).await;
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(e)) => {
                            debug!("WebSocket error from {}: {}", addr, e);
                            break;
                        }
                        _ => {}
                    }
                }
                frame = state_rx.recv() => {
                    if !forward(&mut write, frame, addr).await {
                        break;
                    }
                }
                frame = chat_rx.recv() => {
                    if !forward(&mut write, frame, addr).await {
                        break;
                    }
                }
            }
        }
        anyhow::Ok(())
    }
    .await;

    game_state.write().await.remove_player(player_id);
    info!("Player {} disconnected ({})", player_id, addr);
    result
}

/// Send a broadcast frame to one client. Returns false when the connection
/// should be closed.
async fn forward<S>(write: &mut S, frame: Result<String, RecvError>, addr: SocketAddr) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    match frame {
        Ok(text) => match write.send(Message::Text(text.into())).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send to {}: {}", addr, e);
                false
            }
        },
        Err(RecvError::Lagged(skipped)) => {
            debug!("{} lagged behind by {} messages", addr, skipped);
            true
        }
        Err(RecvError::Closed) => false,
    }
}

/// Dispatch one inbound text frame. Malformed messages are dropped.
async fn handle_text(
    text: &str,
    player_id: u32,
    game_state: &RwLock<GameState>,
    channels: &Channels,
) {
    let message = match ClientMessage::parse(text) {
        Ok(message) => message,
        Err(e) => {
            debug!("Dropping message from player {}: {}", player_id, e);
            return;
        }
    };

    if let ClientMessage::Chat { message } = message {
        let name = game_state
            .read()
            .await
            .player_name(player_id)
            .map_or_else(|| format!("Player{player_id}"), str::to_string);
        let chat = ServerMessage::Chat {
            id: name,
            message,
            timestamp: epoch_millis(),
        };
        match chat.to_json() {
            Ok(json) => {
                let _ = channels.chat_tx.send(json);
            }
            Err(e) => warn!("Failed to encode chat: {}", e),
        }
        return;
    }

    if let Some(intent) = Intent::from_message(message) {
        // The receiver lives as long as the game state.
        let _ = channels.intent_tx.send((player_id, intent));
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
