//! WebSocket gateway and the serialized game loop
//!
//! The gateway owns all I/O fan-out: it accepts sockets, assigns player ids,
//! parses inbound frames once at the boundary, and forwards them as
//! [`GatewayEvent`]s into a single game loop task. That loop is the only
//! place the registry and counter are touched, and it processes one event to
//! completion before the next, so no two mutations can interleave. Outbound
//! traffic goes through per-connection unbounded channels and is never
//! awaited while holding game state.

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use crate::game::{GameState, Outbound};
use shared::{ClientMessage, ServerMessage, SWEEP_INTERVAL_MS};

/// Events sent from connection tasks to the game loop
#[derive(Debug)]
pub enum GatewayEvent {
    Connected {
        player_id: u32,
        sender: mpsc::UnboundedSender<Message>,
    },
    Inbound {
        player_id: u32,
        message: ClientMessage,
    },
    Disconnected {
        player_id: u32,
    },
}

/// Current timestamp in milliseconds since the Unix epoch.
pub fn current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

/// The arena server: accept loop, connection registry, and game loop
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,

    event_tx: mpsc::UnboundedSender<GatewayEvent>,
    event_rx: mpsc::UnboundedReceiver<GatewayEvent>,

    /// Outbound channel handle per connected player, so taunt and private
    /// sends are a map lookup rather than a scan over all sockets.
    connections: HashMap<u32, mpsc::UnboundedSender<Message>>,
    game_state: GameState,
    rng: StdRng,
}

impl Server {
    /// Binds the listener without starting to serve
    ///
    /// Splitting bind from run lets callers bind port 0 and read the actual
    /// address before any client connects.
    pub async fn bind(addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            event_tx,
            event_rx,
            connections: HashMap::new(),
            game_state: GameState::new(),
            rng: StdRng::from_entropy(),
        })
    }

    /// The address the server is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the accept loop and the game loop until the process stops
    ///
    /// The sweep interval ticks inside the same `select!` as event handling,
    /// so expiry can never race an in-flight purchase or increment.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => return Err("server is already running".into()),
        };

        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            accept_loop(listener, event_tx).await;
        });

        let mut sweep_interval =
            tokio::time::interval(Duration::from_millis(SWEEP_INTERVAL_MS));

        info!("Server started successfully");

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = sweep_interval.tick() => {
                    self.game_state.sweep_expired(current_millis());
                },
            }
        }

        Ok(())
    }

    /// Processes one gateway event to completion.
    fn handle_event(&mut self, event: GatewayEvent) {
        let now_ms = current_millis();

        match event {
            GatewayEvent::Connected { player_id, sender } => {
                self.connections.insert(player_id, sender);
                self.send_to(player_id, &ServerMessage::AssignId { player_id });
            }

            GatewayEvent::Inbound { player_id, message } => {
                let dispatches = match message {
                    ClientMessage::Register { username } => {
                        self.game_state
                            .register_player(player_id, username, now_ms, &mut self.rng)
                    }
                    ClientMessage::Increment { demo_mode } => {
                        self.game_state
                            .handle_increment(player_id, demo_mode, now_ms, &mut self.rng)
                    }
                    ClientMessage::BuyPowerUp { power_up } => {
                        self.game_state
                            .purchase_power_up(player_id, power_up, now_ms, &mut self.rng)
                    }
                };
                self.dispatch(dispatches);
            }

            GatewayEvent::Disconnected { player_id } => {
                self.connections.remove(&player_id);
                let dispatches = self.game_state.remove_player(player_id, now_ms, &mut self.rng);
                self.dispatch(dispatches);
            }
        }
    }

    fn dispatch(&self, outbound: Vec<Outbound>) {
        for item in outbound {
            match item {
                Outbound::ToPlayer(player_id, message) => self.send_to(player_id, &message),
                Outbound::ToAll(message) => self.broadcast(&message),
            }
        }
    }

    /// Queues a message for one player. A missing or closed connection is a
    /// stale target and is skipped quietly.
    fn send_to(&self, player_id: u32, message: &ServerMessage) {
        if let Some(sender) = self.connections.get(&player_id) {
            match serde_json::to_string(message) {
                Ok(json) => {
                    let _ = sender.send(Message::Text(json));
                }
                Err(e) => error!("Failed to encode message for player {}: {}", player_id, e),
            }
        }
    }

    /// Queues a message for every open connection.
    fn broadcast(&self, message: &ServerMessage) {
        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to encode broadcast: {}", e);
                return;
            }
        };

        for (player_id, sender) in &self.connections {
            if sender.send(Message::Text(json.clone())).is_err() {
                debug!("Dropping frame for closing connection {}", player_id);
            }
        }
    }
}

/// Accepts sockets forever, assigning each a fresh player id.
async fn accept_loop(listener: TcpListener, event_tx: mpsc::UnboundedSender<GatewayEvent>) {
    let mut next_player_id: u32 = 1;

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let player_id = next_player_id;
                next_player_id += 1;
                tokio::spawn(handle_connection(stream, addr, player_id, event_tx.clone()));
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Drives one client socket for its whole lifetime
///
/// The writer half runs as its own task fed by an unbounded channel; the
/// reader half is parsed here and forwarded as events. A malformed frame is
/// logged and dropped without disturbing the connection. Whatever way the
/// socket ends, exactly one `Disconnected` event follows.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    player_id: u32,
    event_tx: mpsc::UnboundedSender<GatewayEvent>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            warn!("WebSocket handshake failed for {}: {}", addr, e);
            return;
        }
    };
    info!("Player {} connected from {}", player_id, addr);

    let (mut write, mut read) = ws_stream.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

    if event_tx
        .send(GatewayEvent::Connected {
            player_id,
            sender: out_tx.clone(),
        })
        .is_err()
    {
        return;
    }

    // Writer task: ends when every sender clone is gone, which happens once
    // the game loop has processed the disconnect.
    tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            if write.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => {
                    if event_tx
                        .send(GatewayEvent::Inbound { player_id, message })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Dropping malformed message from player {}: {}", player_id, e);
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = out_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Socket error for player {}: {}", player_id, e);
                break;
            }
        }
    }

    let _ = event_tx.send(GatewayEvent::Disconnected { player_id });
    info!("Player {} disconnected", player_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_event_carries_parsed_message() {
        let (tx, mut rx) = mpsc::unbounded_channel::<GatewayEvent>();

        tx.send(GatewayEvent::Inbound {
            player_id: 7,
            message: ClientMessage::Increment { demo_mode: true },
        })
        .unwrap();

        match rx.try_recv().unwrap() {
            GatewayEvent::Inbound { player_id, message } => {
                assert_eq!(player_id, 7);
                assert_eq!(message, ClientMessage::Increment { demo_mode: true });
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_current_millis_is_monotone_enough() {
        let first = current_millis();
        std::thread::sleep(Duration::from_millis(2));
        let second = current_millis();
        assert!(second > first);
    }

    #[test]
    fn test_bind_reports_ephemeral_port() {
        tokio_test::block_on(async {
            let server = Server::bind("127.0.0.1:0").await.unwrap();
            assert_ne!(server.local_addr().port(), 0);
        });
    }

    #[test]
    fn test_send_to_unknown_player_is_a_noop() {
        tokio_test::block_on(async {
            let server = Server::bind("127.0.0.1:0").await.unwrap();
            // No connection registered under this id; must not panic.
            server.send_to(42, &ServerMessage::RateLimited);
        });
    }
}
