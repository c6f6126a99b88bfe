use std::collections::HashMap;
use std::sync::Arc;

use chess::MoveRequest;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn, Instrument};

use super::protocol::{ClientMessage, ServerMessage};
use super::registry::{ConnectionId, ConnectionRegistry, Notice};
use crate::game::{GameEvent, GameHandle, GameStore, Player};
use crate::matchmaking::{EnqueueOutcome, MatchmakingQueue};

/// One authenticated client. Owns its room memberships; everything it sends
/// goes through `outbound`, which the socket writer drains.
pub struct Connection {
    id: ConnectionId,
    player: Player,
    games: Arc<GameStore>,
    queue: Arc<MatchmakingQueue>,
    registry: Arc<ConnectionRegistry>,
    outbound: mpsc::UnboundedSender<ServerMessage>,
    rooms: HashMap<String, JoinHandle<()>>,
}

impl Connection {
    pub fn new(
        id: ConnectionId,
        player: Player,
        games: Arc<GameStore>,
        queue: Arc<MatchmakingQueue>,
        registry: Arc<ConnectionRegistry>,
        outbound: mpsc::UnboundedSender<ServerMessage>,
    ) -> Self {
        Self {
            id,
            player,
            games,
            queue,
            registry,
            outbound,
            rooms: HashMap::new(),
        }
    }

    pub fn in_room(&self, game_id: &str) -> bool {
        self.rooms.contains_key(game_id)
    }

    pub async fn handle_text(&mut self, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => {
                debug!("Malformed frame: {}", e);
                self.send(ServerMessage::status(None, format!("Invalid message: {e}")));
            }
        }
    }

    pub async fn handle_message(&mut self, message: ClientMessage) {
        match message {
            ClientMessage::JoinGame { game_id } => self.join(&game_id).await,
            ClientMessage::LeaveGame { game_id } => self.leave(&game_id),
            ClientMessage::Move {
                game_id,
                from,
                to,
                promotion,
            } => {
                let request = MoveRequest {
                    from,
                    to,
                    promotion,
                };
                // Accepted moves reach every room member, this one included.
                if let Err(e) = self.games.apply_move(&game_id, &self.player.id, request).await {
                    self.send(ServerMessage::status(Some(&game_id), e.to_string()));
                }
            }
            ClientMessage::Queue {
                time_control_code,
                rated,
            } => self.enqueue(&time_control_code, rated).await,
            ClientMessage::RetryEngine { game_id } => {
                match self.games.retry_engine(&game_id, &self.player.id).await {
                    Ok(true) => {}
                    Ok(false) => self.send(ServerMessage::status(
                        Some(&game_id),
                        "The engine is not waiting to move",
                    )),
                    Err(e) => self.send(ServerMessage::status(Some(&game_id), e.to_string())),
                }
            }
        }
    }

    pub async fn handle_notice(&mut self, notice: Notice) {
        match notice {
            Notice::Matched { game_id } => self.join(&game_id).await,
        }
    }

    /// Subscribe to a game's room. The current snapshot is sent first.
    pub async fn join(&mut self, game_id: &str) {
        let handle = match self.games.get_handle(game_id).await {
            Ok(handle) => handle,
            Err(e) => {
                self.send(ServerMessage::status(Some(game_id), e.to_string()));
                return;
            }
        };
        let (snapshot, events) = match handle.subscribe().await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.send(ServerMessage::status(Some(game_id), e.to_string()));
                return;
            }
        };

        if let Some(previous) = self.rooms.remove(game_id) {
            previous.abort();
        }
        self.send(ServerMessage::Game(snapshot.for_viewer(&self.player.id)));
        let forwarder = spawn_forwarder(
            handle,
            events,
            self.player.id.clone(),
            self.outbound.clone(),
        );
        self.rooms.insert(game_id.to_string(), forwarder);
        debug!(game = %game_id, "Joined room");
    }

    pub fn leave(&mut self, game_id: &str) {
        if let Some(forwarder) = self.rooms.remove(game_id) {
            forwarder.abort();
            debug!(game = %game_id, "Left room");
        }
    }

    async fn enqueue(&mut self, time_control: &str, rated: bool) {
        let outcome = self
            .queue
            .enqueue(self.player.clone(), time_control, rated, Some(self.id))
            .await;
        match outcome {
            Ok(EnqueueOutcome::Enqueued) => self.send(ServerMessage::status(
                None,
                format!("Waiting for an opponent ({})", time_control.trim()),
            )),
            Ok(EnqueueOutcome::Matched { game, opponent }) => {
                self.join(&game.id).await;
                let notified = match opponent.connection {
                    Some(conn) => {
                        self.registry
                            .notify(
                                conn,
                                Notice::Matched {
                                    game_id: game.id.clone(),
                                },
                            )
                            .await
                    }
                    None => false,
                };
                if !notified {
                    warn!(game = %game.id, opponent = %opponent.player.id, "Paired opponent has no open connection");
                }
            }
            Err(e) => self.send(ServerMessage::status(None, e.to_string())),
        }
    }

    /// Leave every room, drop queue entries and deregister.
    pub async fn close(mut self) {
        for (_, forwarder) in self.rooms.drain() {
            forwarder.abort();
        }
        let cancelled = self.queue.cancel_connection(self.id).await;
        if cancelled > 0 {
            debug!("Cancelled {} queue entries", cancelled);
        }
        self.registry.unregister(self.id).await;
    }

    fn send(&self, message: ServerMessage) {
        if self.outbound.send(message).is_err() {
            debug!("Outbound channel closed");
        }
    }
}

/// Relay one game's events to one connection until either side goes away.
fn spawn_forwarder(
    handle: GameHandle,
    mut events: broadcast::Receiver<GameEvent>,
    viewer: String,
    outbound: mpsc::UnboundedSender<ServerMessage>,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            loop {
                let message = match events.recv().await {
                    Ok(GameEvent::MoveMade {
                        record,
                        clocks,
                        last_move_at,
                    }) => ServerMessage::Move {
                        game_id: handle.id().to_string(),
                        record,
                        clocks,
                        last_move_at,
                    },
                    Ok(GameEvent::Finished(snapshot)) => {
                        ServerMessage::Game(snapshot.for_viewer(&viewer))
                    }
                    Ok(GameEvent::Status(message)) => {
                        ServerMessage::status(Some(handle.id()), message)
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(game = %handle.id(), "Room subscriber lagged by {} events, resyncing", skipped);
                        match handle.snapshot().await {
                            Ok(snapshot) => ServerMessage::Game(snapshot.for_viewer(&viewer)),
                            Err(_) => break,
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if outbound.send(message).is_err() {
                    break;
                }
            }
        }
        .in_current_span(),
    )
}
