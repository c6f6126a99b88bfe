//! One waiting slot per time-control code. The second player to ask for a
//! code is paired with whoever is waiting.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::game::{GameError, GameSnapshot, GameStore, Player};
use crate::gateway::ConnectionId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub player: Player,
    pub time_control: String,
    pub rated: bool,
    /// Connection to notify when this entry is paired.
    pub connection: Option<ConnectionId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    Enqueued,
    Matched {
        game: GameSnapshot,
        opponent: QueueEntry,
    },
}

type Coin = Box<dyn Fn() -> bool + Send + Sync>;

pub struct MatchmakingQueue {
    waiting: Mutex<HashMap<String, QueueEntry>>,
    store: Arc<GameStore>,
    /// `true` gives white to the newcomer.
    coin: Coin,
}

impl MatchmakingQueue {
    pub fn new(store: Arc<GameStore>) -> Self {
        Self::with_coin(store, rand::random::<bool>)
    }

    pub fn with_coin(store: Arc<GameStore>, coin: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            waiting: Mutex::new(HashMap::new()),
            store,
            coin: Box::new(coin),
        }
    }

    /// Wait for an opponent on `time_control`, or pair with the one already
    /// waiting. The check and the pairing happen under one lock.
    pub async fn enqueue(
        &self,
        player: Player,
        time_control: &str,
        rated: bool,
        connection: Option<ConnectionId>,
    ) -> Result<EnqueueOutcome, GameError> {
        let code = time_control.trim().to_string();
        let mut waiting = self.waiting.lock().await;

        let opponent = match waiting.remove(&code) {
            Some(entry) if entry.player.id != player.id => entry,
            // An empty slot, or the caller re-queueing: (re)occupy it.
            _ => {
                tracing::debug!(player = %player.id, time_control = %code, "Waiting for an opponent");
                waiting.insert(
                    code.clone(),
                    QueueEntry {
                        player,
                        time_control: code,
                        rated,
                        connection,
                    },
                );
                return Ok(EnqueueOutcome::Enqueued);
            }
        };

        let newcomer_white = (self.coin)();
        let (white, black) = if newcomer_white {
            (player, opponent.player.clone())
        } else {
            (opponent.player.clone(), player)
        };

        let game = match self
            .store
            .create_game(white, black, &code, rated && opponent.rated)
            .await
        {
            Ok(game) => game,
            Err(e) => {
                // Keep the waiting player's place.
                waiting.insert(code, opponent);
                return Err(e);
            }
        };
        tracing::info!(
            game = %game.id,
            white = %game.white.id,
            black = %game.black.id,
            time_control = %game.time_control.code,
            "Paired players"
        );
        Ok(EnqueueOutcome::Matched { game, opponent })
    }

    /// Drop every waiting entry owned by a closed connection.
    pub async fn cancel_connection(&self, connection: ConnectionId) -> usize {
        let mut waiting = self.waiting.lock().await;
        let before = waiting.len();
        waiting.retain(|_, entry| entry.connection != Some(connection));
        before - waiting.len()
    }

    pub async fn waiting_count(&self) -> usize {
        self.waiting.lock().await.len()
    }
}
