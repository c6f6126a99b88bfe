//! Game session store: one actor task per live game.

mod actor;
mod commands;
mod events;
mod handle;
mod player;
mod snapshot;
mod state;

#[cfg(test)]
mod integration_tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chess::MoveRequest;
use engine::SearchService;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

use crate::persistence::ResultSink;
use crate::time_control::TimeControl;
use actor::{run_game_actor, ActorContext};
pub use commands::GameError;
pub use events::GameEvent;
pub use handle::GameHandle;
pub use player::{Player, ENGINE_PLAYER_ID, ENGINE_RATING};
pub use snapshot::{
    movetext, Clocks, GameSnapshot, GameStatus, MoveRecord, Outcome, Perspective, Termination,
};
pub use state::unix_now_ms;
use state::GameState;

type GameMap = Arc<RwLock<HashMap<String, GameHandle>>>;

/// Owns every live game. Spawns an actor per game and a reaper that records
/// and then evicts finished games.
pub struct GameStore {
    games: GameMap,
    engine: Arc<dyn SearchService>,
    finished_tx: mpsc::UnboundedSender<GameSnapshot>,
}

impl GameStore {
    /// Must be called inside a Tokio runtime.
    pub fn new(
        engine: Arc<dyn SearchService>,
        sink: Arc<dyn ResultSink>,
        finished_linger: Duration,
    ) -> Self {
        let games: GameMap = Arc::new(RwLock::new(HashMap::new()));
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_reaper(finished_rx, games.clone(), sink, finished_linger));
        Self {
            games,
            engine,
            finished_tx,
        }
    }

    pub async fn create_game(
        &self,
        white: Player,
        black: Player,
        time_control_code: &str,
        rated: bool,
    ) -> Result<GameSnapshot, GameError> {
        if white.id == black.id {
            return Err(GameError::SamePlayer);
        }
        Ok(self
            .spawn_game(white, black, TimeControl::parse(time_control_code), rated, None)
            .await)
    }

    /// The human plays white against the engine. Never rated.
    pub async fn create_ai_game(
        &self,
        human: Player,
        level: u8,
        time_control_code: &str,
    ) -> Result<GameSnapshot, GameError> {
        if human.is_engine() {
            return Err(GameError::SamePlayer);
        }
        let level = level.clamp(engine::strength::MIN_LEVEL, engine::strength::MAX_LEVEL);
        Ok(self
            .spawn_game(
                human,
                Player::engine(level),
                TimeControl::parse(time_control_code),
                false,
                Some(level),
            )
            .await)
    }

    async fn spawn_game(
        &self,
        white: Player,
        black: Player,
        time_control: TimeControl,
        rated: bool,
        engine_level: Option<u8>,
    ) -> GameSnapshot {
        let game_id = Uuid::new_v4().to_string();
        let state = GameState::new(
            game_id.clone(),
            white,
            black,
            time_control,
            rated,
            engine_level,
            Instant::now(),
        );
        let initial_snapshot = state.snapshot();

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, _) = broadcast::channel(100);
        let ctx = ActorContext {
            engine: self.engine.clone(),
            self_tx: cmd_tx.downgrade(),
            event_tx,
            finished_tx: self.finished_tx.clone(),
        };

        let handle = GameHandle::new(game_id.clone(), cmd_tx);
        self.games.write().await.insert(game_id, handle);
        tokio::spawn(run_game_actor(state, cmd_rx, ctx));

        initial_snapshot
    }

    pub async fn get_handle(&self, game_id: &str) -> Result<GameHandle, GameError> {
        self.games
            .read()
            .await
            .get(game_id)
            .cloned()
            .ok_or(GameError::NotFound)
    }

    pub async fn apply_move(
        &self,
        game_id: &str,
        player_id: &str,
        request: MoveRequest,
    ) -> Result<GameSnapshot, GameError> {
        self.get_handle(game_id)
            .await?
            .apply_move(player_id, request)
            .await
    }

    pub async fn retry_engine(&self, game_id: &str, player_id: &str) -> Result<bool, GameError> {
        self.get_handle(game_id).await?.retry_engine(player_id).await
    }

    pub async fn snapshot(&self, game_id: &str) -> Result<GameSnapshot, GameError> {
        self.get_handle(game_id).await?.snapshot().await
    }

    /// Drop a game from memory and stop its actor.
    pub async fn evict(&self, game_id: &str) -> bool {
        evict_from(&self.games, game_id).await
    }

    /// Number of games held in memory, finished ones included until evicted.
    pub async fn active_games(&self) -> usize {
        self.games.read().await.len()
    }

    pub async fn shutdown(&self) {
        let handles: Vec<GameHandle> = self.games.write().await.drain().map(|(_, h)| h).collect();
        for handle in &handles {
            handle.shutdown().await;
        }
        tracing::info!("Stopped {} game actors", handles.len());
    }
}

async fn evict_from(games: &GameMap, game_id: &str) -> bool {
    let removed = games.write().await.remove(game_id);
    match removed {
        Some(handle) => {
            handle.shutdown().await;
            tracing::debug!(game = %game_id, "Game evicted");
            true
        }
        None => false,
    }
}

/// Records each finished game, then evicts it after `linger`. Recording
/// never delays the clients, who already saw the result from the actor.
async fn run_reaper(
    mut finished_rx: mpsc::UnboundedReceiver<GameSnapshot>,
    games: GameMap,
    sink: Arc<dyn ResultSink>,
    linger: Duration,
) {
    while let Some(snapshot) = finished_rx.recv().await {
        let games = games.clone();
        let sink = sink.clone();
        tokio::spawn(async move {
            sink.record(&snapshot).await;
            tokio::time::sleep(linger).await;
            evict_from(&games, &snapshot.id).await;
        });
    }
}
