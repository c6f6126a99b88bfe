//! Real-time chess arena: live games against people or the engine, with
//! matchmaking, clocks and rated results.

pub mod auth;
pub mod config;
pub mod error;
pub mod game;
pub mod gateway;
pub mod matchmaking;
pub mod persistence;
pub mod rating;
pub mod routes;
pub mod time_control;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use engine::SearchService;

use auth::JwtKeys;
use config::ServerConfig;
use game::GameStore;
use gateway::ConnectionRegistry;
use matchmaking::MatchmakingQueue;
use persistence::sqlite::{Database, SqliteFinishedGameRepository, SqlitePlayerRepository};
use persistence::GameRecorder;

pub use routes::router;

/// Shared by every handler and connection.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub jwt: Arc<JwtKeys>,
    pub games: Arc<GameStore>,
    pub queue: Arc<MatchmakingQueue>,
    pub engine: Arc<dyn SearchService>,
    pub players: SqlitePlayerRepository,
    pub finished_games: SqliteFinishedGameRepository,
    pub connections: Arc<ConnectionRegistry>,
}

impl AppState {
    /// Wire the store, queue and recorder together. Must be called inside a
    /// Tokio runtime.
    pub fn new(config: ServerConfig, db: &Database, engine: Arc<dyn SearchService>) -> Self {
        let players = SqlitePlayerRepository::new(db.pool().clone());
        let finished_games = SqliteFinishedGameRepository::new(db.pool().clone());
        let recorder = GameRecorder::new(
            players.clone(),
            finished_games.clone(),
            config.default_rating,
        );
        let games = Arc::new(GameStore::new(
            engine.clone(),
            Arc::new(recorder),
            config.finished_linger,
        ));
        let queue = Arc::new(MatchmakingQueue::new(games.clone()));

        Self {
            jwt: Arc::new(JwtKeys::new(&config.jwt_secret)),
            config: Arc::new(config),
            games,
            queue,
            engine,
            players,
            finished_games,
            connections: Arc::new(ConnectionRegistry::new()),
        }
    }
}
