//! Durable record of finished games and player ratings.
//!
//! The game store hands every finished game to a [`ResultSink`]. The
//! production sink is [`GameRecorder`], which writes through the SQLite
//! repositories in [`sqlite`].

mod recorder;
pub mod sqlite;
pub mod traits;

pub use recorder::GameRecorder;
pub use traits::{FinishedGameRepository, PlayerRepository};

use async_trait::async_trait;
use chess::Side;
use serde::Serialize;

use crate::game::GameSnapshot;

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Receives each game exactly once, when it finishes. Implementations log
/// their own failures; nothing is reported back to the game.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn record(&self, game: &GameSnapshot);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub player_id: String,
    pub username: String,
    pub rating: i32,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMove {
    /// 1-indexed.
    pub ply: u32,
    pub san: String,
    pub from: String,
    pub to: String,
    pub fen_after: String,
    pub mover: Side,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedGameRecord {
    pub game_id: String,
    pub white_id: String,
    pub white_name: String,
    pub white_rating: i32,
    pub black_id: String,
    pub black_name: String,
    pub black_rating: i32,
    pub result: String,
    pub termination: String,
    pub time_control: String,
    pub rated: bool,
    pub final_fen: String,
    pub pgn: String,
    pub moves: Vec<StoredMove>,
    pub created_at: i64,
    pub finished_at: i64,
}

/// A player's rating after a rated result, written with the game itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingChange {
    pub player_id: String,
    pub rating: i32,
}

/// One line of a player's game history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: String,
    pub white: SummaryPlayer,
    pub black: SummaryPlayer,
    pub result: String,
    pub time_control: String,
    pub played_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryPlayer {
    pub id: String,
    pub username: String,
    pub rating: i32,
}
