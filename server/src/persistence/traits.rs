//! Async repository trait definitions for the persistence layer.
//!
//! Methods return `impl Future + Send` rather than using `async fn` so that
//! the futures are guaranteed `Send`, which `tokio::spawn` and the
//! `#[async_trait]` result sink both require.

use super::{FinishedGameRecord, GameSummary, PersistenceError, PlayerRecord, RatingChange};
use std::future::Future;

/// Repository for durable player identities and their ratings.
pub trait PlayerRepository: Send + Sync {
    fn load_player(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<PlayerRecord>, PersistenceError>> + Send;
    /// Insert the player at `default_rating` if unknown, refresh the username
    /// otherwise, and return the stored row. Existing ratings are untouched.
    fn ensure_player(
        &self,
        id: &str,
        username: &str,
        default_rating: i32,
    ) -> impl Future<Output = Result<PlayerRecord, PersistenceError>> + Send;
}

/// Repository for completed games with their move lists.
///
/// A game, its moves and its rating changes are written in one transaction.
pub trait FinishedGameRepository: Send + Sync {
    /// Fails, writing nothing, if any rated player has no row.
    fn save_game(
        &self,
        record: &FinishedGameRecord,
        ratings: &[RatingChange],
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn load_game(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<FinishedGameRecord>, PersistenceError>> + Send;
    /// Most recent first.
    fn list_games_for_player(
        &self,
        player_id: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<GameSummary>, PersistenceError>> + Send;
}
