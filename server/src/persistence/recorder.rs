use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    FinishedGameRecord, FinishedGameRepository, PersistenceError, PlayerRepository, RatingChange,
    ResultSink, StoredMove,
};
use crate::game::GameSnapshot;
use crate::rating::{update_elo, white_score};

const DRAW: &str = "1/2-1/2";

/// Writes finished games between durable players together with the rating
/// change for rated ones. Games are recorded one at a time so each rating
/// update starts from the previous one.
pub struct GameRecorder<P, G> {
    players: P,
    games: G,
    default_rating: i32,
    write_lock: Mutex<()>,
}

impl<P: PlayerRepository, G: FinishedGameRepository> GameRecorder<P, G> {
    pub fn new(players: P, games: G, default_rating: i32) -> Self {
        Self {
            players,
            games,
            default_rating,
            write_lock: Mutex::new(()),
        }
    }

    async fn persist(&self, game: &GameSnapshot) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let white = self
            .players
            .ensure_player(&game.white.id, &game.white.username, self.default_rating)
            .await?;
        let black = self
            .players
            .ensure_player(&game.black.id, &game.black.username, self.default_rating)
            .await?;

        let result = game.result.clone().unwrap_or_else(|| DRAW.to_string());
        let record = FinishedGameRecord {
            game_id: game.id.clone(),
            white_id: white.player_id.clone(),
            white_name: white.username.clone(),
            white_rating: white.rating,
            black_id: black.player_id.clone(),
            black_name: black.username.clone(),
            black_rating: black.rating,
            result: result.clone(),
            termination: game
                .termination
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
            time_control: game.time_control.code.clone(),
            rated: game.rated,
            final_fen: game.fen.clone(),
            pgn: game.pgn.clone(),
            moves: game
                .moves
                .iter()
                .map(|m| StoredMove {
                    ply: m.ply_number,
                    san: m.san.clone(),
                    from: m.from.clone(),
                    to: m.to.clone(),
                    fen_after: m.resulting_position.clone(),
                    mover: m.mover,
                })
                .collect(),
            created_at: game.created_at,
            finished_at: game.finished_at.unwrap_or(game.last_move_at),
        };

        if !game.rated {
            return self.games.save_game(&record, &[]).await;
        }

        let (new_white, new_black) = update_elo(white.rating, black.rating, white_score(&result));
        let changes = [
            RatingChange {
                player_id: white.player_id.clone(),
                rating: new_white,
            },
            RatingChange {
                player_id: black.player_id.clone(),
                rating: new_black,
            },
        ];
        self.games.save_game(&record, &changes).await?;
        info!(
            game = %game.id,
            "Ratings updated: {} {} -> {}, {} {} -> {}",
            white.username, white.rating, new_white, black.username, black.rating, new_black
        );
        Ok(())
    }
}

#[async_trait]
impl<P, G> ResultSink for GameRecorder<P, G>
where
    P: PlayerRepository,
    G: FinishedGameRepository,
{
    async fn record(&self, game: &GameSnapshot) {
        if !(game.white.is_durable() && game.black.is_durable()) {
            debug!(game = %game.id, "Not recording a game with a guest or engine seat");
            return;
        }
        if let Err(e) = self.persist(game).await {
            warn!(game = %game.id, "Failed to record finished game: {}", e);
        }
    }
}
