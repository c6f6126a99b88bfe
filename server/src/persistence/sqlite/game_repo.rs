//! SQLite-backed repository for finished games.

use chess::Side;
use sqlx::SqlitePool;

use crate::persistence::traits::FinishedGameRepository;
use crate::persistence::{
    FinishedGameRecord, GameSummary, PersistenceError, RatingChange, StoredMove, SummaryPlayer,
};

/// Row type for game queries, mapped via `sqlx::FromRow`.
#[derive(sqlx::FromRow)]
struct GameRow {
    game_id: String,
    white_id: String,
    white_name: String,
    white_rating: i64,
    black_id: String,
    black_name: String,
    black_rating: i64,
    result: String,
    termination: String,
    time_control: String,
    rated: i64,
    final_fen: String,
    pgn: String,
    created_at: i64,
    finished_at: i64,
}

impl GameRow {
    fn into_record(self, moves: Vec<StoredMove>) -> FinishedGameRecord {
        FinishedGameRecord {
            game_id: self.game_id,
            white_id: self.white_id,
            white_name: self.white_name,
            white_rating: self.white_rating as i32,
            black_id: self.black_id,
            black_name: self.black_name,
            black_rating: self.black_rating as i32,
            result: self.result,
            termination: self.termination,
            time_control: self.time_control,
            rated: self.rated != 0,
            final_fen: self.final_fen,
            pgn: self.pgn,
            moves,
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }

    fn into_summary(self) -> GameSummary {
        GameSummary {
            id: self.game_id,
            white: SummaryPlayer {
                id: self.white_id,
                username: self.white_name,
                rating: self.white_rating as i32,
            },
            black: SummaryPlayer {
                id: self.black_id,
                username: self.black_name,
                rating: self.black_rating as i32,
            },
            result: self.result,
            time_control: self.time_control,
            played_at: self.finished_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MoveRow {
    ply: i64,
    san: String,
    mv_from: String,
    mv_to: String,
    fen_after: String,
    mover: String,
}

impl TryFrom<MoveRow> for StoredMove {
    type Error = PersistenceError;

    fn try_from(r: MoveRow) -> Result<Self, Self::Error> {
        let mover = match r.mover.as_str() {
            "white" => Side::White,
            "black" => Side::Black,
            other => return Err(PersistenceError::Corrupt(format!("mover '{other}'"))),
        };
        Ok(Self {
            ply: r.ply as u32,
            san: r.san,
            from: r.mv_from,
            to: r.mv_to,
            fen_after: r.fen_after,
            mover,
        })
    }
}

const GAME_COLUMNS: &str = "game_id, white_id, white_name, white_rating, black_id, black_name, \
     black_rating, result, termination, time_control, rated, final_fen, pgn, created_at, finished_at";

/// SQLite implementation of [`FinishedGameRepository`].
#[derive(Clone)]
pub struct SqliteFinishedGameRepository {
    pool: SqlitePool,
}

impl SqliteFinishedGameRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl FinishedGameRepository for SqliteFinishedGameRepository {
    async fn save_game(
        &self,
        record: &FinishedGameRecord,
        ratings: &[RatingChange],
    ) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO finished_games
                (game_id, white_id, white_name, white_rating, black_id, black_name,
                 black_rating, result, termination, time_control, rated, final_fen,
                 pgn, move_count, created_at, finished_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.game_id)
        .bind(&record.white_id)
        .bind(&record.white_name)
        .bind(i64::from(record.white_rating))
        .bind(&record.black_id)
        .bind(&record.black_name)
        .bind(i64::from(record.black_rating))
        .bind(&record.result)
        .bind(&record.termination)
        .bind(&record.time_control)
        .bind(i64::from(record.rated))
        .bind(&record.final_fen)
        .bind(&record.pgn)
        .bind(record.moves.len() as i64)
        .bind(record.created_at)
        .bind(record.finished_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM game_moves WHERE game_id = ?")
            .bind(&record.game_id)
            .execute(&mut *tx)
            .await?;

        for mv in &record.moves {
            sqlx::query(
                r#"
                INSERT INTO game_moves (game_id, ply, san, mv_from, mv_to, fen_after, mover)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.game_id)
            .bind(i64::from(mv.ply))
            .bind(&mv.san)
            .bind(&mv.from)
            .bind(&mv.to)
            .bind(&mv.fen_after)
            .bind(mv.mover.as_str())
            .execute(&mut *tx)
            .await?;
        }

        for change in ratings {
            let updated = sqlx::query("UPDATE players SET rating = ? WHERE player_id = ?")
                .bind(i64::from(change.rating))
                .bind(&change.player_id)
                .execute(&mut *tx)
                .await?;
            // Dropping `tx` rolls back the game rows too.
            if updated.rows_affected() != 1 {
                return Err(PersistenceError::Corrupt(format!(
                    "no player {} to rate",
                    change.player_id
                )));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load_game(&self, id: &str) -> Result<Option<FinishedGameRecord>, PersistenceError> {
        let row: Option<GameRow> = sqlx::query_as(&format!(
            "SELECT {GAME_COLUMNS} FROM finished_games WHERE game_id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some(r) => {
                let moves = load_moves_for_game(&self.pool, &r.game_id).await?;
                Ok(Some(r.into_record(moves)))
            }
        }
    }

    async fn list_games_for_player(
        &self,
        player_id: &str,
        limit: u32,
    ) -> Result<Vec<GameSummary>, PersistenceError> {
        let rows: Vec<GameRow> = sqlx::query_as(&format!(
            "SELECT {GAME_COLUMNS} FROM finished_games
             WHERE white_id = ? OR black_id = ?
             ORDER BY finished_at DESC
             LIMIT ?"
        ))
        .bind(player_id)
        .bind(player_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(GameRow::into_summary).collect())
    }
}

/// Load all moves for a game ordered by ply.
async fn load_moves_for_game(
    pool: &SqlitePool,
    game_id: &str,
) -> Result<Vec<StoredMove>, PersistenceError> {
    let rows: Vec<MoveRow> = sqlx::query_as(
        r#"
            SELECT ply, san, mv_from, mv_to, fen_after, mover
            FROM game_moves
            WHERE game_id = ?
            ORDER BY ply
            "#,
    )
    .bind(game_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(StoredMove::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::{Database, SqlitePlayerRepository};
    use crate::persistence::traits::PlayerRepository;

    async fn test_db() -> (Database, SqliteFinishedGameRepository) {
        let db = Database::new_in_memory().await.unwrap();
        let players = SqlitePlayerRepository::new(db.pool().clone());
        players.ensure_player("alice", "alice", 1500).await.unwrap();
        players.ensure_player("bob", "bob", 1500).await.unwrap();
        players.ensure_player("carol", "carol", 1500).await.unwrap();
        let repo = SqliteFinishedGameRepository::new(db.pool().clone());
        (db, repo)
    }

    fn sample_game(id: &str, white: &str, black: &str, finished_at: i64) -> FinishedGameRecord {
        FinishedGameRecord {
            game_id: id.to_string(),
            white_id: white.to_string(),
            white_name: white.to_string(),
            white_rating: 1500,
            black_id: black.to_string(),
            black_name: black.to_string(),
            black_rating: 1520,
            result: "1-0".to_string(),
            termination: "checkmate".to_string(),
            time_control: "5+0".to_string(),
            rated: true,
            final_fen: "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2".to_string(),
            pgn: "1. e4 e5".to_string(),
            moves: vec![
                StoredMove {
                    ply: 1,
                    san: "e4".to_string(),
                    from: "e2".to_string(),
                    to: "e4".to_string(),
                    fen_after: "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
                        .to_string(),
                    mover: Side::White,
                },
                StoredMove {
                    ply: 2,
                    san: "e5".to_string(),
                    from: "e7".to_string(),
                    to: "e5".to_string(),
                    fen_after: "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2"
                        .to_string(),
                    mover: Side::Black,
                },
            ],
            created_at: finished_at - 60_000,
            finished_at,
        }
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let (_db, repo) = test_db().await;
        let record = sample_game("g1", "alice", "bob", 1_000_000);
        repo.save_game(&record, &[]).await.unwrap();
        assert_eq!(repo.load_game("g1").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_plies_are_one_indexed() {
        let (db, repo) = test_db().await;
        repo.save_game(&sample_game("g1", "alice", "bob", 1_000_000), &[])
            .await
            .unwrap();
        let plies: Vec<(i64,)> =
            sqlx::query_as("SELECT ply FROM game_moves WHERE game_id = 'g1' ORDER BY ply")
                .fetch_all(db.pool())
                .await
                .unwrap();
        assert_eq!(plies, vec![(1,), (2,)]);
    }

    #[tokio::test]
    async fn test_unknown_player_is_rejected() {
        let (_db, repo) = test_db().await;
        let record = sample_game("g1", "alice", "mallory", 1_000_000);
        assert!(repo.save_game(&record, &[]).await.is_err());
        assert_eq!(repo.load_game("g1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ratings_are_written_with_the_game() {
        let (db, repo) = test_db().await;
        let changes = [
            RatingChange {
                player_id: "alice".into(),
                rating: 1516,
            },
            RatingChange {
                player_id: "bob".into(),
                rating: 1484,
            },
        ];
        repo.save_game(&sample_game("g1", "alice", "bob", 1_000_000), &changes)
            .await
            .unwrap();
        let ratings: Vec<(String, i64)> = sqlx::query_as(
            "SELECT player_id, rating FROM players WHERE player_id IN ('alice', 'bob') ORDER BY player_id",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();
        assert_eq!(ratings, vec![("alice".into(), 1516), ("bob".into(), 1484)]);
    }

    #[tokio::test]
    async fn test_failed_rating_write_rolls_back_game() {
        let (db, repo) = test_db().await;
        let changes = [
            RatingChange {
                player_id: "alice".into(),
                rating: 1516,
            },
            RatingChange {
                player_id: "ghost".into(),
                rating: 1484,
            },
        ];
        let err = repo
            .save_game(&sample_game("g1", "alice", "bob", 1_000_000), &changes)
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupt(_)));
        assert_eq!(repo.load_game("g1").await.unwrap(), None);

        let alice: i64 = sqlx::query_scalar("SELECT rating FROM players WHERE player_id = 'alice'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        let moves: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM game_moves")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(alice, 1500);
        assert_eq!(moves, 0);
    }

    #[tokio::test]
    async fn test_history_for_player_newest_first() {
        let (_db, repo) = test_db().await;
        repo.save_game(&sample_game("old", "alice", "bob", 100_000), &[])
            .await
            .unwrap();
        repo.save_game(&sample_game("new", "bob", "alice", 300_000), &[])
            .await
            .unwrap();
        repo.save_game(&sample_game("other", "bob", "carol", 200_000), &[])
            .await
            .unwrap();

        let history = repo.list_games_for_player("alice", 20).await.unwrap();
        let ids: Vec<&str> = history.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(history[0].white.username, "bob");
        assert_eq!(history[0].played_at, 300_000);

        let limited = repo.list_games_for_player("bob", 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].id, "new");
    }
}
