use sqlx::SqlitePool;

use crate::persistence::traits::PlayerRepository;
use crate::persistence::{PersistenceError, PlayerRecord};

#[derive(sqlx::FromRow)]
struct PlayerRow {
    player_id: String,
    username: String,
    rating: i64,
    created_at: i64,
}

impl From<PlayerRow> for PlayerRecord {
    fn from(r: PlayerRow) -> Self {
        Self {
            player_id: r.player_id,
            username: r.username,
            rating: r.rating as i32,
            created_at: r.created_at,
        }
    }
}

/// SQLite implementation of [`PlayerRepository`].
#[derive(Clone)]
pub struct SqlitePlayerRepository {
    pool: SqlitePool,
}

impl SqlitePlayerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl PlayerRepository for SqlitePlayerRepository {
    async fn load_player(&self, id: &str) -> Result<Option<PlayerRecord>, PersistenceError> {
        let row: Option<PlayerRow> = sqlx::query_as(
            "SELECT player_id, username, rating, created_at FROM players WHERE player_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(PlayerRecord::from))
    }

    async fn ensure_player(
        &self,
        id: &str,
        username: &str,
        default_rating: i32,
    ) -> Result<PlayerRecord, PersistenceError> {
        sqlx::query(
            r#"
            INSERT INTO players (player_id, username, rating, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(player_id) DO UPDATE SET username = excluded.username
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(i64::from(default_rating))
        .bind(crate::game::unix_now_ms())
        .execute(&self.pool)
        .await?;

        self.load_player(id)
            .await?
            .ok_or_else(|| PersistenceError::Corrupt(format!("player {id} vanished after upsert")))
    }
}
