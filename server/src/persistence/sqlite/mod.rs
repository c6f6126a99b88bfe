//! SQLite-backed repository implementations.
//!
//! ## Database setup
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured with:
//! - **WAL mode** so the recorder can write while history reads continue.
//! - **Foreign keys enabled** at the connection level. Games reference both
//!   players, and moves cascade with their game.
//! - **Embedded migrations**: `sqlx::migrate!` runs `migrations/` when
//!   [`Database::open`] is called.
//!
//! | Type | Trait |
//! |------|-------|
//! | [`SqlitePlayerRepository`] | `PlayerRepository` |
//! | [`SqliteFinishedGameRepository`] | `FinishedGameRepository` |

mod database;
mod game_repo;
mod player_repo;

pub use database::Database;
pub use game_repo::SqliteFinishedGameRepository;
pub use player_repo::SqlitePlayerRepository;
