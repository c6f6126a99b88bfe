use super::snapshot::{Clocks, GameSnapshot, MoveRecord};

/// Events broadcast from a game actor to every subscribed connection.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum GameEvent {
    /// A move was accepted.
    MoveMade {
        record: MoveRecord,
        clocks: Clocks,
        last_move_at: i64,
    },
    /// Full state, sent once when the game finishes.
    Finished(GameSnapshot),
    /// Game-level notice, e.g. a failed engine move.
    Status(String),
}
