use chess::MoveRequest;
use engine::{EngineError, EngineReply};
use tokio::sync::{broadcast, oneshot};

use super::events::GameEvent;
use super::snapshot::GameSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Game not found")]
    NotFound,
    #[error("Game is already finished")]
    GameFinished,
    #[error("You are not a player in this game")]
    NotParticipant,
    #[error("It is not your turn")]
    NotYourTurn,
    #[error("{0}")]
    IllegalMove(String),
    #[error("A player cannot be paired with themselves")]
    SamePlayer,
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Commands sent to the game actor. Requests embed a oneshot for the reply.
pub(crate) enum GameCommand {
    ApplyMove {
        player_id: String,
        request: MoveRequest,
        reply: oneshot::Sender<Result<GameSnapshot, GameError>>,
    },
    /// Result of a search started by the actor for the position at `ply`.
    EngineMove {
        ply: u32,
        result: Result<EngineReply, EngineError>,
    },
    RetryEngine {
        player_id: String,
        reply: oneshot::Sender<Result<bool, GameError>>,
    },
    GetSnapshot {
        reply: oneshot::Sender<GameSnapshot>,
    },
    Subscribe {
        reply: oneshot::Sender<(GameSnapshot, broadcast::Receiver<GameEvent>)>,
    },
    Shutdown,
}
