use chess::MoveRequest;
use tokio::sync::{broadcast, mpsc, oneshot};

use super::commands::{GameCommand, GameError};
use super::events::GameEvent;
use super::snapshot::GameSnapshot;

/// Cheap, cloneable handle to a game actor.
#[derive(Clone)]
pub struct GameHandle {
    id: String,
    cmd_tx: mpsc::Sender<GameCommand>,
}

impl GameHandle {
    pub(crate) fn new(id: String, cmd_tx: mpsc::Sender<GameCommand>) -> Self {
        Self { id, cmd_tx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn apply_move(
        &self,
        player_id: &str,
        request: MoveRequest,
    ) -> Result<GameSnapshot, GameError> {
        let (tx, rx) = oneshot::channel();
        self.send(GameCommand::ApplyMove {
            player_id: player_id.to_string(),
            request,
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| GameError::Internal("Reply dropped".into()))?
    }

    /// Start a new engine search if the engine is on move and idle.
    /// Returns whether a search was started.
    pub async fn retry_engine(&self, player_id: &str) -> Result<bool, GameError> {
        let (tx, rx) = oneshot::channel();
        self.send(GameCommand::RetryEngine {
            player_id: player_id.to_string(),
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| GameError::Internal("Reply dropped".into()))?
    }

    pub async fn snapshot(&self) -> Result<GameSnapshot, GameError> {
        let (tx, rx) = oneshot::channel();
        self.send(GameCommand::GetSnapshot { reply: tx }).await?;
        rx.await
            .map_err(|_| GameError::Internal("Reply dropped".into()))
    }

    /// Current state plus a receiver for every later event, with nothing
    /// lost in between.
    pub async fn subscribe(
        &self,
    ) -> Result<(GameSnapshot, broadcast::Receiver<GameEvent>), GameError> {
        let (tx, rx) = oneshot::channel();
        self.send(GameCommand::Subscribe { reply: tx }).await?;
        rx.await
            .map_err(|_| GameError::Internal("Reply dropped".into()))
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(GameCommand::Shutdown).await;
    }

    async fn send(&self, cmd: GameCommand) -> Result<(), GameError> {
        // A closed mailbox means the game was evicted.
        self.cmd_tx.send(cmd).await.map_err(|_| GameError::NotFound)
    }
}
