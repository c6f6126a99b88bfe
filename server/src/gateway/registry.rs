use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, RwLock};

pub type ConnectionId = u64;

/// Cross-connection messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A queue entry owned by this connection was paired.
    Matched { game_id: String },
}

/// Every open connection's notice channel, by id.
#[derive(Default)]
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    connections: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<Notice>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self) -> (ConnectionId, mpsc::UnboundedReceiver<Notice>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.write().await.insert(id, tx);
        (id, rx)
    }

    pub async fn unregister(&self, id: ConnectionId) {
        self.connections.write().await.remove(&id);
    }

    /// Returns false when the connection is gone.
    pub async fn notify(&self, id: ConnectionId, notice: Notice) -> bool {
        match self.connections.read().await.get(&id) {
            Some(tx) => tx.send(notice).is_ok(),
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }
}
