//! A long-lived engine worker with an explicit lifecycle.
//!
//! ```text
//! Uninitialized ── search ──▶ Initializing ──▶ Ready ⇄ Searching
//!                                  │             │
//!                                  ▼             ▼
//!                               Failed       Terminated ── search ──▶ Initializing
//! ```
//!
//! One search runs at a time; a second concurrent request gets
//! [`EngineError::Busy`] instead of queueing.

use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;

use crate::process::UciProcess;
use crate::{EngineError, EngineReply, EngineRequest, SearchService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Uninitialized,
    Initializing,
    Ready,
    Searching,
    /// The process died or was killed; the next search starts a fresh one.
    Terminated,
    /// Every candidate failed its handshake.
    Failed,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Engine binaries to race at initialization.
    pub candidates: Vec<PathBuf>,
    pub init_timeout: Duration,
    pub search_timeout: Duration,
    /// How long to wait for `bestmove` after sending `stop`.
    pub stop_grace: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            candidates: vec![PathBuf::from("stockfish")],
            init_timeout: Duration::from_secs(8),
            search_timeout: Duration::from_secs(15),
            stop_grace: Duration::from_millis(500),
        }
    }
}

pub struct EngineBridge {
    id: usize,
    config: BridgeConfig,
    process: Mutex<Option<UciProcess>>,
    state: watch::Sender<BridgeState>,
}

impl EngineBridge {
    pub fn new(id: usize, config: BridgeConfig) -> Self {
        let (state, _) = watch::channel(BridgeState::Uninitialized);
        Self {
            id,
            config,
            process: Mutex::new(None),
            state,
        }
    }

    pub fn state(&self) -> BridgeState {
        *self.state.borrow()
    }

    fn set_state(&self, state: BridgeState) {
        tracing::debug!(bridge = self.id, ?state, "bridge state");
        self.state.send_replace(state);
    }

    #[tracing::instrument(skip(self, request), fields(bridge = self.id))]
    pub async fn search(&self, request: EngineRequest) -> Result<EngineReply, EngineError> {
        let mut guard = self.process.try_lock().map_err(|_| EngineError::Busy)?;

        if self.state() == BridgeState::Failed {
            return Err(EngineError::Unavailable);
        }

        if guard.is_none() {
            self.set_state(BridgeState::Initializing);
            match self.initialize().await {
                Ok(process) => *guard = Some(process),
                Err(e) => {
                    self.set_state(BridgeState::Failed);
                    return Err(e);
                }
            }
        }
        let Some(process) = guard.as_mut() else {
            return Err(EngineError::Unavailable);
        };

        self.set_state(BridgeState::Searching);
        let outcome = tokio::time::timeout(self.config.search_timeout, process.search(&request)).await;

        match outcome {
            Ok(Ok(reply)) => {
                self.set_state(BridgeState::Ready);
                Ok(reply)
            }
            // The search ended with a bestmove, so the process is still in step.
            Ok(Err(e @ (EngineError::NoLegalMove | EngineError::InvalidMove(_)))) => {
                self.set_state(BridgeState::Ready);
                Err(e)
            }
            Ok(Err(e)) => {
                tracing::warn!("Engine search failed: {}", e);
                if let Some(dead) = guard.take() {
                    dead.kill().await;
                }
                self.set_state(BridgeState::Terminated);
                Err(e)
            }
            Err(_) => {
                tracing::warn!(
                    "Engine search exceeded {:?}, sending stop",
                    self.config.search_timeout
                );
                if process.stop(self.config.stop_grace).await {
                    self.set_state(BridgeState::Ready);
                } else if let Some(stuck) = guard.take() {
                    stuck.kill().await;
                    self.set_state(BridgeState::Terminated);
                }
                Err(EngineError::Timeout)
            }
        }
    }

    /// Race every candidate; the first completed handshake wins and the rest
    /// are aborted (their children die with them).
    async fn initialize(&self) -> Result<UciProcess, EngineError> {
        let mut set = JoinSet::new();
        for path in self.config.candidates.iter().cloned() {
            let timeout = self.config.init_timeout;
            set.spawn(async move {
                let result = UciProcess::spawn(&path, timeout).await;
                (path, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(process))) => {
                    tracing::info!(bridge = self.id, "Using engine {}", process.path().display());
                    set.abort_all();
                    return Ok(process);
                }
                Ok((path, Err(e))) => {
                    tracing::warn!("Engine candidate {} failed: {}", path.display(), e);
                }
                Err(e) => tracing::warn!("Engine candidate task failed: {}", e),
            }
        }

        tracing::error!(bridge = self.id, "No engine candidate completed its handshake");
        Err(EngineError::Unavailable)
    }

    /// Quit the engine process, if any. The bridge can be used again afterwards.
    pub async fn shutdown(&self) {
        let mut guard = self.process.lock().await;
        if let Some(process) = guard.take() {
            process.shutdown().await;
            self.set_state(BridgeState::Terminated);
        }
    }
}

#[async_trait::async_trait]
impl SearchService for EngineBridge {
    async fn search(&self, request: EngineRequest) -> Result<EngineReply, EngineError> {
        EngineBridge::search(self, request).await
    }
}
