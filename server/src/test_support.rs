//! Shared fixtures for in-crate tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use engine::{EngineError, EngineReply, EngineRequest, Score, SearchService};

use crate::config::ServerConfig;
use crate::game::GameSnapshot;
use crate::persistence::sqlite::Database;
use crate::persistence::ResultSink;
use crate::AppState;

pub const TEST_SECRET: &str = "test-secret";

/// Plays the first legal move after failing `failures` times.
pub struct ScriptedEngine {
    failures: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn failing(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            failures: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchService for ScriptedEngine {
    async fn search(&self, request: EngineRequest) -> Result<EngineReply, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(EngineError::Timeout);
        }
        let game = chess::Game::from_fen(&request.fen)
            .map_err(|e| EngineError::Failure(e.to_string()))?;
        let best = game
            .legal_moves_uci()
            .into_iter()
            .next()
            .ok_or(EngineError::NoLegalMove)?;
        Ok(EngineReply {
            best_move_uci: best.clone(),
            principal_variation_uci: vec![best],
            score: Some(Score::Centipawns(25)),
        })
    }
}

/// Remembers every game it is handed.
#[derive(Default)]
pub struct RecordingSink {
    games: Mutex<Vec<GameSnapshot>>,
}

impl RecordingSink {
    pub fn recorded(&self) -> Vec<GameSnapshot> {
        self.games.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn record(&self, game: &GameSnapshot) {
        self.games.lock().unwrap().push(game.clone());
    }
}

/// Full application state over an in-memory database.
pub async fn test_state(engine: Arc<dyn SearchService>) -> AppState {
    let config = ServerConfig {
        jwt_secret: TEST_SECRET.to_string(),
        ..ServerConfig::default()
    };
    let db = Database::new_in_memory().await.unwrap();
    AppState::new(config, &db, engine)
}

pub fn token(state: &AppState, sub: &str, username: &str) -> String {
    state
        .jwt
        .issue(sub, username, Duration::from_secs(3600))
        .unwrap()
}

/// Poll `check` until it holds, for up to two seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition never became true");
}
