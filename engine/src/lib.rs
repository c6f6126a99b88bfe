pub mod bridge;
pub mod pool;
pub mod process;
pub mod strength;
pub mod uci;

pub use bridge::{BridgeConfig, BridgeState, EngineBridge};
pub use pool::EnginePool;
pub use strength::Strength;
pub use uci::{UciError, UciMessage};

use async_trait::async_trait;

/// Anything that can answer a search request. The game store only sees this
/// seam, so tests can substitute a scripted engine.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, request: EngineRequest) -> Result<EngineReply, EngineError>;
}

/// A position to search and how hard to search it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRequest {
    pub fen: String,
    pub limit: SearchLimit,
    /// `None` leaves the engine at full strength.
    pub strength: Option<Strength>,
}

impl EngineRequest {
    /// Request for a computer opponent at the given level.
    pub fn for_level(fen: impl Into<String>, level: u8) -> Self {
        let strength = Strength::for_level(level);
        Self {
            fen: fen.into(),
            limit: SearchLimit::Depth(strength.depth),
            strength: Some(strength),
        }
    }

    /// Full-strength analysis to a fixed depth.
    pub fn analysis(fen: impl Into<String>, depth: u8) -> Self {
        Self {
            fen: fen.into(),
            limit: SearchLimit::Depth(depth),
            strength: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchLimit {
    Depth(u8),
    MoveTime(u64), // milliseconds
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReply {
    pub best_move_uci: String,
    pub principal_variation_uci: Vec<String>,
    pub score: Option<Score>,
}

impl EngineReply {
    pub fn score_display(&self) -> String {
        self.score.map(|s| s.display()).unwrap_or_default()
    }
}

/// The parts of an `info` line a search keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineInfo {
    pub depth: Option<u8>,
    pub score: Option<Score>,
    pub pv: Vec<String>, // Principal variation, UCI notation
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i8), // Negative for being mated
}

impl Score {
    /// `+0.35`, `-1.20`, `+M3`, `-M2`.
    pub fn display(self) -> String {
        match self {
            Score::Centipawns(cp) => format!("{:+.2}", cp as f64 / 100.0),
            Score::Mate(n) if n < 0 => format!("-M{}", -(n as i32)),
            Score::Mate(n) => format!("+M{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("engine is busy with another search")]
    Busy,
    #[error("engine search timed out")]
    Timeout,
    #[error("no engine could be started")]
    Unavailable,
    #[error("engine found no legal move")]
    NoLegalMove,
    #[error("engine failure: {0}")]
    Failure(String),
    #[error("engine returned an invalid move: {0}")]
    InvalidMove(String),
}
