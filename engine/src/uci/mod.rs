pub mod parser;

pub use parser::{parse_uci_message, UciMessage};

#[derive(Debug, thiserror::Error)]
pub enum UciError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Engine has no stdin")]
    NoStdin,
    #[error("Engine has no stdout")]
    NoStdout,
    #[error("Malformed UCI message: {0}")]
    MalformedMessage(String),
    #[error("Unknown UCI message: {0}")]
    UnknownMessage(String),
    #[error("Invalid move: {0}")]
    InvalidMove(String),
}

impl From<UciError> for crate::EngineError {
    fn from(err: UciError) -> Self {
        match err {
            UciError::InvalidMove(mv) => Self::InvalidMove(mv),
            other => Self::Failure(other.to_string()),
        }
    }
}
