use cozy_chess::Board;

/// Standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string into a Board
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    let parts: Vec<&str> = fen.split_whitespace().collect();
    if parts.len() < 4 {
        return Err(FenError::InvalidFormat);
    }

    fen.trim().parse().map_err(|_| FenError::InvalidBoardLayout)
}

/// Format a Board as a FEN string
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

/// The part of a FEN that identifies a position for repetition purposes:
/// placement, side to move, castling rights and en-passant target.
pub fn position_key(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

#[derive(Debug, thiserror::Error)]
pub enum FenError {
    #[error("Invalid FEN format")]
    InvalidFormat,
    #[error("Invalid board layout")]
    InvalidBoardLayout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_fen_roundtrip() {
        let board = parse_fen(STARTING_FEN).unwrap();
        assert_eq!(format_fen(&board), STARTING_FEN);
        assert_eq!(format_fen(&Board::default()), STARTING_FEN);
    }

    #[test]
    fn test_rejects_truncated_fen() {
        assert!(matches!(parse_fen("8/8/8/8"), Err(FenError::InvalidFormat)));
        assert!(parse_fen("not a fen at all").is_err());
    }

    #[test]
    fn test_position_key_ignores_counters() {
        let a = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let b = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 4 3";
        assert_eq!(position_key(a), position_key(b));
    }
}
