//! UCI move notation. Engines speak king-two-squares castling (`e1g1`),
//! cozy-chess encodes castling as king-onto-rook (`e1h1`).

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

use crate::converters::{format_piece, format_square, parse_promotion, parse_square};
use crate::rules::IllegalMoveError;

/// Convert a king-two-squares castling move into the king-onto-rook form
/// cozy-chess expects. Anything else is returned untouched.
pub fn normalize_castling(board: &Board, mv: Move) -> Move {
    if board.piece_on(mv.from) != Some(Piece::King) || mv.promotion.is_some() {
        return mv;
    }

    let target = match (mv.from.file(), mv.from.rank(), mv.to.file(), mv.to.rank()) {
        (File::E, Rank::First, File::G, Rank::First) => Square::new(File::H, Rank::First),
        (File::E, Rank::First, File::C, Rank::First) => Square::new(File::A, Rank::First),
        (File::E, Rank::Eighth, File::G, Rank::Eighth) => Square::new(File::H, Rank::Eighth),
        (File::E, Rank::Eighth, File::C, Rank::Eighth) => Square::new(File::A, Rank::Eighth),
        _ => return mv,
    };

    let converted = Move {
        from: mv.from,
        to: target,
        promotion: None,
    };
    if board.is_legal(converted) {
        converted
    } else {
        mv
    }
}

/// True when `mv` is a castling move in cozy-chess form (king onto its own rook).
pub fn is_castling(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.to) == Some(board.side_to_move())
}

/// The square the king lands on, for castling moves; `mv.to` otherwise.
pub fn king_destination(board: &Board, mv: Move) -> Square {
    if !is_castling(board, mv) {
        return mv.to;
    }
    let file = if mv.to.file() as usize > mv.from.file() as usize {
        File::G
    } else {
        File::C
    };
    Square::new(file, mv.from.rank())
}

/// Format a move in standard UCI notation (`e2e4`, `e7e8q`, `e1g1`).
/// Castling is written king-two-squares, the way engines expect it.
pub fn format_uci_move(board: &Board, mv: Move) -> String {
    let to = king_destination(board, mv);
    let mut s = format!("{}{}", format_square(mv.from), format_square(to));
    if let Some(promo) = mv.promotion {
        s.push(format_piece(promo));
    }
    s
}

/// Parse a UCI move string without reference to a position.
pub fn parse_uci_move(s: &str) -> Result<Move, IllegalMoveError> {
    let s = s.trim();
    if !(4..=5).contains(&s.len()) || !s.is_ascii() {
        return Err(IllegalMoveError::NotLegal(s.to_string()));
    }

    let from = parse_square(&s[0..2])?;
    let to = parse_square(&s[2..4])?;
    let promotion = match s.get(4..5) {
        Some(p) => Some(parse_promotion(p)?),
        None => None,
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn castling_ready() -> Board {
        "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1"
            .parse()
            .unwrap()
    }

    #[test]
    fn test_normalize_kingside_castling() {
        let board = castling_ready();
        let mv = parse_uci_move("e1g1").unwrap();
        let normalized = normalize_castling(&board, mv);
        assert_eq!(normalized.to, Square::new(File::H, Rank::First));
        assert!(board.is_legal(normalized));
    }

    #[test]
    fn test_normalize_leaves_ordinary_moves() {
        let board = Board::default();
        let mv = parse_uci_move("e2e4").unwrap();
        assert_eq!(normalize_castling(&board, mv), mv);
    }

    #[test]
    fn test_format_castling_as_king_destination() {
        let board = castling_ready();
        let mv = normalize_castling(&board, parse_uci_move("e1c1").unwrap());
        assert_eq!(format_uci_move(&board, mv), "e1c1");
    }

    #[test]
    fn test_parse_uci_move_with_promotion() {
        let mv = parse_uci_move("e7e8q").unwrap();
        assert_eq!(mv.promotion, Some(Piece::Queen));
        assert!(parse_uci_move("e7e8k").is_err());
        assert!(parse_uci_move("e2").is_err());
    }
}
