use cozy_chess::{Board, Move, Piece};

use crate::converters::{file_to_char, format_piece_upper, format_square, rank_to_char};
use crate::rules::legal_moves;
use crate::uci::{is_castling, king_destination};

/// Format a legal move as Standard Algebraic Notation.
///
/// `board` is the position before the move. The caller guarantees `mv` is legal
/// there (cozy-chess castling encoding).
pub fn format_san(board: &Board, mv: Move) -> String {
    let mut san = if is_castling(board, mv) {
        let kingside = king_destination(board, mv).file() as usize > mv.from.file() as usize;
        if kingside { "O-O" } else { "O-O-O" }.to_string()
    } else {
        format_piece_move(board, mv)
    };

    let mut after = board.clone();
    after.play_unchecked(mv);
    if !after.checkers().is_empty() {
        san.push(if legal_moves(&after).is_empty() { '#' } else { '+' });
    }
    san
}

fn format_piece_move(board: &Board, mv: Move) -> String {
    let Some(piece) = board.piece_on(mv.from) else {
        return format!("{}{}", format_square(mv.from), format_square(mv.to));
    };

    // En passant lands on an empty square, so detect it by the file change.
    let is_capture = board.piece_on(mv.to).is_some()
        || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

    let mut san = String::new();
    if piece == Piece::Pawn {
        if is_capture {
            san.push(file_to_char(mv.from.file()));
        }
    } else {
        san.push(format_piece_upper(piece));
        san.push_str(&disambiguation(board, mv, piece));
    }

    if is_capture {
        san.push('x');
    }
    san.push_str(&format_square(mv.to));

    if let Some(promo) = mv.promotion {
        san.push('=');
        san.push(format_piece_upper(promo));
    }
    san
}

fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    let rivals: Vec<Move> = legal_moves(board)
        .into_iter()
        .filter(|other| {
            other.to == mv.to
                && other.from != mv.from
                && board.piece_on(other.from) == Some(piece)
        })
        .collect();

    if rivals.is_empty() {
        return String::new();
    }

    let shares_file = rivals.iter().any(|r| r.from.file() == mv.from.file());
    let shares_rank = rivals.iter().any(|r| r.from.rank() == mv.from.rank());

    match (shares_file, shares_rank) {
        (false, _) => file_to_char(mv.from.file()).to_string(),
        (true, false) => rank_to_char(mv.from.rank()).to_string(),
        (true, true) => format_square(mv.from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uci::{normalize_castling, parse_uci_move};

    fn san_of(fen: &str, uci: &str) -> String {
        let board: Board = fen.parse().unwrap();
        let mv = normalize_castling(&board, parse_uci_move(uci).unwrap());
        assert!(board.is_legal(mv), "{uci} should be legal in {fen}");
        format_san(&board, mv)
    }

    #[test]
    fn test_pawn_and_piece_moves() {
        let start = crate::fen::STARTING_FEN;
        assert_eq!(san_of(start, "e2e4"), "e4");
        assert_eq!(san_of(start, "g1f3"), "Nf3");
    }

    #[test]
    fn test_capture_and_en_passant() {
        assert_eq!(
            san_of(
                "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2",
                "e4d5"
            ),
            "exd5"
        );
        assert_eq!(
            san_of(
                "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
                "e5f6"
            ),
            "exf6"
        );
    }

    #[test]
    fn test_castling() {
        let fen = "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1";
        assert_eq!(san_of(fen, "e1g1"), "O-O");
        assert_eq!(san_of(fen, "e1c1"), "O-O-O");
    }

    #[test]
    fn test_file_disambiguation() {
        // Knights on b1 and f1 can both reach d2.
        let fen = "4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1";
        assert_eq!(san_of(fen, "b1d2"), "Nbd2");
    }

    #[test]
    fn test_rank_disambiguation() {
        // Rooks on a1 and a5 can both reach a3.
        let fen = "4k3/8/8/R7/8/8/8/R3K3 w - - 0 1";
        assert_eq!(san_of(fen, "a1a3"), "R1a3");
    }

    #[test]
    fn test_promotion_with_check() {
        let fen = "4k3/1P6/8/8/8/8/8/4K3 w - - 0 1";
        assert_eq!(san_of(fen, "b7b8q"), "b8=Q+");
        assert_eq!(san_of(fen, "b7b8n"), "b8=N");
    }

    #[test]
    fn test_checkmate_suffix() {
        let fen = "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2";
        assert_eq!(san_of(fen, "d8h4"), "Qh4#");
    }
}
