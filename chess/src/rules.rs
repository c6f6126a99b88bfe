//! Move validation and terminal-state detection.
//!
//! [`apply_move`] is a pure function of a FEN position and a wire move: it either
//! returns the resulting position with its SAN and terminal flags, or says why
//! the move is illegal. Threefold repetition needs history and is handled by
//! [`crate::Game`].

use cozy_chess::{Board, Color, Move, Piece, Rank};
use serde::{Deserialize, Serialize};

use crate::converters::{format_square, parse_promotion, parse_square};
use crate::fen::{format_fen, parse_fen};
use crate::san::format_san;
use crate::types::{DrawReason, Side};
use crate::uci::{format_uci_move, king_destination, normalize_castling};

/// A move as it arrives over the wire: `{from: "e7", to: "e8", promotion: "q"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
}

impl MoveRequest {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, promotion: impl Into<String>) -> Self {
        self.promotion = Some(promotion.into());
        self
    }

    /// Split a UCI move (`e7e8q`) into a wire request.
    pub fn from_uci(uci: &str) -> Result<Self, IllegalMoveError> {
        let uci = uci.trim();
        if !(4..=5).contains(&uci.len()) || !uci.is_ascii() {
            return Err(IllegalMoveError::NotLegal(uci.to_string()));
        }
        Ok(Self {
            from: uci[0..2].to_string(),
            to: uci[2..4].to_string(),
            promotion: uci.get(4..5).map(str::to_string),
        })
    }
}

/// Outcome of a legal move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    pub san: String,
    /// Standard UCI form, castling written king-two-squares.
    pub uci: String,
    pub from: String,
    /// King's destination for castling.
    pub to: String,
    pub mover: Side,
    pub new_position: String,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_draw: bool,
    pub draw_reason: Option<DrawReason>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IllegalMoveError {
    #[error("Invalid position: {0}")]
    InvalidPosition(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion piece: {0}")]
    InvalidPromotion(String),
    #[error("No piece on {0}")]
    NoPieceOnSquare(String),
    #[error("Piece on {0} does not belong to the side to move")]
    WrongColor(String),
    #[error("Illegal move: {0}")]
    NotLegal(String),
}

/// Validate `request` against `fen` and return the resulting position.
pub fn apply_move(fen: &str, request: &MoveRequest) -> Result<AppliedMove, IllegalMoveError> {
    let board =
        parse_fen(fen).map_err(|e| IllegalMoveError::InvalidPosition(e.to_string()))?;
    apply_move_on(&board, request).map(|(applied, _)| applied)
}

/// Same as [`apply_move`] on an already parsed board; also hands back the new board.
pub(crate) fn apply_move_on(
    board: &Board,
    request: &MoveRequest,
) -> Result<(AppliedMove, Board), IllegalMoveError> {
    let mv = resolve_move(board, request)?;

    let mover = Side::from(board.side_to_move());
    let san = format_san(board, mv);
    let uci = format_uci_move(board, mv);
    let to = format_square(king_destination(board, mv));

    let mut after = board.clone();
    after.play_unchecked(mv);

    let is_check = !after.checkers().is_empty();
    let no_moves = legal_moves(&after).is_empty();
    let is_checkmate = is_check && no_moves;
    let draw_reason = if is_checkmate {
        None
    } else {
        draw_reason(&after, no_moves)
    };

    let applied = AppliedMove {
        san,
        uci,
        from: format_square(mv.from),
        to,
        mover,
        new_position: format_fen(&after),
        is_check,
        is_checkmate,
        is_draw: draw_reason.is_some(),
        draw_reason,
    };
    Ok((applied, after))
}

/// Turn a wire request into a legal cozy-chess move, or explain why it is not one.
fn resolve_move(board: &Board, request: &MoveRequest) -> Result<Move, IllegalMoveError> {
    let from = parse_square(&request.from)?;
    let to = parse_square(&request.to)?;

    let piece = board
        .piece_on(from)
        .ok_or_else(|| IllegalMoveError::NoPieceOnSquare(request.from.clone()))?;
    if board.color_on(from) != Some(board.side_to_move()) {
        return Err(IllegalMoveError::WrongColor(request.from.clone()));
    }

    let last_rank = match board.side_to_move() {
        Color::White => Rank::Eighth,
        Color::Black => Rank::First,
    };
    let promotion = if piece == Piece::Pawn && to.rank() == last_rank {
        match request.promotion.as_deref() {
            Some(p) => Some(parse_promotion(p)?),
            None => Some(Piece::Queen),
        }
    } else {
        None
    };

    let mv = normalize_castling(
        board,
        Move {
            from,
            to,
            promotion,
        },
    );
    if !board.is_legal(mv) {
        return Err(IllegalMoveError::NotLegal(format!(
            "{}{}",
            request.from, request.to
        )));
    }
    Ok(mv)
}

/// Draw rules that can be decided from the position alone.
fn draw_reason(board: &Board, no_moves: bool) -> Option<DrawReason> {
    if no_moves {
        Some(DrawReason::Stalemate)
    } else if is_insufficient_material(board) {
        Some(DrawReason::InsufficientMaterial)
    } else if board.halfmove_clock() >= 100 {
        Some(DrawReason::FiftyMoveRule)
    } else {
        None
    }
}

/// Neither side can possibly deliver mate: bare kings, a single minor piece,
/// or only bishops that all stand on the same square colour.
pub fn is_insufficient_material(board: &Board) -> bool {
    let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !heavy.is_empty() {
        return false;
    }

    let knights = board.pieces(Piece::Knight);
    let bishops = board.pieces(Piece::Bishop);
    if knights.len() + bishops.len() <= 1 {
        return true;
    }
    if !knights.is_empty() {
        return false;
    }

    let mut light = 0;
    let mut dark = 0;
    for sq in bishops {
        if (sq.file() as usize + sq.rank() as usize) % 2 == 1 {
            light += 1;
        } else {
            dark += 1;
        }
    }
    light == 0 || dark == 0
}

pub(crate) fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::STARTING_FEN;

    #[test]
    fn test_opening_move() {
        let applied = apply_move(STARTING_FEN, &MoveRequest::new("e2", "e4")).unwrap();
        assert_eq!(applied.san, "e4");
        assert_eq!(applied.mover, Side::White);
        assert!(applied.new_position.contains(" b "));
        assert!(!applied.is_check && !applied.is_checkmate && !applied.is_draw);
    }

    #[test]
    fn test_rejects_empty_square() {
        let err = apply_move(STARTING_FEN, &MoveRequest::new("e4", "e5")).unwrap_err();
        assert_eq!(err, IllegalMoveError::NoPieceOnSquare("e4".into()));
    }

    #[test]
    fn test_rejects_wrong_color() {
        let err = apply_move(STARTING_FEN, &MoveRequest::new("e7", "e5")).unwrap_err();
        assert_eq!(err, IllegalMoveError::WrongColor("e7".into()));
    }

    #[test]
    fn test_rejects_unreachable_destination() {
        let err = apply_move(STARTING_FEN, &MoveRequest::new("e2", "e5")).unwrap_err();
        assert!(matches!(err, IllegalMoveError::NotLegal(_)));
    }

    #[test]
    fn test_rejects_pinned_piece() {
        // The e2 knight is pinned against the king by the e8 rook.
        let fen = "4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1";
        let err = apply_move(fen, &MoveRequest::new("e2", "c3")).unwrap_err();
        assert!(matches!(err, IllegalMoveError::NotLegal(_)));
    }

    #[test]
    fn test_rejects_invalid_position_and_square() {
        assert!(matches!(
            apply_move("garbage", &MoveRequest::new("e2", "e4")),
            Err(IllegalMoveError::InvalidPosition(_))
        ));
        assert!(matches!(
            apply_move(STARTING_FEN, &MoveRequest::new("z9", "e4")),
            Err(IllegalMoveError::InvalidSquare(_))
        ));
    }

    #[test]
    fn test_promotion_defaults_to_queen() {
        let fen = "8/P6k/8/8/8/8/8/K7 w - - 0 1";
        let applied = apply_move(fen, &MoveRequest::new("a7", "a8")).unwrap();
        assert_eq!(applied.san, "a8=Q");
        assert_eq!(applied.uci, "a7a8q");
    }

    #[test]
    fn test_underpromotion_and_bad_promotion_letter() {
        let fen = "8/P6k/8/8/8/8/8/K7 w - - 0 1";
        let applied =
            apply_move(fen, &MoveRequest::new("a7", "a8").with_promotion("n")).unwrap();
        assert_eq!(applied.san, "a8=N");

        let err = apply_move(fen, &MoveRequest::new("a7", "a8").with_promotion("k")).unwrap_err();
        assert!(matches!(err, IllegalMoveError::InvalidPromotion(_)));
    }

    #[test]
    fn test_stray_promotion_is_ignored() {
        let applied =
            apply_move(STARTING_FEN, &MoveRequest::new("e2", "e4").with_promotion("q")).unwrap();
        assert_eq!(applied.uci, "e2e4");
    }

    #[test]
    fn test_castling_both_encodings() {
        let fen = "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1";
        for to in ["g1", "h1"] {
            let applied = apply_move(fen, &MoveRequest::new("e1", to)).unwrap();
            assert_eq!(applied.san, "O-O");
            assert_eq!(applied.to, "g1");
            assert!(applied.new_position.starts_with("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R4RK1"));
        }
    }

    #[test]
    fn test_en_passant_capture() {
        let fen = "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3";
        let applied = apply_move(fen, &MoveRequest::new("e5", "f6")).unwrap();
        assert_eq!(applied.san, "exf6");
        assert!(applied.new_position.starts_with("rnbqkbnr/ppp1p1pp/5P2/3p4/"));
    }

    #[test]
    fn test_checkmate_detected() {
        let fen = "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2";
        let applied = apply_move(fen, &MoveRequest::new("d8", "h4")).unwrap();
        assert!(applied.is_check);
        assert!(applied.is_checkmate);
        assert!(!applied.is_draw);
        assert_eq!(applied.san, "Qh4#");
    }

    #[test]
    fn test_stalemate_detected() {
        // After Qc7 black's king on a8 has no moves and is not in check.
        let fen = "k7/8/1K6/8/8/8/8/2Q5 w - - 0 1";
        let applied = apply_move(fen, &MoveRequest::new("c1", "c7")).unwrap();
        assert!(!applied.is_check);
        assert!(applied.is_draw);
        assert_eq!(applied.draw_reason, Some(DrawReason::Stalemate));
    }

    #[test]
    fn test_insufficient_material_after_capture() {
        // Kxb2 leaves bare kings.
        let fen = "8/8/8/8/8/8/1n6/K6k w - - 0 1";
        let applied = apply_move(fen, &MoveRequest::new("a1", "b2")).unwrap();
        assert_eq!(applied.draw_reason, Some(DrawReason::InsufficientMaterial));
    }

    #[test]
    fn test_fifty_move_rule() {
        let fen = "4k3/8/8/8/8/8/R7/4K3 w - - 99 80";
        let applied = apply_move(fen, &MoveRequest::new("a2", "a3")).unwrap();
        assert_eq!(applied.draw_reason, Some(DrawReason::FiftyMoveRule));
    }

    #[test]
    fn test_insufficient_material_cases() {
        let opposite_bishops: Board = "4k3/8/8/8/8/8/8/2B1KB2 w - - 0 1".parse().unwrap();
        // c1 and f1 are on opposite colours.
        assert!(!is_insufficient_material(&opposite_bishops));

        let bishops_same: Board = "4kb2/8/8/8/8/8/8/2B1K3 w - - 0 1".parse().unwrap();
        // c1 is dark, f8 is dark.
        assert!(is_insufficient_material(&bishops_same));

        let two_knights: Board = "4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1".parse().unwrap();
        assert!(!is_insufficient_material(&two_knights));
    }

    #[test]
    fn test_move_request_from_uci() {
        let req = MoveRequest::from_uci("e7e8q").unwrap();
        assert_eq!(req, MoveRequest::new("e7", "e8").with_promotion("q"));
        assert!(MoveRequest::from_uci("e7").is_err());
    }
}
