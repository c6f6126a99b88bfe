use cozy_chess::Board;
use std::collections::HashMap;

use crate::fen::{format_fen, parse_fen, position_key, FenError};
use crate::rules::{apply_move_on, AppliedMove, IllegalMoveError, MoveRequest};
use crate::types::{DrawReason, Side};

/// Current board plus the position history needed for threefold repetition.
#[derive(Debug, Clone)]
pub struct Game {
    position: Board,
    repetitions: HashMap<String, u32>,
    ply: u32,
}

impl Game {
    /// Create a new game from the standard starting position
    pub fn new() -> Self {
        Self::starting_at(Board::default())
    }

    /// Create a game from a FEN string
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        Ok(Self::starting_at(parse_fen(fen)?))
    }

    fn starting_at(position: Board) -> Self {
        let mut repetitions = HashMap::new();
        repetitions.insert(position_key(&format_fen(&position)), 1);
        Self {
            position,
            repetitions,
            ply: 0,
        }
    }

    pub fn position(&self) -> &Board {
        &self.position
    }

    pub fn to_fen(&self) -> String {
        format_fen(&self.position)
    }

    pub fn side_to_move(&self) -> Side {
        self.position.side_to_move().into()
    }

    /// Number of half-moves played since this game was created.
    pub fn ply(&self) -> u32 {
        self.ply
    }

    /// Validate and play a move. On error the game is untouched.
    pub fn play(&mut self, request: &MoveRequest) -> Result<AppliedMove, IllegalMoveError> {
        let (mut applied, after) = apply_move_on(&self.position, request)?;

        let seen = self
            .repetitions
            .entry(position_key(&applied.new_position))
            .or_insert(0);
        *seen += 1;
        if *seen >= 3 && !applied.is_checkmate && !applied.is_draw {
            applied.is_draw = true;
            applied.draw_reason = Some(DrawReason::ThreefoldRepetition);
        }

        self.position = after;
        self.ply += 1;
        Ok(applied)
    }

    /// All legal moves in UCI notation. Only scripted test engines need these.
    #[cfg(any(test, feature = "test-util"))]
    pub fn legal_moves_uci(&self) -> Vec<String> {
        use crate::rules::legal_moves;
        use crate::uci::format_uci_move;

        legal_moves(&self.position)
            .into_iter()
            .map(|mv| format_uci_move(&self.position, mv))
            .collect()
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn play_uci(game: &mut Game, uci: &str) -> AppliedMove {
        game.play(&MoveRequest::from_uci(uci).unwrap()).unwrap()
    }

    #[test]
    fn test_new_game() {
        let game = Game::new();
        assert_eq!(game.side_to_move(), Side::White);
        assert_eq!(game.legal_moves_uci().len(), 20);
        assert_eq!(game.ply(), 0);
    }

    #[test]
    fn test_illegal_move_leaves_game_untouched() {
        let mut game = Game::new();
        let before = game.to_fen();
        assert!(game.play(&MoveRequest::new("e2", "e5")).is_err());
        assert_eq!(game.to_fen(), before);
        assert_eq!(game.ply(), 0);
    }

    #[test]
    fn test_threefold_repetition() {
        let mut game = Game::new();
        let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];
        for uci in shuffle {
            assert!(!play_uci(&mut game, uci).is_draw);
        }
        // Second return to the start position is its third occurrence.
        for uci in &shuffle[..3] {
            assert!(!play_uci(&mut game, uci).is_draw);
        }
        let last = play_uci(&mut game, "f6g8");
        assert!(last.is_draw);
        assert_eq!(last.draw_reason, Some(DrawReason::ThreefoldRepetition));
    }

    #[test]
    fn test_fools_mate() {
        let mut game = Game::new();
        play_uci(&mut game, "f2f3");
        play_uci(&mut game, "e7e5");
        play_uci(&mut game, "g2g4");
        let mate = play_uci(&mut game, "d8h4");
        assert!(mate.is_checkmate);
        assert_eq!(mate.mover, Side::Black);
        assert!(game.legal_moves_uci().is_empty());
    }

    #[test]
    fn test_castling_reported_as_king_two_squares() {
        let mut game = Game::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        assert!(game.legal_moves_uci().contains(&"e1g1".to_string()));
        let applied = play_uci(&mut game, "e1g1");
        assert_eq!(applied.uci, "e1g1");
    }

    proptest! {
        #[test]
        fn movers_alternate_from_white(choices in proptest::collection::vec(any::<u16>(), 0..60)) {
            let mut game = Game::new();
            let mut expected = Side::White;
            for choice in choices {
                let moves = game.legal_moves_uci();
                if moves.is_empty() {
                    break;
                }
                let uci = &moves[choice as usize % moves.len()];
                let applied = game.play(&MoveRequest::from_uci(uci).unwrap()).unwrap();
                prop_assert_eq!(applied.mover, expected);
                expected = expected.opposite();
                prop_assert_eq!(game.side_to_move(), expected);
            }
        }
    }
}
