pub mod converters;
pub mod fen;
pub mod game;
pub mod rules;
pub mod san;
pub mod types;
pub mod uci;

pub use converters::{format_square, parse_promotion, parse_square};
pub use fen::{FenError, STARTING_FEN};
pub use game::Game;
pub use rules::{apply_move, is_insufficient_material, AppliedMove, IllegalMoveError, MoveRequest};
pub use types::{DrawReason, Side};
pub use uci::{format_uci_move, normalize_castling, parse_uci_move};
