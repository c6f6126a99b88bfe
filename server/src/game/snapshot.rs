use chess::{DrawReason, Side};
use serde::Serialize;

use super::player::Player;
use crate::time_control::TimeControl;

/// Complete, immutable view of a game.
/// Sent to clients on join, on finish, and after every accepted move request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub id: String,
    pub white: Player,
    pub black: Player,
    pub time_control: TimeControl,
    pub rated: bool,
    pub fen: String,
    pub pgn: String,
    pub moves: Vec<MoveRecord>,
    /// `'w'` or `'b'`.
    pub turn: char,
    pub clocks: Clocks,
    /// Unix epoch milliseconds.
    pub last_move_at: i64,
    pub status: GameStatus,
    pub result: Option<String>,
    pub termination: Option<Termination>,
    pub engine_level: Option<u8>,
    pub engine_thinking: bool,
    pub created_at: i64,
    pub finished_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perspective: Option<Perspective>,
}

impl GameSnapshot {
    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }

    pub fn side_of(&self, player_id: &str) -> Option<Side> {
        if self.white.id == player_id {
            Some(Side::White)
        } else if self.black.id == player_id {
            Some(Side::Black)
        } else {
            None
        }
    }

    pub fn perspective_for(&self, player_id: &str) -> Perspective {
        match self.side_of(player_id) {
            Some(Side::White) => Perspective::White,
            Some(Side::Black) => Perspective::Black,
            None => Perspective::Spectator,
        }
    }

    /// The same snapshot as seen by `player_id`.
    pub fn for_viewer(mut self, player_id: &str) -> Self {
        self.perspective = Some(self.perspective_for(player_id));
        self
    }
}

/// One accepted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub san: String,
    pub uci: String,
    pub from: String,
    pub to: String,
    pub resulting_position: String,
    /// 1-indexed.
    pub ply_number: u32,
    pub mover: Side,
}

/// Remaining time per side in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Clocks {
    pub white: i64,
    pub black: i64,
}

impl Clocks {
    pub fn get(&self, side: Side) -> i64 {
        match side {
            Side::White => self.white,
            Side::Black => self.black,
        }
    }

    pub fn set(&mut self, side: Side, ms: i64) {
        match side {
            Side::White => self.white = ms,
            Side::Black => self.black = ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Active,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Perspective {
    White,
    Black,
    Spectator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Termination {
    Checkmate,
    Stalemate,
    FiftyMoveRule,
    InsufficientMaterial,
    ThreefoldRepetition,
    TimeForfeit,
}

impl Termination {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checkmate => "checkmate",
            Self::Stalemate => "stalemate",
            Self::FiftyMoveRule => "fiftyMoveRule",
            Self::InsufficientMaterial => "insufficientMaterial",
            Self::ThreefoldRepetition => "threefoldRepetition",
            Self::TimeForfeit => "timeForfeit",
        }
    }
}

impl From<DrawReason> for Termination {
    fn from(reason: DrawReason) -> Self {
        match reason {
            DrawReason::Stalemate => Self::Stalemate,
            DrawReason::FiftyMoveRule => Self::FiftyMoveRule,
            DrawReason::InsufficientMaterial => Self::InsufficientMaterial,
            DrawReason::ThreefoldRepetition => Self::ThreefoldRepetition,
        }
    }
}

/// How a finished game ended. `winner` is `None` for draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub winner: Option<Side>,
    pub termination: Termination,
}

impl Outcome {
    /// `1-0`, `0-1`, `1/2-1/2`, with a ` (time)` suffix for forfeits.
    pub fn result_code(&self) -> String {
        let score = match self.winner {
            Some(Side::White) => "1-0",
            Some(Side::Black) => "0-1",
            None => "1/2-1/2",
        };
        if self.termination == Termination::TimeForfeit {
            format!("{score} (time)")
        } else {
            score.to_string()
        }
    }
}

/// Numbered movetext: `1. e4 e5 2. Nf3`.
pub fn movetext(moves: &[MoveRecord]) -> String {
    let mut out = String::new();
    for (i, mv) in moves.iter().enumerate() {
        if !out.is_empty() {
            out.push(' ');
        }
        if i % 2 == 0 {
            out.push_str(&format!("{}. ", i / 2 + 1));
        }
        out.push_str(&mv.san);
    }
    out
}
