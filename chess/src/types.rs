//! Project-owned side and draw-rule types.
//! cozy-chess types stay an implementation detail of this crate.

use serde::{Deserialize, Serialize};

/// One of the two players' colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }

    /// FEN side-to-move letter.
    pub fn letter(self) -> char {
        match self {
            Self::White => 'w',
            Self::Black => 'b',
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

impl From<cozy_chess::Color> for Side {
    fn from(c: cozy_chess::Color) -> Self {
        match c {
            cozy_chess::Color::White => Self::White,
            cozy_chess::Color::Black => Self::Black,
        }
    }
}

impl From<Side> for cozy_chess::Color {
    fn from(s: Side) -> Self {
        match s {
            Side::White => Self::White,
            Side::Black => Self::Black,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a position is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DrawReason {
    Stalemate,
    FiftyMoveRule,
    InsufficientMaterial,
    ThreefoldRepetition,
}

impl DrawReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stalemate => "stalemate",
            Self::FiftyMoveRule => "fiftyMoveRule",
            Self::InsufficientMaterial => "insufficientMaterial",
            Self::ThreefoldRepetition => "threefoldRepetition",
        }
    }
}
