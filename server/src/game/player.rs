use serde::{Deserialize, Serialize};

pub const ENGINE_PLAYER_ID: &str = "engine";
pub const ENGINE_RATING: i32 = 2600;
const GUEST_PREFIX: &str = "guest";

/// A seat at the board: a signed-in player, a guest, or the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub username: String,
    pub rating: i32,
}

impl Player {
    pub fn new(id: impl Into<String>, username: impl Into<String>, rating: i32) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            rating,
        }
    }

    pub fn engine(level: u8) -> Self {
        Self::new(ENGINE_PLAYER_ID, format!("Stockfish {level}"), ENGINE_RATING)
    }

    pub fn is_engine(&self) -> bool {
        self.id == ENGINE_PLAYER_ID
    }

    pub fn is_guest(&self) -> bool {
        self.id.starts_with(GUEST_PREFIX)
    }

    /// Whether this identity gets a `players` row and recorded games.
    pub fn is_durable(&self) -> bool {
        !self.id.is_empty() && !self.is_guest() && !self.is_engine()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durability() {
        assert!(Player::new("u-42", "kim", 1500).is_durable());
        assert!(!Player::new("guest-7", "Guest", 1500).is_durable());
        assert!(!Player::new("", "nobody", 1500).is_durable());
        assert!(!Player::engine(4).is_durable());
    }

    #[test]
    fn test_engine_player() {
        let engine = Player::engine(6);
        assert_eq!(engine.username, "Stockfish 6");
        assert_eq!(engine.rating, 2600);
        assert!(engine.is_engine());
    }
}
