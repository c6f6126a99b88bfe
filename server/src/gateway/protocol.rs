//! JSON text frames, tagged by `"type"`, with camelCase fields.

use serde::{Deserialize, Serialize};

use crate::game::{Clocks, GameSnapshot, MoveRecord};

const DEFAULT_TIME_CONTROL: &str = "5+0";

fn default_time_control() -> String {
    DEFAULT_TIME_CONTROL.to_string()
}

/// Client → server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    JoinGame {
        game_id: String,
    },
    LeaveGame {
        game_id: String,
    },
    Move {
        game_id: String,
        from: String,
        to: String,
        #[serde(default)]
        promotion: Option<String>,
    },
    Queue {
        #[serde(default = "default_time_control", alias = "timeControl")]
        time_control_code: String,
        #[serde(default)]
        rated: bool,
    },
    RetryEngine {
        game_id: String,
    },
}

/// Server → client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
#[allow(clippy::large_enum_variant)]
pub enum ServerMessage {
    /// Full state from the receiving connection's perspective.
    Game(GameSnapshot),
    Move {
        game_id: String,
        #[serde(flatten)]
        record: MoveRecord,
        clocks: Clocks,
        last_move_at: i64,
    },
    Status {
        #[serde(skip_serializing_if = "Option::is_none")]
        game_id: Option<String>,
        message: String,
    },
}

impl ServerMessage {
    pub fn status(game_id: Option<&str>, message: impl Into<String>) -> Self {
        Self::Status {
            game_id: game_id.map(str::to_string),
            message: message.into(),
        }
    }
}
