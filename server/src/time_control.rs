use serde::Serialize;

const FALLBACK_MINUTES: u32 = 3;
const FALLBACK_INCREMENT: u32 = 0;

/// Clock rules for a game, parsed from a `"M+I"` code (minutes + seconds increment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeControl {
    pub code: String,
    pub initial_seconds: u32,
    pub increment_seconds: u32,
}

impl TimeControl {
    /// Parse `code`. Missing or unparsable parts fall back to 3 minutes and
    /// no increment, so this never fails.
    pub fn parse(code: &str) -> Self {
        let code = code.trim();
        let mut parts = code.splitn(2, '+');
        let minutes = parts
            .next()
            .and_then(|m| m.trim().parse::<u32>().ok())
            .unwrap_or(FALLBACK_MINUTES);
        let increment = parts
            .next()
            .and_then(|i| i.trim().parse::<u32>().ok())
            .unwrap_or(FALLBACK_INCREMENT);

        Self {
            code: code.to_string(),
            initial_seconds: minutes.saturating_mul(60),
            increment_seconds: increment,
        }
    }

    pub fn initial_ms(&self) -> i64 {
        i64::from(self.initial_seconds) * 1000
    }

    pub fn increment_ms(&self) -> i64 {
        i64::from(self.increment_seconds) * 1000
    }
}
