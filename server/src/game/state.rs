use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chess::{Game, MoveRequest, Side};
use tokio::time::Instant;

use super::commands::GameError;
use super::player::Player;
use super::snapshot::{
    movetext, Clocks, GameSnapshot, GameStatus, MoveRecord, Outcome, Termination,
};
use crate::time_control::TimeControl;

/// Current unix time in milliseconds.
pub fn unix_now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// What an accepted move request did to the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MoveOutcome {
    Played(MoveRecord),
    /// The mover's clock had run out; the submitted move was discarded.
    TimeForfeit,
}

/// All mutable state of a single game. Owned exclusively by its actor.
pub(crate) struct GameState {
    pub id: String,
    pub white: Player,
    pub black: Player,
    pub time_control: TimeControl,
    pub rated: bool,
    pub engine_level: Option<u8>,
    pub engine_pending: bool,
    /// The finished snapshot has been handed to the reaper.
    pub reported: bool,
    game: Game,
    moves: Vec<MoveRecord>,
    clocks: Clocks,
    status: GameStatus,
    outcome: Option<Outcome>,
    // Monotonic clock times, mapped to wall time through the epoch pair.
    epoch: Instant,
    epoch_unix_ms: i64,
    last_move_at: Instant,
    finished_at: Option<Instant>,
}

impl GameState {
    pub fn new(
        id: String,
        white: Player,
        black: Player,
        time_control: TimeControl,
        rated: bool,
        engine_level: Option<u8>,
        now: Instant,
    ) -> Self {
        let initial = time_control.initial_ms();
        Self {
            id,
            white,
            black,
            time_control,
            rated,
            engine_level,
            engine_pending: false,
            reported: false,
            game: Game::new(),
            moves: Vec::new(),
            clocks: Clocks {
                white: initial,
                black: initial,
            },
            status: GameStatus::Active,
            outcome: None,
            epoch: now,
            epoch_unix_ms: unix_now_ms(),
            last_move_at: now,
            finished_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == GameStatus::Active
    }

    pub fn ply(&self) -> u32 {
        self.game.ply()
    }

    pub fn fen(&self) -> String {
        self.game.to_fen()
    }

    pub fn turn(&self) -> Side {
        self.game.side_to_move()
    }

    pub fn player(&self, side: Side) -> &Player {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }

    /// White is checked first.
    pub fn side_of(&self, player_id: &str) -> Option<Side> {
        if self.white.id == player_id {
            Some(Side::White)
        } else if self.black.id == player_id {
            Some(Side::Black)
        } else {
            None
        }
    }

    /// The engine sits on the side to move of a game still in progress.
    pub fn engine_to_move(&self) -> bool {
        self.is_active() && self.engine_level.is_some() && self.player(self.turn()).is_engine()
    }

    /// When the side to move runs out of time if it does nothing.
    pub fn flag_deadline(&self) -> Option<Instant> {
        if !self.is_active() {
            return None;
        }
        let remaining = self.clocks.get(self.turn()).max(0) as u64;
        Some(self.last_move_at + Duration::from_millis(remaining))
    }

    /// Validate and apply one move request at time `now`.
    ///
    /// Checks run in a fixed order: finished, participant, turn, clock,
    /// legality. Errors leave the state untouched. A mover whose clock has
    /// run out loses on time even if the submitted move is legal.
    pub fn apply_move_at(
        &mut self,
        player_id: &str,
        request: &MoveRequest,
        now: Instant,
    ) -> Result<MoveOutcome, GameError> {
        if !self.is_active() {
            return Err(GameError::GameFinished);
        }
        let side = self.side_of(player_id).ok_or(GameError::NotParticipant)?;
        if side != self.turn() {
            return Err(GameError::NotYourTurn);
        }

        let elapsed = now.saturating_duration_since(self.last_move_at).as_millis() as i64;
        let remaining = self.clocks.get(side) - elapsed;
        if remaining <= 0 {
            self.forfeit_on_time(side, now);
            return Ok(MoveOutcome::TimeForfeit);
        }

        let applied = self
            .game
            .play(request)
            .map_err(|e| GameError::IllegalMove(e.to_string()))?;

        let record = MoveRecord {
            san: applied.san,
            uci: applied.uci,
            from: applied.from,
            to: applied.to,
            resulting_position: applied.new_position,
            ply_number: self.game.ply(),
            mover: applied.mover,
        };
        self.moves.push(record.clone());
        self.clocks
            .set(side, remaining + self.time_control.increment_ms());
        self.last_move_at = now;

        if applied.is_checkmate {
            self.finish(
                Outcome {
                    winner: Some(side),
                    termination: Termination::Checkmate,
                },
                now,
            );
        } else if let Some(reason) = applied.draw_reason.filter(|_| applied.is_draw) {
            self.finish(
                Outcome {
                    winner: None,
                    termination: reason.into(),
                },
                now,
            );
        }

        tracing::debug!(ply = record.ply_number, san = %record.san, "Move applied");
        Ok(MoveOutcome::Played(record))
    }

    /// Finish the game if the side to move has run out of time by `now`.
    pub fn check_flag_at(&mut self, now: Instant) -> bool {
        if !self.is_active() {
            return false;
        }
        let side = self.turn();
        let elapsed = now.saturating_duration_since(self.last_move_at).as_millis() as i64;
        if self.clocks.get(side) - elapsed > 0 {
            return false;
        }
        self.forfeit_on_time(side, now);
        true
    }

    fn forfeit_on_time(&mut self, loser: Side, now: Instant) {
        tracing::info!(side = %loser, "Flag fell");
        self.clocks.set(loser, 0);
        self.finish(
            Outcome {
                winner: Some(loser.opposite()),
                termination: Termination::TimeForfeit,
            },
            now,
        );
    }

    fn finish(&mut self, outcome: Outcome, now: Instant) {
        tracing::info!(result = %outcome.result_code(), "Game finished");
        self.status = GameStatus::Finished;
        self.outcome = Some(outcome);
        self.finished_at = Some(now);
        self.engine_pending = false;
    }

    fn wall_ms(&self, at: Instant) -> i64 {
        self.epoch_unix_ms + at.saturating_duration_since(self.epoch).as_millis() as i64
    }

    pub fn clocks(&self) -> Clocks {
        self.clocks
    }

    pub fn last_move_at_ms(&self) -> i64 {
        self.wall_ms(self.last_move_at)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            id: self.id.clone(),
            white: self.white.clone(),
            black: self.black.clone(),
            time_control: self.time_control.clone(),
            rated: self.rated,
            fen: self.fen(),
            pgn: movetext(&self.moves),
            moves: self.moves.clone(),
            turn: self.turn().letter(),
            clocks: self.clocks,
            last_move_at: self.last_move_at_ms(),
            status: self.status,
            result: self.outcome.map(|o| o.result_code()),
            termination: self.outcome.map(|o| o.termination),
            engine_level: self.engine_level,
            engine_thinking: self.engine_pending,
            created_at: self.epoch_unix_ms,
            finished_at: self.finished_at.map(|at| self.wall_ms(at)),
            perspective: None,
        }
    }
}
