use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use chess::MoveRequest;
use engine::{EngineReply, EngineRequest, SearchService};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Instant};
use tracing::Instrument;

use super::commands::{GameCommand, GameError};
use super::events::GameEvent;
use super::player::ENGINE_PLAYER_ID;
use super::snapshot::GameSnapshot;
use super::state::{GameState, MoveOutcome};

/// Everything the actor talks to outside its own state.
pub(crate) struct ActorContext {
    pub engine: Arc<dyn SearchService>,
    /// Engine replies come back through the mailbox. Weak, so the actor
    /// still stops once every handle is gone.
    pub self_tx: mpsc::WeakSender<GameCommand>,
    pub event_tx: broadcast::Sender<GameEvent>,
    pub finished_tx: mpsc::UnboundedSender<GameSnapshot>,
}

/// The main game actor loop.
/// Owns all mutable state and processes one command at a time, which is what
/// serializes moves for a game.
pub(crate) async fn run_game_actor(
    state: GameState,
    cmd_rx: mpsc::Receiver<GameCommand>,
    ctx: ActorContext,
) {
    let game_id = state.id.clone();
    run_game_actor_inner(state, cmd_rx, ctx)
        .instrument(tracing::info_span!("game", id = %game_id))
        .await;
}

async fn run_game_actor_inner(
    mut state: GameState,
    mut cmd_rx: mpsc::Receiver<GameCommand>,
    ctx: ActorContext,
) {
    tracing::info!(
        white = %state.white.username,
        black = %state.black.username,
        time_control = %state.time_control.code,
        "Game actor started"
    );

    maybe_trigger_engine(&mut state, &ctx);

    loop {
        let deadline = state.flag_deadline();
        let flag = time::sleep_until(
            deadline
                .unwrap_or_else(|| Instant::now() + Duration::from_secs(86_400)),
        );

        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    tracing::info!("Every handle dropped");
                    break;
                };
                if handle_command(&mut state, cmd, &ctx).is_break() {
                    break;
                }
            }

            _ = flag, if deadline.is_some() => {
                if state.check_flag_at(Instant::now()) {
                    after_finish(&mut state, &ctx);
                }
            }
        }
    }

    tracing::info!("Game actor exited");
}

fn handle_command(
    state: &mut GameState,
    cmd: GameCommand,
    ctx: &ActorContext,
) -> ControlFlow<()> {
    match cmd {
        GameCommand::ApplyMove {
            player_id,
            request,
            reply,
        } => {
            tracing::debug!(player = %player_id, from = %request.from, to = %request.to, "Move request");
            let result = state.apply_move_at(&player_id, &request, Instant::now());
            match result {
                Ok(outcome) => {
                    publish(state, outcome, ctx);
                    let _ = reply.send(Ok(state.snapshot()));
                    maybe_trigger_engine(state, ctx);
                }
                Err(e) => {
                    tracing::debug!("Move rejected: {}", e);
                    let _ = reply.send(Err(e));
                }
            }
        }
        GameCommand::EngineMove { ply, result } => {
            if ply != state.ply() || !state.is_active() {
                tracing::debug!(ply, "Dropping stale engine reply");
                return ControlFlow::Continue(());
            }
            state.engine_pending = false;
            match result.map_err(|e| e.to_string()).and_then(|reply| apply_engine_reply(state, &reply)) {
                Ok(outcome) => {
                    publish(state, outcome, ctx);
                    maybe_trigger_engine(state, ctx);
                }
                Err(reason) => {
                    tracing::warn!("Engine move failed: {}", reason);
                    let _ = ctx.event_tx.send(GameEvent::Status(format!(
                        "Engine move failed: {reason}, please retry"
                    )));
                }
            }
        }
        GameCommand::RetryEngine { player_id, reply } => {
            let result = if !state.is_active() {
                Err(GameError::GameFinished)
            } else if state.side_of(&player_id).is_none() {
                Err(GameError::NotParticipant)
            } else {
                Ok(maybe_trigger_engine(state, ctx))
            };
            let _ = reply.send(result);
        }
        GameCommand::GetSnapshot { reply } => {
            let _ = reply.send(state.snapshot());
        }
        GameCommand::Subscribe { reply } => {
            let _ = reply.send((state.snapshot(), ctx.event_tx.subscribe()));
        }
        GameCommand::Shutdown => {
            tracing::info!("Game actor shutting down");
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}

fn apply_engine_reply(state: &mut GameState, reply: &EngineReply) -> Result<MoveOutcome, String> {
    let request = MoveRequest::from_uci(&reply.best_move_uci).map_err(|e| e.to_string())?;
    tracing::debug!(mv = %reply.best_move_uci, score = %reply.score_display(), "Engine move");
    state
        .apply_move_at(ENGINE_PLAYER_ID, &request, Instant::now())
        .map_err(|e| e.to_string())
}

/// Broadcast what an accepted move request did.
fn publish(state: &mut GameState, outcome: MoveOutcome, ctx: &ActorContext) {
    if let MoveOutcome::Played(record) = outcome {
        let _ = ctx.event_tx.send(GameEvent::MoveMade {
            record,
            clocks: state.clocks(),
            last_move_at: state.last_move_at_ms(),
        });
    }
    if !state.is_active() {
        after_finish(state, ctx);
    }
}

fn after_finish(state: &mut GameState, ctx: &ActorContext) {
    if state.reported {
        return;
    }
    state.reported = true;
    let snapshot = state.snapshot();
    let _ = ctx.event_tx.send(GameEvent::Finished(snapshot.clone()));
    if ctx.finished_tx.send(snapshot).is_err() {
        tracing::warn!("Reaper is gone; finished game will not be recorded");
    }
}

/// Start an off-actor engine search when the engine is on move and none is
/// in flight. The reply is re-enqueued as [`GameCommand::EngineMove`].
fn maybe_trigger_engine(state: &mut GameState, ctx: &ActorContext) -> bool {
    if !state.engine_to_move() || state.engine_pending {
        return false;
    }
    let Some(level) = state.engine_level else {
        return false;
    };

    state.engine_pending = true;
    let ply = state.ply();
    let request = EngineRequest::for_level(state.fen(), level);
    let engine = ctx.engine.clone();
    let self_tx = ctx.self_tx.clone();
    tracing::debug!(ply, level, "Engine search started");

    tokio::spawn(
        async move {
            let result = engine.search(request).await;
            if let Some(tx) = self_tx.upgrade() {
                let _ = tx.send(GameCommand::EngineMove { ply, result }).await;
            }
        }
        .in_current_span(),
    );
    true
}
