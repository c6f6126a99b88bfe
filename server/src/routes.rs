//! HTTP surface. Real-time play goes over `/ws`; these routes cover game
//! creation against the engine, analysis and lookups.

use axum::extract::{Path, Query, State};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use engine::EngineRequest;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::game::{GameError, GameSnapshot};
use crate::gateway::ws_handler;
use crate::persistence::{FinishedGameRepository, GameSummary};
use crate::AppState;

const DEFAULT_AI_LEVEL: u8 = 4;
const DEFAULT_TIME_CONTROL: &str = "5+0";
const DEFAULT_ANALYSIS_DEPTH: u8 = 12;
const MAX_ANALYSIS_DEPTH: u8 = 30;
const DEFAULT_HISTORY_LIMIT: u32 = 20;
const MAX_HISTORY_LIMIT: u32 = 100;

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .route("/api/match/ai", post(create_ai_match))
        .route("/api/analysis/evaluate", post(evaluate))
        .route("/api/games/{game_id}", get(get_game))
        .route("/api/history", get(history))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            tracing::warn!("Invalid CORS origin '{}', allowing any", origin);
            layer.allow_origin(Any)
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiMatchRequest {
    #[serde(default = "default_ai_level")]
    pub level: u8,
    #[serde(default = "default_time_control")]
    pub time_control: String,
}

fn default_ai_level() -> u8 {
    DEFAULT_AI_LEVEL
}

fn default_time_control() -> String {
    DEFAULT_TIME_CONTROL.to_string()
}

async fn create_ai_match(
    State(state): State<AppState>,
    AuthUser(player): AuthUser,
    Json(body): Json<AiMatchRequest>,
) -> AppResult<Json<GameSnapshot>> {
    let viewer = player.id.clone();
    let game = state
        .games
        .create_ai_game(player, body.level, &body.time_control)
        .await?;
    tracing::info!(game = %game.id, player = %viewer, level = ?game.engine_level, "AI game created");
    Ok(Json(game.for_viewer(&viewer)))
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    #[serde(default)]
    pub fen: Option<String>,
    #[serde(default = "default_depth")]
    pub depth: u8,
}

fn default_depth() -> u8 {
    DEFAULT_ANALYSIS_DEPTH
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub best_move_uci: String,
    pub principal_variation_uci: Vec<String>,
    pub score_display: String,
}

async fn evaluate(
    State(state): State<AppState>,
    Json(body): Json<EvaluateRequest>,
) -> AppResult<Json<EvaluateResponse>> {
    let fen = body
        .fen
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::BadRequest("fen required".to_string()))?;
    chess::Game::from_fen(&fen).map_err(|e| AppError::BadRequest(format!("Invalid FEN: {e}")))?;

    let depth = body.depth.clamp(1, MAX_ANALYSIS_DEPTH);
    let reply = state.engine.search(EngineRequest::analysis(fen, depth)).await?;
    Ok(Json(EvaluateResponse {
        score_display: reply.score_display(),
        best_move_uci: reply.best_move_uci,
        principal_variation_uci: reply.principal_variation_uci,
    }))
}

async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> AppResult<Response> {
    match state.games.snapshot(&game_id).await {
        Ok(snapshot) => return Ok(Json(snapshot).into_response()),
        Err(GameError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }
    match state.finished_games.load_game(&game_id).await? {
        Some(record) => Ok(Json(record).into_response()),
        None => Err(AppError::NotFound("Game not found".to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub games: Vec<GameSummary>,
}

async fn history(
    State(state): State<AppState>,
    AuthUser(player): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<HistoryResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let games = state
        .finished_games
        .list_games_for_player(&player.id, limit)
        .await?;
    Ok(Json(HistoryResponse { games }))
}
