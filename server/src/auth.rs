//! Bearer-token identity. Tokens are HS256 JWTs carrying `{sub, username, exp}`.

use std::time::Duration;

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::game::{unix_now_ms, Player, ENGINE_PLAYER_ID};
use crate::persistence::{PersistenceError, PlayerRepository};
use crate::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub exp: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("Identity '{0}' is reserved")]
    ReservedIdentity(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, sub: &str, username: &str, ttl: Duration) -> Result<String, AuthError> {
        let claims = Claims {
            sub: sub.to_string(),
            username: username.to_string(),
            exp: (unix_now_ms() as u64) / 1000 + ttl.as_secs(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// `Authorization: Bearer <jwt>`, else `?token=<jwt>` (browsers cannot set
/// headers on a WebSocket upgrade).
fn token_from_parts(parts: &Parts) -> Option<String> {
    let header = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")));
    if let Some(token) = header {
        return Some(token.trim().to_string());
    }

    Query::<TokenQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
}

/// Turn verified claims into a seat. Durable players are provisioned on
/// first sight and carry their stored rating.
pub async fn resolve_player(state: &AppState, claims: &Claims) -> Result<Player, AuthError> {
    if claims.sub.is_empty() || claims.sub == ENGINE_PLAYER_ID {
        return Err(AuthError::ReservedIdentity(claims.sub.clone()));
    }

    let player = Player::new(&claims.sub, &claims.username, state.config.default_rating);
    if !player.is_durable() {
        return Ok(player);
    }

    let record = state
        .players
        .ensure_player(&player.id, &player.username, state.config.default_rating)
        .await?;
    Ok(Player::new(record.player_id, record.username, record.rating))
}

pub async fn authenticate(parts: &Parts, state: &AppState) -> Result<Player, AuthError> {
    let token = token_from_parts(parts).ok_or(AuthError::MissingToken)?;
    let claims = state.jwt.verify(&token)?;
    resolve_player(state, &claims).await
}

/// Authenticated player, for handlers that require one.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Player);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(AuthUser).map_err(|e| {
            tracing::debug!("Rejected request: {}", e);
            AppError::from(e)
        })
    }
}
