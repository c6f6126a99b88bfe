use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Instrument};

use super::connection::Connection;
use super::protocol::ServerMessage;
use crate::auth::AuthUser;
use crate::game::Player;
use crate::AppState;

/// `GET /ws`. The token is checked before the upgrade, so unauthenticated
/// clients get a plain 401.
pub async fn ws_handler(
    State(state): State<AppState>,
    AuthUser(player): AuthUser,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_socket(socket, state, player))
}

async fn run_socket(socket: WebSocket, state: AppState, player: Player) {
    let (conn_id, mut notices) = state.connections.register().await;
    let span = tracing::info_span!("conn", id = conn_id, user = %player.id);

    async move {
        let (mut sink, mut stream) = socket.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerMessage>();

        let writer = tokio::spawn(
            async move {
                while let Some(message) = outbound_rx.recv().await {
                    let text = match serde_json::to_string(&message) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to encode frame: {}", e);
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
            }
            .in_current_span(),
        );

        let mut conn = Connection::new(
            conn_id,
            player,
            state.games.clone(),
            state.queue.clone(),
            state.connections.clone(),
            outbound_tx,
        );
        info!("Connection opened");

        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => conn.handle_text(text.as_str()).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("Socket error: {}", e);
                        break;
                    }
                },
                Some(notice) = notices.recv() => conn.handle_notice(notice).await,
            }
        }

        conn.close().await;
        writer.abort();
        info!("Connection closed");
    }
    .instrument(span)
    .await
}
