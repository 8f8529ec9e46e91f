use axum::{
    debug_handler,
    extract::{ws::WebSocket, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use crate::{users, AppResult, AppState};

use super::{
    event::{ClientEvent, ServerEvent},
    pipeline, presence,
    registry::ClientHandle,
};

#[derive(Deserialize)]
pub(crate) struct WsQuery {
    token: Option<String>,
}

/// Handshake: the credential rides on the upgrade request, before any event
/// is accepted. A missing or bad token rejects the connection here, with no
/// registry entry and no broadcast.
#[debug_handler(state = AppState)]
pub(crate) async fn chat_ws(
    State(state): State<AppState>,
    Query(WsQuery { token }): Query<WsQuery>,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let Some(token) = token else {
        return Ok((StatusCode::UNAUTHORIZED, "no token").into_response());
    };

    let Ok(user_id) = state.keys.verify(&token) else {
        return Ok((StatusCode::UNAUTHORIZED, "invalid token").into_response());
    };

    let Some((username,)): Option<(String,)> =
        sqlx::query_as("SELECT username FROM users WHERE id=?")
            .bind(user_id.to_string())
            .fetch_optional(&state.db_pool)
            .await?
    else {
        return Ok((StatusCode::UNAUTHORIZED, "unknown user").into_response());
    };

    Ok(ws.on_upgrade(move |socket| lifetime(socket, state, user_id, username)))
}

/// One connection's whole life: register, go online, pump events both ways,
/// then unwind. Teardown only touches shared state if this connection still
/// owns the registry entry, so a close racing a newer session of the same
/// user stays silent.
async fn lifetime(socket: WebSocket, state: AppState, user_id: Uuid, username: String) {
    let (handle, mut outbound) = ClientHandle::new();
    let conn_id = handle.conn_id();
    let own = handle.clone();

    state.registry.register(user_id, handle).await;
    if let Err(err) = users::set_online(&state.db_pool, user_id, true).await {
        tracing::warn!(%user_id, "failed to mark online: {err}");
    }
    presence::announce(&state.registry, user_id, &username, true).await;
    tracing::info!(%user_id, %username, "connected");

    let (mut sender, mut receiver) = socket.split();

    let push_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(text.into()).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = receiver.next().await {
        let Ok(event) = serde_json::from_slice::<ClientEvent>(&frame.into_data()) else {
            continue;
        };

        let ClientEvent::SendMessage { receiver_id, content } = event;
        match pipeline::send(&state.db_pool, &state.registry, user_id, receiver_id, &content).await {
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(%user_id, %err, "send rejected");
                let _ = own.push(ServerEvent::SendFailed { reason: err.to_string() });
            }
        }
    }

    push_task.abort();

    if state.registry.deregister_if_owned(user_id, conn_id).await {
        if let Err(err) = users::set_online(&state.db_pool, user_id, false).await {
            tracing::warn!(%user_id, "failed to mark offline: {err}");
        }
        presence::announce(&state.registry, user_id, &username, false).await;
        tracing::info!(%user_id, %username, "disconnected");
    }
}
