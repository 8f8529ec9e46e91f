pub mod store;

use axum::{debug_handler, extract::{Path, State}, routing::get, Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::CurrentUser, AppResult, AppState};

pub use store::Message;

pub fn router() -> Router<AppState> {
    Router::new().route("/{user_id}", get(history))
}

#[derive(Serialize)]
pub(crate) struct ConversationResponse {
    messages: Vec<Message>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn history(
    user: CurrentUser,
    Path(peer_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<ConversationResponse>> {
    let messages = store::conversation(&db_pool, user.id, peer_id).await?;
    Ok(Json(ConversationResponse { messages }))
}
