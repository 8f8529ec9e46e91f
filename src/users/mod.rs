use axum::{debug_handler, extract::State, routing::get, Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::CurrentUser, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_users))
}

#[derive(Serialize)]
pub(crate) struct UserSummary {
    id: Uuid,
    username: String,
    avatar_url: Option<String>,
    is_online: bool,
}

#[derive(Serialize)]
pub(crate) struct UsersResponse {
    users: Vec<UserSummary>,
}

/// Everyone except the caller; the password hash never leaves the table.
#[debug_handler(state = AppState)]
pub(crate) async fn list_users(
    user: CurrentUser,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<UsersResponse>> {
    let rows: Vec<(String, String, Option<String>, bool)> =
        sqlx::query_as("SELECT id,username,avatar_url,is_online FROM users WHERE id != ? ORDER BY username")
            .bind(user.id.to_string())
            .fetch_all(&db_pool)
            .await?;

    let mut users = Vec::with_capacity(rows.len());
    for (id, username, avatar_url, is_online) in rows {
        users.push(UserSummary {
            id: Uuid::parse_str(&id)?,
            username,
            avatar_url,
            is_online,
        });
    }

    Ok(Json(UsersResponse { users }))
}

pub(crate) async fn set_online(db_pool: &SqlitePool, user_id: Uuid, online: bool) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET is_online=? WHERE id=?")
        .bind(online)
        .bind(user_id.to_string())
        .execute(db_pool)
        .await?;

    Ok(())
}
