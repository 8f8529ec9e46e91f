use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::AppError;

use super::TokenKeys;

/// The authenticated caller, resolved from the `Authorization: Bearer` header.
/// Extracting this in a handler is what makes the route protected.
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    TokenKeys: FromRef<S>,
    SqlitePool: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::unauthorized("no token"))?;

        let user_id = TokenKeys::from_ref(state)
            .verify(token)
            .map_err(|_| AppError::unauthorized("invalid token"))?;

        let db_pool = SqlitePool::from_ref(state);
        let (username,): (String,) = sqlx::query_as("SELECT username FROM users WHERE id=?")
            .bind(user_id.to_string())
            .fetch_optional(&db_pool)
            .await?
            .ok_or_else(|| AppError::unauthorized("unknown user"))?;

        Ok(CurrentUser { id: user_id, username })
    }
}
