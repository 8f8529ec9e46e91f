mod guard;
mod password;
mod token;

use axum::{debug_handler, extract::State, http::StatusCode, response::{IntoResponse, Response}, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{AppError, AppResult, AppState};

pub use guard::CurrentUser;
pub use token::TokenKeys;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}

#[derive(Deserialize)]
pub(crate) struct SignupRequest {
    username: String,
    email: String,
    password: String,
    avatar_url: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
pub(crate) struct AuthResponse {
    id: Uuid,
    username: String,
    email: String,
    token: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn signup(
    State(db_pool): State<SqlitePool>,
    State(keys): State<TokenKeys>,

    Json(SignupRequest { username, email, password, avatar_url }): Json<SignupRequest>,
) -> AppResult<Response> {
    if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
        return Err(AppError::bad_request("please fill in all fields"));
    }

    if sqlx::query_as::<_, ()>("SELECT 1 FROM users WHERE email=?")
        .bind(&email)
        .fetch_optional(&db_pool)
        .await?
        .is_some()
    {
        return Err(AppError::conflict("email already in use"));
    }

    if sqlx::query_as::<_, ()>("SELECT 1 FROM users WHERE username=?")
        .bind(&username)
        .fetch_optional(&db_pool)
        .await?
        .is_some()
    {
        return Err(AppError::conflict("username already in use"));
    }

    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO users (id,username,email,password_hash,avatar_url) VALUES (?,?,?,?,?)")
        .bind(id.to_string())
        .bind(&username)
        .bind(&email)
        .bind(password::hash(&password)?)
        .bind(&avatar_url)
        .execute(&db_pool)
        .await?;

    tracing::info!(%id, %username, "new user signed up");

    let token = keys.issue(id)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { id, username, email, token })).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    State(keys): State<TokenKeys>,

    Json(LoginRequest { email, password }): Json<LoginRequest>,
) -> AppResult<Response> {
    // one indistinct message whether the email or the password was wrong
    let sorry = || AppError::unauthorized("incorrect email or password");

    let Some((id, username, password_hash)): Option<(String, String, String)> =
        sqlx::query_as("SELECT id,username,password_hash FROM users WHERE email=?")
            .bind(&email)
            .fetch_optional(&db_pool)
            .await?
    else {
        return Err(sorry());
    };

    if !password::verify(&password, &password_hash) {
        return Err(sorry());
    }

    let id = Uuid::parse_str(&id)?;
    let token = keys.issue(id)?;
    Ok(Json(AuthResponse { id, username, email, token }).into_response())
}
