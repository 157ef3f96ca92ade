use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Router};
use tracing::{info, instrument};

use super::{
    dto::{LoginRequest, SignupRequest, TokenResponse},
    jwt::JwtKeys,
    principal::PrincipalResolver,
    services::register,
};
use crate::{error::AppResult, extract::Json, state::AppState, users::repo_types::User};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = register(state.users.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, keys, payload))]
pub async fn login(
    State(state): State<AppState>,
    State(keys): State<Arc<JwtKeys>>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let principal = PrincipalResolver::new(state.users.as_ref())
        .authenticate(payload.username.trim(), &payload.password)
        .await?;
    let token = keys.issue(&principal)?;

    info!(user_id = %principal.user_id, username = %principal.username, "user logged in");
    Ok(Json(TokenResponse::bearer(token)))
}
