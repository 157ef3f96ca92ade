use axum::{
    extract::State,
    routing::{delete, get, put},
    Router,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        UpdateImageRequest, UpdatePasswordRequest, UpdateUserRequest, UserFilter,
        USER_PAGE_DEFAULTS, USER_SORT_FIELDS,
    },
    repo_types::User,
};
use crate::{
    auth::{
        guard::{ensure_owner, gated, CurrentUser, ADMIN, STUDENT, USER},
        password::{hash_password, verify_password},
    },
    error::{AppError, AppResult},
    extract::{Json, Path, Query},
    specification::{Page, PageParams},
    state::AppState,
};

pub fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/users", gated(get(list_users), state, ADMIN))
        .route(
            "/users/:user_id",
            gated(get(get_user), state, STUDENT)
                .merge(gated(put(update_user), state, USER))
                .merge(gated(delete(delete_user), state, ADMIN)),
        )
        .route("/users/:user_id/password", gated(put(update_password), state, USER))
        .route("/users/:user_id/image", gated(put(update_image), state, USER))
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

pub(crate) async fn load_user(state: &AppState, user_id: Uuid) -> AppResult<User> {
    state
        .users
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Page<User>>> {
    let pageable = params.resolve(USER_PAGE_DEFAULTS, USER_SORT_FIELDS)?;
    let page = state
        .users
        .list_users(&filter.to_predicate(), &pageable)
        .await?;
    Ok(Json(page))
}

#[instrument(skip(state, caller))]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    ensure_owner(&caller, user_id)?;
    Ok(Json(load_user(&state, user_id).await?))
}

#[instrument(skip(state, caller, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    ensure_owner(&caller, user_id)?;
    AppError::check(payload.validate())?;

    let mut user = load_user(&state, user_id).await?;
    user.full_name = payload.full_name.trim().to_string();
    user.phone_number = payload.phone_number;
    user.cpf = payload.cpf;
    user.touch();
    state.users.update_user(&user).await?;

    info!(user_id = %user.id, "user updated");
    Ok(Json(user))
}

#[instrument(skip(state, caller, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    ensure_owner(&caller, user_id)?;
    AppError::check(payload.validate())?;

    let mut user = load_user(&state, user_id).await?;
    if !verify_password(&payload.old_password, &user.password_hash)? {
        warn!(user_id = %user.id, "old password mismatch");
        return Err(AppError::Conflict("Mismatched old password".into()));
    }
    user.password_hash = hash_password(&payload.password)?;
    user.touch();
    state.users.update_user(&user).await?;

    info!(user_id = %user.id, "password updated");
    Ok(MessageResponse::new("Password updated successfully"))
}

#[instrument(skip(state, caller, payload))]
pub async fn update_image(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateImageRequest>,
) -> AppResult<Json<User>> {
    ensure_owner(&caller, user_id)?;
    AppError::check(payload.validate())?;

    let mut user = load_user(&state, user_id).await?;
    user.image_url = Some(payload.image_url.trim().to_string());
    user.touch();
    state.users.update_user(&user).await?;

    info!(user_id = %user.id, "image updated");
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    if !state.users.delete_user(user_id).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    info!(%user_id, "user deleted");
    Ok(MessageResponse::new("User deleted successfully"))
}
