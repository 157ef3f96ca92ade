use axum::{
    extract::State,
    routing::{get, put},
    Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{inbox, UpdateNotificationRequest, NOTIFICATION_PAGE_DEFAULTS, NOTIFICATION_SORT_FIELDS},
    repo_types::Notification,
};
use crate::{
    auth::guard::{ensure_owner, gated, CurrentUser, STUDENT},
    error::{AppError, AppResult},
    extract::{Json, Path, Query},
    specification::{Page, PageParams},
    state::AppState,
};

pub fn notification_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/users/:user_id/notifications",
            gated(get(list_notifications), state, STUDENT),
        )
        .route(
            "/users/:user_id/notifications/:notification_id",
            gated(put(update_notification), state, STUDENT),
        )
}

#[instrument(skip(state, caller))]
pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Page<Notification>>> {
    ensure_owner(&caller, user_id)?;
    let pageable = params.resolve(NOTIFICATION_PAGE_DEFAULTS, NOTIFICATION_SORT_FIELDS)?;
    let page = state
        .notifications
        .list_notifications(&inbox(user_id), &pageable)
        .await?;
    Ok(Json(page))
}

#[instrument(skip(state, caller, payload))]
pub async fn update_notification(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path((user_id, notification_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateNotificationRequest>,
) -> AppResult<Json<Notification>> {
    ensure_owner(&caller, user_id)?;
    let mut notification = state
        .notifications
        .find_notification(notification_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".into()))?;

    notification.notification_status = payload.notification_status;
    state.notifications.update_notification(&notification).await?;

    info!(
        %user_id,
        %notification_id,
        status = %notification.notification_status,
        "notification updated"
    );
    Ok(Json(notification))
}
