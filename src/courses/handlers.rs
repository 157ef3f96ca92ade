use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Router,
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CourseFilter, CourseRequest, SubscriptionRequest, COURSE_PAGE_DEFAULTS, COURSE_SORT_FIELDS},
    repo_types::Course,
    validation::validate_course,
};
use crate::{
    auth::guard::{ensure_owner, gated, CurrentUser, INSTRUCTOR, STUDENT},
    error::{AppError, AppResult},
    extract::{Json, Path, Query},
    notifications::repo_types::Notification,
    specification::{Page, PageParams, Predicate},
    state::AppState,
    users::{
        dto::{UserFilter, USER_PAGE_DEFAULTS, USER_SORT_FIELDS},
        handlers::load_user,
        repo_types::{User, UserStatus, USER_COURSES},
    },
};

pub fn course_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/courses",
            gated(post(create_course), state, INSTRUCTOR)
                .merge(gated(get(list_courses), state, STUDENT)),
        )
        .route(
            "/courses/:course_id",
            gated(get(get_course), state, STUDENT)
                .merge(gated(put(update_course), state, INSTRUCTOR))
                .merge(gated(delete(delete_course), state, INSTRUCTOR)),
        )
        .route(
            "/courses/:course_id/users",
            gated(get(list_course_users), state, INSTRUCTOR),
        )
        .route(
            "/courses/:course_id/users/subscription",
            gated(post(subscribe_user), state, STUDENT),
        )
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub course_id: Uuid,
    pub user_id: Uuid,
}

async fn load_course(state: &AppState, course_id: Uuid) -> AppResult<Course> {
    state
        .courses
        .find_course(course_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".into()))
}

#[instrument(skip(state, payload))]
pub async fn create_course(
    State(state): State<AppState>,
    Json(payload): Json<CourseRequest>,
) -> AppResult<(StatusCode, Json<Course>)> {
    validate_course(&payload, state.users.as_ref()).await?;
    let course = payload.into_course();
    state.courses.insert_course(&course).await?;

    info!(course_id = %course.id, instructor = %course.user_instructor, "course created");
    Ok((StatusCode::CREATED, Json(course)))
}

#[instrument(skip(state, payload))]
pub async fn update_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<CourseRequest>,
) -> AppResult<Json<Course>> {
    let mut course = load_course(&state, course_id).await?;
    validate_course(&payload, state.users.as_ref()).await?;
    payload.apply_to(&mut course);
    state.courses.update_course(&course).await?;

    info!(%course_id, "course updated");
    Ok(Json(course))
}

#[instrument(skip(state))]
pub async fn delete_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if !state.courses.delete_course(course_id).await? {
        return Err(AppError::NotFound("Course not found".into()));
    }
    info!(%course_id, "course deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_courses(
    State(state): State<AppState>,
    Query(filter): Query<CourseFilter>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Page<Course>>> {
    let pageable = params.resolve(COURSE_PAGE_DEFAULTS, COURSE_SORT_FIELDS)?;
    let page = state
        .courses
        .list_courses(&filter.to_predicate(), &pageable)
        .await?;
    Ok(Json(page))
}

#[instrument(skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<Course>> {
    Ok(Json(load_course(&state, course_id).await?))
}

#[instrument(skip(state))]
pub async fn list_course_users(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Query(filter): Query<UserFilter>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Page<User>>> {
    load_course(&state, course_id).await?;
    let pageable = params.resolve(USER_PAGE_DEFAULTS, USER_SORT_FIELDS)?;
    let spec = filter
        .to_predicate()
        .and(Predicate::related(&USER_COURSES, course_id));
    let page = state.users.list_users(&spec, &pageable).await?;
    Ok(Json(page))
}

#[instrument(skip(state, caller, payload))]
pub async fn subscribe_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<SubscriptionRequest>,
) -> AppResult<(StatusCode, Json<SubscriptionResponse>)> {
    ensure_owner(&caller, payload.user_id)?;
    let course = load_course(&state, course_id).await?;
    let user = load_user(&state, payload.user_id).await?;

    if state.courses.is_subscribed(course.id, user.id).await? {
        warn!(course_id = %course.id, user_id = %user.id, "already subscribed");
        return Err(AppError::Conflict("Subscription already exists".into()));
    }
    if user.user_status == UserStatus::Blocked {
        warn!(user_id = %user.id, "blocked user tried to subscribe");
        return Err(AppError::Conflict("User is blocked".into()));
    }

    state.courses.subscribe(course.id, user.id).await?;
    info!(course_id = %course.id, user_id = %user.id, "user subscribed");

    let welcome = Notification::new(
        user.id,
        format!("Welcome to the course: {}", course.name),
        format!("{} your enrollment was successful!", user.full_name),
    );
    if let Err(e) = state.notifications.insert_notification(&welcome).await {
        // the subscription stands even if the welcome message is lost
        error!(error = ?e, user_id = %user.id, "welcome notification failed");
    }

    Ok((
        StatusCode::CREATED,
        Json(SubscriptionResponse {
            course_id: course.id,
            user_id: user.id,
        }),
    ))
}
