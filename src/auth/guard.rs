//! Per-route access gate.
//!
//! Each route is wrapped with [`access_gate`] through [`gated`], which layers
//! `middleware::from_fn_with_state(AccessGate::new(&state, ROLES), access_gate)`.
//! The gate authenticates the bearer token, re-reads the caller's roles from
//! the identity store and checks them against the route's role set before the
//! handler runs. Handlers then take [`CurrentUser`] to learn who is calling.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};
use tracing::warn;
use uuid::Uuid;

use super::{
    principal::{Principal, PrincipalResolver},
    role::Role,
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub const USER: &[Role] = &[Role::User];
pub const STUDENT: &[Role] = &[Role::Student];
pub const INSTRUCTOR: &[Role] = &[Role::Instructor];
pub const ADMIN: &[Role] = &[Role::Admin];

/// Middleware state: the app plus the roles a route accepts.
#[derive(Clone)]
pub struct AccessGate {
    state: AppState,
    required: &'static [Role],
}

impl AccessGate {
    pub fn new(state: &AppState, required: &'static [Role]) -> Self {
        Self {
            state: state.clone(),
            required,
        }
    }
}

/// Wraps every method in `route` with [`access_gate`] for `required`.
pub fn gated(
    route: MethodRouter<AppState>,
    state: &AppState,
    required: &'static [Role],
) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(
        AccessGate::new(state, required),
        access_gate,
    ))
}

pub async fn access_gate(
    State(gate): State<AccessGate>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let token = bearer_token(request.headers())?;
    let claims = gate.state.jwt.validate(token).map_err(|reason| {
        warn!(%reason, "invalid or expired token");
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    // Roles in the token may be stale; the store is authoritative.
    let principal = PrincipalResolver::new(gate.state.users.as_ref())
        .by_id(claims.sub)
        .await?;
    authorize(&principal, gate.required)?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

pub fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))
}

/// Passes when the caller's authorities intersect `required`.
pub fn authorize(principal: &Principal, required: &[Role]) -> AppResult<()> {
    if principal.has_any(required) {
        return Ok(());
    }
    warn!(
        user_id = %principal.user_id,
        required = ?required,
        "insufficient role"
    );
    Err(AppError::Forbidden("Forbidden".into()))
}

/// Passes only when the caller is the owner of the resource.
pub fn ensure_owner(principal: &Principal, owner_id: Uuid) -> AppResult<()> {
    if principal.user_id == owner_id {
        return Ok(());
    }
    warn!(
        user_id = %principal.user_id,
        owner_id = %owner_id,
        "access to another user's resource"
    );
    Err(AppError::Forbidden("Forbidden".into()))
}

/// The principal the access gate attached to this request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))
    }
}
