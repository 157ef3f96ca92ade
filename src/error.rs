use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

/// A single rejected input field.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    /// `Some` when `value` has more than `max` characters, the unit `VARCHAR(n)` counts in.
    pub fn max_len(field: &'static str, value: &str, max: usize) -> Option<Self> {
        (value.chars().count() > max)
            .then(|| Self::new(field, format!("must be at most {max} characters")))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing, invalid or expired credentials.
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated, but lacking the role or not owning the resource.
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    Internal(anyhow::Error),
}

/// A store refused a write because it would break a uniqueness rule.
/// Travels inside `anyhow::Error` and surfaces as [`AppError::Conflict`].
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct Duplicate(pub String);

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<Duplicate>() {
            Ok(Duplicate(message)) => AppError::Conflict(message),
            Err(e) => AppError::Internal(e),
        }
    }
}

impl AppError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    /// `Ok` when no field was rejected.
    pub fn check(errors: Vec<FieldError>) -> AppResult<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::Validation(errors))
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: u16,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors) = match self {
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                ("Internal server error".to_string(), Vec::new())
            }
            AppError::Validation(errors) => ("Validation failed".to_string(), errors),
            other => (other.to_string(), Vec::new()),
        };
        let body = ErrorBody {
            status: status.as_u16(),
            message,
            errors,
        };
        (status, Json(body)).into_response()
    }
}
