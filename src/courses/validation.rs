use tracing::warn;

use super::dto::CourseRequest;
use crate::{
    error::{AppError, AppResult, FieldError},
    users::{repo::UserStore, repo_types::UserType},
};

/// Field checks plus the instructor lookup.
pub async fn validate_course(request: &CourseRequest, users: &dyn UserStore) -> AppResult<()> {
    let mut errors = Vec::new();
    if request.name.trim().is_empty() {
        errors.push(FieldError::new("name", "must not be blank"));
    }
    errors.extend(FieldError::max_len("name", request.name.trim(), 150));
    if request.description.trim().is_empty() {
        errors.push(FieldError::new("description", "must not be blank"));
    }
    errors.extend(FieldError::max_len("description", request.description.trim(), 250));

    match users.find_user(request.user_instructor).await? {
        None => {
            warn!(user_instructor = %request.user_instructor, "instructor not found");
            errors.push(FieldError::new("user_instructor", "Instructor not found"));
        }
        Some(user) if !matches!(user.user_type, UserType::Instructor | UserType::Admin) => {
            warn!(user_instructor = %user.id, user_type = %user.user_type, "not an instructor");
            errors.push(FieldError::new(
                "user_instructor",
                "User must be INSTRUCTOR or ADMIN",
            ));
        }
        Some(_) => {}
    }

    AppError::check(errors)
}
