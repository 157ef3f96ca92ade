use serde::Deserialize;

use super::repo_types::{UserStatus, UserType};
use crate::{
    auth::services::contact_lengths,
    error::FieldError,
    specification::{PageDefaults, Predicate, Sort},
};

/// API sort names accepted by user listings.
pub const USER_SORT_FIELDS: &[(&str, &'static str)] = &[
    ("id", "id"),
    ("username", "username"),
    ("email", "email"),
    ("full_name", "full_name"),
    ("user_status", "user_status"),
    ("user_type", "user_type"),
    ("created_at", "created_at"),
    ("updated_at", "updated_at"),
];

pub const USER_PAGE_DEFAULTS: PageDefaults = PageDefaults {
    size: 5,
    sort: Some(Sort::asc("id")),
};

/// `?user_type=&user_status=&email=&full_name=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub user_type: Option<UserType>,
    pub user_status: Option<UserStatus>,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

impl UserFilter {
    pub fn to_predicate(&self) -> Predicate {
        Predicate::all([
            Predicate::eq_opt("user_type", self.user_type.map(|t| t.to_string())),
            Predicate::eq_opt("user_status", self.user_status.map(|s| s.to_string())),
            Predicate::like_opt("email", self.email.as_deref()),
            Predicate::like_opt("full_name", self.full_name.as_deref()),
        ])
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.full_name.trim().is_empty() {
            errors.push(FieldError::new("full_name", "must not be blank"));
        }
        errors.extend(FieldError::max_len("full_name", self.full_name.trim(), 150));
        errors.extend(contact_lengths(self.phone_number.as_deref(), self.cpf.as_deref()));
        errors
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub password: String,
}

impl UpdatePasswordRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if !(6..=20).contains(&self.password.chars().count()) {
            errors.push(FieldError::new("password", "must be 6 to 20 characters"));
        }
        errors
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateImageRequest {
    pub image_url: String,
}

impl UpdateImageRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.image_url.trim().is_empty() {
            errors.push(FieldError::new("image_url", "must not be blank"));
        }
        errors
    }
}
