use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{dto::SignupRequest, password::hash_password};
use crate::{
    error::{AppError, AppResult, FieldError},
    users::{
        repo::UserStore,
        repo_types::{User, UserType},
    },
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// One error per offending field.
pub fn validate_signup(req: &SignupRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let username_len = req.username.chars().count();
    if !(4..=50).contains(&username_len) {
        errors.push(FieldError::new("username", "must be 4 to 50 characters"));
    } else if req.username.chars().any(char::is_whitespace) {
        errors.push(FieldError::new("username", "must not contain whitespace"));
    }
    if !is_valid_email(&req.email) {
        errors.push(FieldError::new("email", "Invalid email"));
    } else {
        errors.extend(FieldError::max_len("email", &req.email, 255));
    }
    if !(6..=20).contains(&req.password.chars().count()) {
        errors.push(FieldError::new("password", "must be 6 to 20 characters"));
    }
    if req.full_name.trim().is_empty() {
        errors.push(FieldError::new("full_name", "must not be blank"));
    }
    errors.extend(FieldError::max_len("full_name", req.full_name.trim(), 150));
    errors.extend(contact_lengths(req.phone_number.as_deref(), req.cpf.as_deref()));
    errors
}

/// `phone_number` and `cpf` share the `VARCHAR(20)` limit.
pub(crate) fn contact_lengths(phone_number: Option<&str>, cpf: Option<&str>) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if let Some(phone) = phone_number {
        errors.extend(FieldError::max_len("phone_number", phone, 20));
    }
    if let Some(cpf) = cpf {
        errors.extend(FieldError::max_len("cpf", cpf, 20));
    }
    errors
}

/// Creates an ACTIVE student account.
pub async fn register(users: &dyn UserStore, mut req: SignupRequest) -> AppResult<User> {
    req.email = req.email.trim().to_lowercase();
    AppError::check(validate_signup(&req))?;

    if users.username_exists(&req.username).await? {
        warn!(username = %req.username, "username already taken");
        return Err(AppError::Conflict("Username is already taken".into()));
    }
    if users.email_exists(&req.email).await? {
        warn!(email = %req.email, "email already registered");
        return Err(AppError::Conflict("Email is already taken".into()));
    }

    let mut user = User::new(
        req.username,
        req.email,
        hash_password(&req.password)?,
        req.full_name.trim().to_string(),
        UserType::Student,
    );
    user.phone_number = req.phone_number;
    user.cpf = req.cpf;
    users.insert_user(&user).await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn request(username: &str, email: &str) -> SignupRequest {
        SignupRequest {
            username: username.into(),
            email: email.into(),
            password: "hunter22".into(),
            full_name: "Nina Prado".into(),
            phone_number: None,
            cpf: None,
        }
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("nina@ead.dev"));
        assert!(!is_valid_email("nina@ead"));
        assert!(!is_valid_email("ni na@ead.dev"));
    }

    #[test]
    fn username_rules() {
        assert_eq!(validate_signup(&request("abc", "a@b.io"))[0].field, "username");
        assert_eq!(validate_signup(&request("ni na", "a@b.io"))[0].field, "username");
        assert!(validate_signup(&request("nina", "a@b.io")).is_empty());
    }

    #[test]
    fn field_lengths_follow_the_schema() {
        let long_email = format!("{}@ead.dev", "n".repeat(248));
        let mut req = request("nina", &long_email);
        req.full_name = "N".repeat(151);
        req.phone_number = Some("9".repeat(21));
        req.cpf = Some("1".repeat(20));
        let fields: Vec<_> = validate_signup(&req).iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["email", "full_name", "phone_number"]);

        let at_limit = format!("{}@ead.dev", "n".repeat(247));
        assert!(validate_signup(&request("nina", &at_limit)).is_empty());
    }

    #[tokio::test]
    async fn register_creates_student_with_hashed_password() {
        let store = MemoryStore::default();
        let user = register(&store, request("nina", " Nina@EAD.dev ")).await.unwrap();
        assert_eq!(user.email, "nina@ead.dev");
        assert_eq!(user.user_type, UserType::Student);
        assert_ne!(user.password_hash, "hunter22");
        assert!(store.find_user(user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_username_or_email_conflicts() {
        let store = MemoryStore::default();
        register(&store, request("nina", "nina@ead.dev")).await.unwrap();
        assert!(matches!(
            register(&store, request("nina", "other@ead.dev")).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            register(&store, request("otavio", "NINA@ead.dev")).await,
            Err(AppError::Conflict(_))
        ));
    }
}
