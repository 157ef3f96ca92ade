use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum::{Display, EnumString};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::role::Role,
    specification::{Filterable, Relation, Value},
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Blocked,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UserType {
    Student,
    Instructor,
    Admin,
}

/// Users subscribed to a course: `id IN (SELECT user_id FROM course_users WHERE course_id = $n)`.
pub static USER_COURSES: Relation = Relation {
    name: "user_courses",
    key: "id",
    table: "course_users",
    owner: "user_id",
    target: "course_id",
};

/// Identity record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub full_name: String,
    pub user_status: UserStatus,
    pub user_type: UserType,
    pub phone_number: Option<String>,
    pub cpf: Option<String>,
    pub image_url: Option<String>,
    pub roles: Vec<Role>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// A freshly registered, active account holding `ROLE_STUDENT`.
    pub fn new(
        username: String,
        email: String,
        password_hash: String,
        full_name: String,
        user_type: UserType,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            full_name,
            user_status: UserStatus::Active,
            user_type,
            phone_number: None,
            cpf: None,
            image_url: None,
            roles: vec![Role::Student],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }
}

impl Filterable for User {
    fn field(&self, column: &str) -> Option<Value> {
        match column {
            "id" => Some(self.id.into()),
            "username" => Some(self.username.as_str().into()),
            "email" => Some(self.email.as_str().into()),
            "full_name" => Some(self.full_name.as_str().into()),
            "user_status" => Some(self.user_status.to_string().into()),
            "user_type" => Some(self.user_type.to_string().into()),
            "created_at" => Some(self.created_at.into()),
            "updated_at" => Some(self.updated_at.into()),
            _ => None,
        }
    }
}

/// Row as selected from `users`.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub user_status: String,
    pub user_type: String,
    pub phone_number: Option<String>,
    pub cpf: Option<String>,
    pub image_url: Option<String>,
    pub roles: Vec<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let roles = r
            .roles
            .iter()
            .map(|tag| tag.parse::<Role>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("user {} has an unknown role: {e}", r.id))?;
        Ok(Self {
            id: r.id,
            username: r.username,
            email: r.email,
            password_hash: r.password_hash,
            full_name: r.full_name,
            user_status: r.user_status.parse()?,
            user_type: r.user_type.parse()?,
            phone_number: r.phone_number,
            cpf: r.cpf,
            image_url: r.image_url,
            roles,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, roles: Vec<&str>) -> UserRow {
        let now = OffsetDateTime::now_utc();
        UserRow {
            id: Uuid::new_v4(),
            username: "lia".into(),
            email: "lia@ead.dev".into(),
            password_hash: "$argon2id$...".into(),
            full_name: "Lia Costa".into(),
            user_status: status.into(),
            user_type: "INSTRUCTOR".into(),
            phone_number: None,
            cpf: None,
            image_url: None,
            roles: roles.into_iter().map(String::from).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_converts_into_user() {
        let user = User::try_from(row("BLOCKED", vec!["ROLE_INSTRUCTOR"])).unwrap();
        assert_eq!(user.user_status, UserStatus::Blocked);
        assert_eq!(user.user_type, UserType::Instructor);
        assert_eq!(user.roles, vec![Role::Instructor]);
    }

    #[test]
    fn unknown_enum_text_is_an_error() {
        assert!(User::try_from(row("SUSPENDED", vec![])).is_err());
        assert!(User::try_from(row("ACTIVE", vec!["ROLE_ROOT"])).is_err());
    }

    #[test]
    fn password_hash_never_serializes() {
        let user = User::try_from(row("ACTIVE", vec!["ROLE_STUDENT"])).unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["user_status"], "ACTIVE");
        assert_eq!(json["roles"][0], "ROLE_STUDENT");
    }
}
