use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum::{Display, EnumString};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::specification::{Filterable, Relation, Value};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseStatus {
    InProgress,
    Concluded,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseLevel {
    Beginner,
    Intermediary,
    Advanced,
}

/// Courses a user is subscribed to: `id IN (SELECT course_id FROM course_users WHERE user_id = $n)`.
pub static COURSE_USERS: Relation = Relation {
    name: "course_users",
    key: "id",
    table: "course_users",
    owner: "course_id",
    target: "user_id",
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub course_status: CourseStatus,
    pub course_level: CourseLevel,
    pub user_instructor: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Filterable for Course {
    fn field(&self, column: &str) -> Option<Value> {
        match column {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            "course_status" => Some(self.course_status.to_string().into()),
            "course_level" => Some(self.course_level.to_string().into()),
            "user_instructor" => Some(self.user_instructor.into()),
            "created_at" => Some(self.created_at.into()),
            "updated_at" => Some(self.updated_at.into()),
            _ => None,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct CourseRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub course_status: String,
    pub course_level: String,
    pub user_instructor: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<CourseRow> for Course {
    type Error = anyhow::Error;

    fn try_from(r: CourseRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            name: r.name,
            description: r.description,
            image_url: r.image_url,
            course_status: r.course_status.parse()?,
            course_level: r.course_level.parse()?,
            user_instructor: r.user_instructor,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_use_screaming_snake_case() {
        assert_eq!(CourseStatus::InProgress.to_string(), "IN_PROGRESS");
        assert_eq!("INTERMEDIARY".parse::<CourseLevel>().unwrap(), CourseLevel::Intermediary);
        assert_eq!(
            serde_json::to_string(&CourseStatus::Concluded).unwrap(),
            "\"CONCLUDED\""
        );
    }

    #[test]
    fn row_with_unknown_level_is_rejected() {
        let now = OffsetDateTime::now_utc();
        let row = CourseRow {
            id: Uuid::new_v4(),
            name: "Rust".into(),
            description: "Ownership".into(),
            image_url: None,
            course_status: "IN_PROGRESS".into(),
            course_level: "EXPERT".into(),
            user_instructor: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        assert!(Course::try_from(row).is_err());
    }
}
