use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum::{Display, EnumString};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::specification::{Filterable, Value};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Created,
    Read,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_status: NotificationStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Width of `notifications.title`.
pub const TITLE_MAX_LEN: usize = 200;

impl Notification {
    /// Titles longer than [`TITLE_MAX_LEN`] characters are cut to fit the column.
    pub fn new(user_id: Uuid, mut title: String, message: String) -> Self {
        let cut = title.char_indices().nth(TITLE_MAX_LEN).map(|(i, _)| i);
        if let Some(cut) = cut {
            title.truncate(cut);
        }
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            message,
            notification_status: NotificationStatus::Created,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

impl Filterable for Notification {
    fn field(&self, column: &str) -> Option<Value> {
        match column {
            "id" => Some(self.id.into()),
            "user_id" => Some(self.user_id.into()),
            "title" => Some(self.title.as_str().into()),
            "notification_status" => Some(self.notification_status.to_string().into()),
            "created_at" => Some(self.created_at.into()),
            _ => None,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_status: String,
    pub created_at: OffsetDateTime,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = anyhow::Error;

    fn try_from(r: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            title: r.title,
            message: r.message,
            notification_status: r.notification_status.parse()?,
            created_at: r.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_title_for_the_longest_course_name_fits() {
        let title = format!("Welcome to the course: {}", "á".repeat(150));
        let n = Notification::new(Uuid::new_v4(), title.clone(), "hi".into());
        assert_eq!(n.title, title);
    }

    #[test]
    fn oversized_titles_are_cut_on_a_char_boundary() {
        let n = Notification::new(Uuid::new_v4(), "ç".repeat(TITLE_MAX_LEN + 5), "hi".into());
        assert_eq!(n.title.chars().count(), TITLE_MAX_LEN);
        assert_eq!(n.notification_status, NotificationStatus::Created);
    }
}
