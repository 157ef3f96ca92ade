use serde::Deserialize;
use uuid::Uuid;

use super::repo_types::NotificationStatus;
use crate::specification::{PageDefaults, Predicate};

pub const NOTIFICATION_SORT_FIELDS: &[(&str, &'static str)] = &[
    ("id", "id"),
    ("title", "title"),
    ("created_at", "created_at"),
];

pub const NOTIFICATION_PAGE_DEFAULTS: PageDefaults = PageDefaults {
    size: 10,
    sort: None,
};

/// Unread notifications addressed to `user_id`.
pub fn inbox(user_id: Uuid) -> Predicate {
    Predicate::eq("user_id", user_id).and(Predicate::eq(
        "notification_status",
        NotificationStatus::Created.to_string(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdateNotificationRequest {
    pub notification_status: NotificationStatus,
}
