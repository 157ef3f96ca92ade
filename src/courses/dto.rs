use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Course, CourseLevel, CourseStatus, COURSE_USERS};
use crate::specification::{PageDefaults, Predicate};

pub const COURSE_SORT_FIELDS: &[(&str, &'static str)] = &[
    ("id", "id"),
    ("name", "name"),
    ("course_status", "course_status"),
    ("course_level", "course_level"),
    ("created_at", "created_at"),
    ("updated_at", "updated_at"),
];

pub const COURSE_PAGE_DEFAULTS: PageDefaults = PageDefaults {
    size: 10,
    sort: None,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CourseRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub course_status: CourseStatus,
    pub course_level: CourseLevel,
    pub user_instructor: Uuid,
}

impl CourseRequest {
    pub fn into_course(self) -> Course {
        let now = OffsetDateTime::now_utc();
        Course {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            image_url: self.image_url,
            course_status: self.course_status,
            course_level: self.course_level,
            user_instructor: self.user_instructor,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites the editable fields, keeping id and `created_at`.
    pub fn apply_to(self, course: &mut Course) {
        course.name = self.name.trim().to_string();
        course.description = self.description.trim().to_string();
        course.image_url = self.image_url;
        course.course_status = self.course_status;
        course.course_level = self.course_level;
        course.user_instructor = self.user_instructor;
        course.updated_at = OffsetDateTime::now_utc();
    }
}

/// `?course_level=&course_status=&name=&created_from=&created_to=&user_id=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseFilter {
    pub course_level: Option<CourseLevel>,
    pub course_status: Option<CourseStatus>,
    pub name: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_from: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_to: Option<OffsetDateTime>,
    /// Only courses this user is subscribed to.
    pub user_id: Option<Uuid>,
}

impl CourseFilter {
    pub fn to_predicate(&self) -> Predicate {
        let subscribed = self
            .user_id
            .map_or(Predicate::True, |id| Predicate::related(&COURSE_USERS, id));
        subscribed.and(Predicate::all([
            Predicate::eq_opt("course_level", self.course_level.map(|l| l.to_string())),
            Predicate::eq_opt("course_status", self.course_status.map(|s| s.to_string())),
            Predicate::like_opt("name", self.name.as_deref()),
            Predicate::range_opt("created_at", self.created_from, self.created_to),
        ]))
    }
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionRequest {
    pub user_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_filters_match_everything() {
        assert!(CourseFilter::default().to_predicate().is_true());
    }

    #[test]
    fn user_id_becomes_subscription_relation() {
        let user_id = Uuid::new_v4();
        let filter = CourseFilter {
            user_id: Some(user_id),
            ..Default::default()
        };
        assert_eq!(
            filter.to_predicate(),
            Predicate::Related(&COURSE_USERS, user_id)
        );
    }

    #[test]
    fn dates_parse_from_query_string() {
        let uri: axum::http::Uri =
            "/courses?created_from=2024-01-01T00:00:00Z&course_level=ADVANCED&name=rust"
                .parse()
                .unwrap();
        let axum::extract::Query(filter) =
            axum::extract::Query::<CourseFilter>::try_from_uri(&uri).unwrap();
        assert_eq!(filter.course_level, Some(CourseLevel::Advanced));
        assert!(filter.created_from.is_some());
        assert!(filter.created_to.is_none());
        assert!(matches!(filter.to_predicate(), Predicate::And(parts) if parts.len() == 3));
    }

    #[test]
    fn update_keeps_identity() {
        let original = CourseRequest {
            name: "Rust".into(),
            description: "Ownership".into(),
            image_url: None,
            course_status: CourseStatus::InProgress,
            course_level: CourseLevel::Beginner,
            user_instructor: Uuid::new_v4(),
        }
        .into_course();
        let mut course = original.clone();
        CourseRequest {
            name: "  Async Rust ".into(),
            description: "Futures".into(),
            image_url: Some("https://img".into()),
            course_status: CourseStatus::Concluded,
            course_level: CourseLevel::Advanced,
            user_instructor: original.user_instructor,
        }
        .apply_to(&mut course);
        assert_eq!(course.id, original.id);
        assert_eq!(course.created_at, original.created_at);
        assert_eq!(course.name, "Async Rust");
        assert_eq!(course.course_status, CourseStatus::Concluded);
    }
}
