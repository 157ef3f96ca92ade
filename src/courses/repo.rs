use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::repo_types::{Course, CourseRow};
use crate::{
    db,
    error::Duplicate,
    specification::{Page, Pageable, Predicate},
};

const COURSE_COLUMNS: &str = "id, name, description, image_url, course_status, course_level, \
     user_instructor, created_at, updated_at";

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn find_course(&self, id: Uuid) -> anyhow::Result<Option<Course>>;
    async fn list_courses(&self, spec: &Predicate, pageable: &Pageable) -> anyhow::Result<Page<Course>>;
    async fn insert_course(&self, course: &Course) -> anyhow::Result<()>;
    async fn update_course(&self, course: &Course) -> anyhow::Result<()>;
    /// Also drops the course's subscriptions.
    async fn delete_course(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn is_subscribed(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<bool>;
    async fn subscribe(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgCourseStore {
    db: PgPool,
}

impl PgCourseStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CourseStore for PgCourseStore {
    async fn find_course(&self, id: Uuid) -> anyhow::Result<Option<Course>> {
        let row = sqlx::query_as::<_, CourseRow>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find course")?;
        row.map(Course::try_from).transpose()
    }

    async fn list_courses(&self, spec: &Predicate, pageable: &Pageable) -> anyhow::Result<Page<Course>> {
        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {COURSE_COLUMNS} FROM courses"));
        spec.push_where(&mut select);
        pageable.push_order_and_limit(&mut select, "id");
        let rows = select
            .build_query_as::<CourseRow>()
            .fetch_all(&self.db)
            .await
            .context("list courses")?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM courses");
        spec.push_where(&mut count);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.db)
            .await
            .context("count courses")?;

        let courses = rows
            .into_iter()
            .map(Course::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Page::new(courses, pageable, total.max(0) as u64))
    }

    async fn insert_course(&self, course: &Course) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO courses (id, name, description, image_url, course_status,
                                 course_level, user_instructor, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(course.id)
        .bind(&course.name)
        .bind(&course.description)
        .bind(&course.image_url)
        .bind(course.course_status.to_string())
        .bind(course.course_level.to_string())
        .bind(course.user_instructor)
        .bind(course.created_at)
        .bind(course.updated_at)
        .execute(&self.db)
        .await
        .context("insert course")?;
        Ok(())
    }

    async fn update_course(&self, course: &Course) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE courses
               SET name = $2, description = $3, image_url = $4, course_status = $5,
                   course_level = $6, user_instructor = $7, updated_at = $8
             WHERE id = $1
            "#,
        )
        .bind(course.id)
        .bind(&course.name)
        .bind(&course.description)
        .bind(&course.image_url)
        .bind(course.course_status.to_string())
        .bind(course.course_level.to_string())
        .bind(course.user_instructor)
        .bind(course.updated_at)
        .execute(&self.db)
        .await
        .context("update course")?;
        Ok(())
    }

    async fn delete_course(&self, id: Uuid) -> anyhow::Result<bool> {
        // course_users rows go with the course via ON DELETE CASCADE
        let done = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete course")?;
        Ok(done.rows_affected() > 0)
    }

    async fn is_subscribed(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM course_users WHERE course_id = $1 AND user_id = $2)",
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .context("check subscription")?;
        Ok(exists)
    }

    async fn subscribe(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO course_users (id, course_id, user_id) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(course_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(|e| match db::unique_violation(&e) {
                Some(_) => anyhow::Error::new(Duplicate("Subscription already exists".into())),
                None => anyhow::Error::new(e).context("insert subscription"),
            })?;
        Ok(())
    }
}
