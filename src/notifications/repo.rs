use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::repo_types::{Notification, NotificationRow};
use crate::specification::{Page, Pageable, Predicate};

const NOTIFICATION_COLUMNS: &str = "id, user_id, title, message, notification_status, created_at";

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn list_notifications(
        &self,
        spec: &Predicate,
        pageable: &Pageable,
    ) -> anyhow::Result<Page<Notification>>;
    async fn find_notification(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Notification>>;
    async fn insert_notification(&self, notification: &Notification) -> anyhow::Result<()>;
    async fn update_notification(&self, notification: &Notification) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgNotificationStore {
    db: PgPool,
}

impl PgNotificationStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn list_notifications(
        &self,
        spec: &Predicate,
        pageable: &Pageable,
    ) -> anyhow::Result<Page<Notification>> {
        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications"
        ));
        spec.push_where(&mut select);
        pageable.push_order_and_limit(&mut select, "id");
        let rows = select
            .build_query_as::<NotificationRow>()
            .fetch_all(&self.db)
            .await
            .context("list notifications")?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM notifications");
        spec.push_where(&mut count);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.db)
            .await
            .context("count notifications")?;

        let items = rows
            .into_iter()
            .map(Notification::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Page::new(items, pageable, total.max(0) as u64))
    }

    async fn find_notification(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("find notification")?;
        row.map(Notification::try_from).transpose()
    }

    async fn insert_notification(&self, n: &Notification) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, title, message, notification_status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(n.id)
        .bind(n.user_id)
        .bind(&n.title)
        .bind(&n.message)
        .bind(n.notification_status.to_string())
        .bind(n.created_at)
        .execute(&self.db)
        .await
        .context("insert notification")?;
        Ok(())
    }

    async fn update_notification(&self, n: &Notification) -> anyhow::Result<()> {
        sqlx::query("UPDATE notifications SET notification_status = $2 WHERE id = $1")
            .bind(n.id)
            .bind(n.notification_status.to_string())
            .execute(&self.db)
            .await
            .context("update notification")?;
        Ok(())
    }
}
