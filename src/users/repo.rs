use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::repo_types::{User, UserRow};
use crate::{
    db,
    error::Duplicate,
    specification::{Page, Pageable, Predicate},
};

const USER_COLUMNS: &str = "id, username, email, password_hash, full_name, user_status, \
     user_type, phone_number, cpf, image_url, roles, created_at, updated_at";

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn username_exists(&self, username: &str) -> anyhow::Result<bool>;
    async fn email_exists(&self, email: &str) -> anyhow::Result<bool>;
    async fn list_users(&self, spec: &Predicate, pageable: &Pageable) -> anyhow::Result<Page<User>>;
    async fn insert_user(&self, user: &User) -> anyhow::Result<()>;
    async fn update_user(&self, user: &User) -> anyhow::Result<()>;
    /// `false` when no such user existed.
    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn role_tags(user: &User) -> Vec<String> {
    user.roles.iter().map(|r| r.to_string()).collect()
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find user by username")?;
        row.map(User::try_from).transpose()
    }

    async fn username_exists(&self, username: &str) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)",
        )
        .bind(username)
        .fetch_one(&self.db)
        .await
        .context("check username")?;
        Ok(exists)
    }

    async fn email_exists(&self, email: &str) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE lower(email) = lower($1))",
        )
        .bind(email)
        .fetch_one(&self.db)
        .await
        .context("check email")?;
        Ok(exists)
    }

    async fn list_users(&self, spec: &Predicate, pageable: &Pageable) -> anyhow::Result<Page<User>> {
        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        spec.push_where(&mut select);
        pageable.push_order_and_limit(&mut select, "id");
        let rows = select
            .build_query_as::<UserRow>()
            .fetch_all(&self.db)
            .await
            .context("list users")?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        spec.push_where(&mut count);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.db)
            .await
            .context("count users")?;

        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Page::new(users, pageable, total.max(0) as u64))
    }

    async fn insert_user(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, full_name, user_status,
                               user_type, phone_number, cpf, image_url, roles, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.user_status.to_string())
        .bind(user.user_type.to_string())
        .bind(&user.phone_number)
        .bind(&user.cpf)
        .bind(&user.image_url)
        .bind(role_tags(user))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await
        .map_err(|e| match db::unique_violation(&e) {
            Some("users_email_lower_idx") => {
                anyhow::Error::new(Duplicate("Email is already taken".into()))
            }
            Some(_) => anyhow::Error::new(Duplicate("Username is already taken".into())),
            None => anyhow::Error::new(e).context("insert user"),
        })?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET email = $2, password_hash = $3, full_name = $4, user_status = $5,
                   user_type = $6, phone_number = $7, cpf = $8, image_url = $9,
                   roles = $10, updated_at = $11
             WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.user_status.to_string())
        .bind(user.user_type.to_string())
        .bind(&user.phone_number)
        .bind(&user.cpf)
        .bind(&user.image_url)
        .bind(role_tags(user))
        .bind(user.updated_at)
        .execute(&self.db)
        .await
        .context("update user")?;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool> {
        let done = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(done.rows_affected() > 0)
    }
}
