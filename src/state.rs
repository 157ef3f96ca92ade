use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    auth::jwt::JwtKeys,
    config::AppConfig,
    courses::repo::{CourseStore, PgCourseStore},
    db,
    memory::MemoryStore,
    notifications::repo::{NotificationStore, PgNotificationStore},
    users::repo::{PgUserStore, UserStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: Arc<JwtKeys>,
    pub users: Arc<dyn UserStore>,
    pub courses: Arc<dyn CourseStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let Some(url) = config.database_url.as_deref() else {
            warn!("DATABASE_URL not set; using the in-memory store");
            return Ok(Self::in_memory(config));
        };

        let pool = db::connect(url, config.db_max_connections).await?;
        db::migrate(&pool).await?;
        info!(max_connections = config.db_max_connections, "connected to postgres");

        Ok(Self::from_parts(
            config,
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PgCourseStore::new(pool.clone())),
            Arc::new(PgNotificationStore::new(pool)),
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        courses: Arc<dyn CourseStore>,
        notifications: Arc<dyn NotificationStore>,
    ) -> Self {
        let jwt = Arc::new(JwtKeys::new(&config.jwt));
        Self {
            config,
            jwt,
            users,
            courses,
            notifications,
        }
    }

    /// Every store backed by one shared [`MemoryStore`].
    pub fn in_memory(config: Arc<AppConfig>) -> Self {
        let store = Arc::new(MemoryStore::default());
        Self::from_parts(config, store.clone(), store.clone(), store)
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: None,
            db_max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
            jwt: crate::config::JwtConfig {
                secret: "test-secret-with-enough-bytes-for-hs512".into(),
                expiration_ms: 60_000,
            },
        });
        Self::in_memory(config)
    }
}
