use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_JWT_EXPIRATION_MS: u64 = 14_400_000;
/// Ten years.
pub const MAX_JWT_EXPIRATION_MS: u64 = 315_360_000_000;

#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_ms: u64,
}

impl JwtConfig {
    pub fn check(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.secret.is_empty(), "JWT_SECRET must not be empty");
        anyhow::ensure!(
            (1..=MAX_JWT_EXPIRATION_MS).contains(&self.expiration_ms),
            "JWT_EXPIRATION_MS must be between 1 and {MAX_JWT_EXPIRATION_MS}"
        );
        Ok(())
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration_ms", &self.expiration_ms)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Postgres connection string. Without it the service runs on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            expiration_ms: parse_or("JWT_EXPIRATION_MS", DEFAULT_JWT_EXPIRATION_MS)?,
        };
        jwt.check()?;

        Ok(Self {
            database_url,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_or("APP_PORT", 8080)?,
            jwt,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {v:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_when_unset() {
        let v: u64 = parse_or("EAD_TEST_SURELY_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(v, 42);
    }

    #[test]
    fn jwt_config_debug_hides_secret() {
        let cfg = JwtConfig {
            secret: "super-secret".into(),
            expiration_ms: 1000,
        };
        let printed = format!("{cfg:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("1000"));
    }

    #[test]
    fn jwt_expiration_is_bounded() {
        let cfg = |expiration_ms| JwtConfig {
            secret: "s3cret".into(),
            expiration_ms,
        };
        assert!(cfg(DEFAULT_JWT_EXPIRATION_MS).check().is_ok());
        assert!(cfg(MAX_JWT_EXPIRATION_MS).check().is_ok());
        assert!(cfg(0).check().is_err());
        assert!(cfg(MAX_JWT_EXPIRATION_MS + 1).check().is_err());
        assert!(cfg(u64::MAX).check().is_err());
    }
}
