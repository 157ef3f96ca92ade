use std::sync::Arc;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{claims::Claims, principal::Principal, role::join_roles};
use crate::{config::JwtConfig, state::AppState};

const ALGORITHM: Algorithm = Algorithm::HS512;

/// Why a presented token was refused.
///
/// The access gate only ever reports "invalid or expired"; the reason is kept
/// for logs and for callers that want it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid JWT signature")]
    BadSignature,
    #[error("malformed JWT")]
    Malformed,
    #[error("JWT expired")]
    Expired,
    #[error("unsupported JWT algorithm")]
    UnsupportedAlgorithm,
    #[error("JWT claims are empty or missing")]
    MissingClaims,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => TokenError::UnsupportedAlgorithm,
            ErrorKind::MissingRequiredClaim(_) => TokenError::MissingClaims,
            _ => TokenError::Malformed,
        }
    }
}

/// Signing and verification keys, built once from [`JwtConfig`].
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: TimeDuration,
}

impl FromRef<AppState> for Arc<JwtKeys> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        // Expiry is checked against an explicit clock in `validate_at`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            validation,
            ttl: TimeDuration::milliseconds(i64::try_from(cfg.expiration_ms).unwrap_or(i64::MAX)),
        }
    }

    pub fn issue(&self, principal: &Principal) -> anyhow::Result<String> {
        self.issue_at(principal, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, principal: &Principal, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = now
            .checked_add(self.ttl)
            .ok_or_else(|| anyhow::anyhow!("token expiry overflows the calendar"))?;
        let claims = Claims {
            sub: principal.user_id,
            iat: now.unix_timestamp().max(0) as usize,
            exp: exp.unix_timestamp().max(0) as usize,
            roles: join_roles(&principal.roles),
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)?;
        debug!(user_id = %principal.user_id, roles = %claims.roles, "jwt signed");
        Ok(token)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, OffsetDateTime::now_utc())
    }

    /// Valid iff the signature verifies and `now` is strictly before `exp`.
    pub fn validate_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        if token.trim().is_empty() {
            return Err(TokenError::MissingClaims);
        }
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        if data.claims.exp as i64 <= now.unix_timestamp() {
            return Err(TokenError::Expired);
        }
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }

    /// Coarse pass/fail view of [`JwtKeys::validate`]. The reason is only logged.
    pub fn is_valid(&self, token: &str) -> bool {
        match self.validate(token) {
            Ok(_) => true,
            Err(reason) => {
                warn!(%reason, "jwt rejected");
                false
            }
        }
    }

    pub fn subject(&self, token: &str) -> Result<Uuid, TokenError> {
        self.validate(token).map(|claims| claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::role::Role;

    fn keys(secret: &str, expiration_ms: u64) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            expiration_ms,
        })
    }

    fn principal(roles: Vec<Role>) -> Principal {
        Principal::new(Uuid::new_v4(), "ana.souza".into(), roles)
    }

    #[test]
    fn fresh_token_validates_and_decodes_subject() {
        let keys = keys("dev-secret", 60_000);
        let who = principal(vec![Role::Student, Role::Instructor]);
        let token = keys.issue(&who).expect("sign");

        assert!(keys.is_valid(&token));
        let claims = keys.validate(&token).expect("verify");
        assert_eq!(claims.sub, who.user_id);
        assert_eq!(claims.role_list(), vec![Role::Student, Role::Instructor]);
        assert_eq!(claims.exp - claims.iat, 60);
        assert_eq!(keys.subject(&token), Ok(who.user_id));
    }

    #[test]
    fn unrepresentable_expiry_is_an_error() {
        let keys = keys("dev-secret", u64::MAX);
        assert!(keys.issue(&principal(vec![Role::Student])).is_err());
    }

    #[test]
    fn token_expires_after_ttl() {
        let keys = keys("dev-secret", 60_000);
        let issued = OffsetDateTime::now_utc();
        let token = keys.issue_at(&principal(vec![Role::Student]), issued).unwrap();

        assert!(keys.validate_at(&token, issued + TimeDuration::seconds(59)).is_ok());
        assert_eq!(
            keys.validate_at(&token, issued + TimeDuration::seconds(61)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn token_issued_in_the_past_is_invalid_now() {
        let keys = keys("dev-secret", 1_000);
        let long_ago = OffsetDateTime::now_utc() - TimeDuration::hours(1);
        let token = keys.issue_at(&principal(vec![Role::Student]), long_ago).unwrap();
        assert!(!keys.is_valid(&token));
        assert_eq!(keys.validate(&token), Err(TokenError::Expired));
    }

    #[test]
    fn other_secret_fails_with_bad_signature() {
        let good = keys("secret-one", 60_000);
        let bad = keys("secret-two", 60_000);
        let token = good.issue(&principal(vec![Role::Admin])).unwrap();
        assert_eq!(bad.validate(&token), Err(TokenError::BadSignature));
        assert!(!bad.is_valid(&token));
    }

    #[test]
    fn garbage_is_malformed() {
        let keys = keys("dev-secret", 60_000);
        assert_eq!(keys.validate("not.a.jwt"), Err(TokenError::Malformed));
        assert_eq!(keys.validate("abc"), Err(TokenError::Malformed));
    }

    #[test]
    fn empty_token_reports_missing_claims() {
        let keys = keys("dev-secret", 60_000);
        assert_eq!(keys.validate(""), Err(TokenError::MissingClaims));
        assert_eq!(keys.validate("   "), Err(TokenError::MissingClaims));
    }

    #[test]
    fn other_algorithm_is_unsupported() {
        let keys = keys("dev-secret", 60_000);
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: now.unix_timestamp() as usize,
            exp: (now + TimeDuration::minutes(5)).unix_timestamp() as usize,
            roles: "ROLE_STUDENT".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"dev-secret"),
        )
        .unwrap();
        assert_eq!(keys.validate(&token), Err(TokenError::UnsupportedAlgorithm));
    }
}
