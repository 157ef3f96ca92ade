use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{password::verify_password, role::Role};
use crate::{
    error::{AppError, AppResult},
    users::{repo::UserStore, repo_types::User},
};

/// Who is calling, as seen by the access gate and the handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    /// Roles granted on the identity record.
    pub roles: Vec<Role>,
    /// `roles` closed under the role hierarchy.
    pub authorities: BTreeSet<Role>,
}

impl Principal {
    pub fn new(user_id: Uuid, username: String, roles: Vec<Role>) -> Self {
        let authorities = roles
            .iter()
            .flat_map(|r| r.implied().iter().copied())
            .collect();
        Self {
            user_id,
            username,
            roles,
            authorities,
        }
    }

    pub fn has_any(&self, required: &[Role]) -> bool {
        required.iter().any(|r| self.authorities.contains(r))
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Principal::new(user.id, user.username.clone(), user.roles.clone())
    }
}

/// Loads principals from the identity store.
pub struct PrincipalResolver<'a> {
    users: &'a dyn UserStore,
}

impl<'a> PrincipalResolver<'a> {
    pub fn new(users: &'a dyn UserStore) -> Self {
        Self { users }
    }

    pub async fn by_username(&self, username: &str) -> AppResult<Principal> {
        let user = self.user_by_username(username).await?;
        Ok(Principal::from(&user))
    }

    pub async fn by_id(&self, user_id: Uuid) -> AppResult<Principal> {
        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
        Ok(Principal::from(&user))
    }

    /// Username lookup plus password check. Unknown user and wrong password
    /// produce the same error.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<Principal> {
        let user = self.user_by_username(username).await.map_err(|e| match e {
            AppError::Unauthorized(_) => invalid_credentials(),
            other => other,
        })?;
        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(invalid_credentials());
        }
        debug!(user_id = %user.id, "credentials accepted");
        Ok(Principal::from(&user))
    }

    async fn user_by_username(&self, username: &str) -> AppResult<User> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::Unauthorized(format!("User {username} not found")))
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".into())
}
