use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::{split_roles, Role};

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,     // user ID
    pub iat: usize,    // issued at (unix timestamp)
    pub exp: usize,    // expires at (unix timestamp)
    pub roles: String, // comma-joined role tags
}

impl Claims {
    pub fn role_list(&self) -> Vec<Role> {
        split_roles(&self.roles)
    }
}
