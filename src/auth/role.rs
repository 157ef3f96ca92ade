use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Authority tag granted to an identity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum Role {
    #[serde(rename = "ROLE_USER")]
    #[strum(serialize = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_STUDENT")]
    #[strum(serialize = "ROLE_STUDENT")]
    Student,
    #[serde(rename = "ROLE_INSTRUCTOR")]
    #[strum(serialize = "ROLE_INSTRUCTOR")]
    Instructor,
    #[serde(rename = "ROLE_ADMIN")]
    #[strum(serialize = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    /// The role itself plus every role below it:
    /// ADMIN > INSTRUCTOR > STUDENT > USER.
    pub fn implied(self) -> &'static [Role] {
        match self {
            Role::Admin => &[Role::Admin, Role::Instructor, Role::Student, Role::User],
            Role::Instructor => &[Role::Instructor, Role::Student, Role::User],
            Role::Student => &[Role::Student, Role::User],
            Role::User => &[Role::User],
        }
    }
}

/// Renders a role list the way the token `roles` claim carries it.
pub fn join_roles(roles: &[Role]) -> String {
    roles.iter().map(Role::to_string).collect::<Vec<_>>().join(",")
}

/// Parses a comma-joined role list, skipping unknown tags.
pub fn split_roles(raw: &str) -> Vec<Role> {
    raw.split(',')
        .filter_map(|tag| tag.trim().parse::<Role>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_implies_everything() {
        let implied = Role::Admin.implied();
        for role in [Role::User, Role::Student, Role::Instructor, Role::Admin] {
            assert!(implied.contains(&role));
        }
    }

    #[test]
    fn student_does_not_imply_instructor() {
        assert!(!Role::Student.implied().contains(&Role::Instructor));
        assert!(Role::Student.implied().contains(&Role::User));
    }

    #[test]
    fn tags_round_trip_through_claim_text() {
        let roles = vec![Role::Student, Role::Admin];
        let joined = join_roles(&roles);
        assert_eq!(joined, "ROLE_STUDENT,ROLE_ADMIN");
        assert_eq!(split_roles(&joined), roles);
        assert_eq!(split_roles("ROLE_STUDENT,ROLE_GHOST"), vec![Role::Student]);
    }

    #[test]
    fn serde_uses_role_tags() {
        let json = serde_json::to_string(&Role::Instructor).unwrap();
        assert_eq!(json, "\"ROLE_INSTRUCTOR\"");
    }
}
