//! Profile entity: the local record of an authenticated user.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// Authorization role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Coach,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Coach => "coach",
            Role::Admin => "admin",
        }
    }

    /// Returns true if the role may author programs and routine blocks.
    pub fn can_author(&self) -> bool {
        matches!(self, Role::Coach | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "coach" => Ok(Role::Coach),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::bad_request(
                "Unknown role",
                json!({ "role": other, "allowed": ["member", "coach", "admin"] }),
            )),
        }
    }
}

/// A user profile.
///
/// The `id` is the user id issued by the identity provider; credentials never
/// touch this database.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn can_author(&self) -> bool {
        self.role.can_author()
    }

    /// Returns true if this user may manage content owned by `owner_id`.
    pub fn can_manage(&self, owner_id: &Uuid) -> bool {
        self.is_admin() || (self.can_author() && &self.id == owner_id)
    }
}

/// Input for creating (or refreshing) a profile after authentication.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::fixtures::profile;

    #[test]
    fn test_role_round_trip_strings() {
        for role in [Role::Member, Role::Coach, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_can_author() {
        assert!(!Role::Member.can_author());
        assert!(Role::Coach.can_author());
        assert!(Role::Admin.can_author());
    }

    #[test]
    fn test_can_manage_own_content() {
        let coach = profile(Role::Coach);
        assert!(coach.can_manage(&coach.id));
        assert!(!coach.can_manage(&Uuid::new_v4()));
    }

    #[test]
    fn test_admin_manages_everything() {
        let admin = profile(Role::Admin);
        assert!(admin.can_manage(&Uuid::new_v4()));
    }

    #[test]
    fn test_member_cannot_manage_even_own_id() {
        let member = profile(Role::Member);
        assert!(!member.can_manage(&member.id));
    }
}
