//! User and organisation models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user account on the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub org_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An organisation (training company) on the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    /// Short unique code, e.g. "BCH" (uppercase alphanumeric)
    pub code: String,
    pub region: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Membership roles within an organisation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Supervisor,
    Apprentice,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Supervisor => "supervisor",
            Role::Apprentice => "apprentice",
        }
    }

    /// Whether this role can manage members and review entries
    pub fn can_manage_org(&self) -> bool {
        matches!(self, Role::Owner | Role::Supervisor)
    }

    /// Whether this role can manage billing
    pub fn can_manage_billing(&self) -> bool {
        matches!(self, Role::Owner)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "supervisor" => Ok(Role::Supervisor),
            "apprentice" => Ok(Role::Apprentice),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trip() {
        for role in [Role::Owner, Role::Supervisor, Role::Apprentice] {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
        assert!(Role::from_str("admin").is_err());
    }

    #[test]
    fn role_capabilities() {
        assert!(Role::Owner.can_manage_org());
        assert!(Role::Supervisor.can_manage_org());
        assert!(!Role::Apprentice.can_manage_org());
        assert!(Role::Owner.can_manage_billing());
        assert!(!Role::Supervisor.can_manage_billing());
    }
}
