//! Caller identity as seen by the lending server
//!
//! Users live in the identity service; this side only knows a verified
//! subject and its role.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Closed set of roles carried by credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Student,
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Staff => "STAFF",
            Role::Admin => "ADMIN",
        }
    }

    /// ADMIN and STAFF may review and drive requests
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin | Role::Staff)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // identity service tokens may carry Spring-style "ROLE_" prefixes
        let s = s.trim();
        let s = s
            .strip_prefix("ROLE_")
            .or_else(|| s.strip_prefix("role_"))
            .unwrap_or(s);
        match s.to_uppercase().as_str() {
            "STUDENT" => Ok(Role::Student),
            "STAFF" => Ok(Role::Staff),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Verified caller: subject identifier plus role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub role: Role,
}

impl Identity {
    pub fn new(subject: impl Into<String>, role: Role) -> Self {
        Self {
            subject: subject.into(),
            role,
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.role.is_privileged()
    }

    /// Whether this caller may act on a resource owned by `owner`
    pub fn can_act_for(&self, owner: &str) -> bool {
        self.is_privileged() || self.subject == owner
    }
}
