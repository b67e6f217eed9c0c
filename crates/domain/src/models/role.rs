//! Group role hierarchy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role within a group.
///
/// Variants are declared in ascending order of authority so the derived
/// `Ord` gives the hierarchy Member < Moderator < Owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Member,
    Moderator,
    Owner,
}

impl GroupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Member => "member",
            GroupRole::Moderator => "moderator",
            GroupRole::Owner => "owner",
        }
    }

    /// Returns true if this role is at least as privileged as `required`.
    pub fn at_least(self, required: GroupRole) -> bool {
        self >= required
    }

    /// Roles that may be granted through role management (ownership is
    /// only ever held by the group's single owner).
    pub fn is_assignable(&self) -> bool {
        !matches!(self, GroupRole::Owner)
    }
}

/// Returns true if `actual` satisfies a `required` role.
pub fn role_at_least(actual: GroupRole, required: GroupRole) -> bool {
    actual.at_least(required)
}

impl FromStr for GroupRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(GroupRole::Member),
            "moderator" => Ok(GroupRole::Moderator),
            "owner" => Ok(GroupRole::Owner),
            _ => Err(format!("Invalid group role: {}", s)),
        }
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
