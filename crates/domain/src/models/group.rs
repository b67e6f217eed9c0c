//! Group domain models for calendar sharing communities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::role::GroupRole;

/// Controls who may create invites for a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    /// Any member may invite.
    Open,
    /// Moderators and the owner may invite.
    #[default]
    ModeratorInvite,
    /// Only the owner may invite.
    OwnerInvite,
}

impl PrivacyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyLevel::Open => "open",
            PrivacyLevel::ModeratorInvite => "moderator_invite",
            PrivacyLevel::OwnerInvite => "owner_invite",
        }
    }

    /// Minimum membership role needed to create an invite.
    pub fn min_role_to_invite(&self) -> GroupRole {
        match self {
            PrivacyLevel::Open => GroupRole::Member,
            PrivacyLevel::ModeratorInvite => GroupRole::Moderator,
            PrivacyLevel::OwnerInvite => GroupRole::Owner,
        }
    }
}

impl FromStr for PrivacyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(PrivacyLevel::Open),
            "moderator_invite" => Ok(PrivacyLevel::ModeratorInvite),
            "owner_invite" => Ok(PrivacyLevel::OwnerInvite),
            _ => Err(format!("Invalid privacy level: {}", s)),
        }
    }
}

impl fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents a calendar group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub privacy: PrivacyLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents a user's membership in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupMembership {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: GroupRole,
    /// Invite that produced this membership, kept for auditing only.
    pub invite_id: Option<Uuid>,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for creating a group.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateGroupRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    pub privacy: Option<PrivacyLevel>,
}

/// Request payload for updating a group.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateGroupRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    pub privacy: Option<PrivacyLevel>,
}

/// Response for group detail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupDetail {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub privacy: PrivacyLevel,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// The caller's role; absent for administrators without a membership.
    pub your_role: Option<GroupRole>,
}

// ============================================================================
// Membership DTOs
// ============================================================================

/// Request to add a user to a group directly, without an invite.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct AddMemberRequest {
    #[validate(custom(function = "shared::validation::validate_username"))]
    pub username: String,
}

/// Member response in list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MemberResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: GroupRole,
    pub invite_id: Option<Uuid>,
    pub joined_at: DateTime<Utc>,
}

impl From<GroupMembership> for MemberResponse {
    fn from(m: GroupMembership) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            role: m.role,
            invite_id: m.invite_id,
            joined_at: m.joined_at,
        }
    }
}

/// Response for listing members.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListMembersResponse {
    pub data: Vec<MemberResponse>,
    pub count: usize,
}

/// Request to update a member's role.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UpdateRoleRequest {
    pub role: GroupRole,
}

/// Response after updating a member's role.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UpdateRoleResponse {
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub role: GroupRole,
    pub updated_at: DateTime<Utc>,
}
