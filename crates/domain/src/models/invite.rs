//! Invite domain models for group invitations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::group::GroupMembership;

/// Represents a group invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Invite {
    pub id: Uuid,
    pub group_id: Uuid,
    pub created_by: Uuid,
    /// When set, only this user may redeem the invite.
    pub invited_user_id: Option<Uuid>,
    /// Uppercase code, unique across all invites case-insensitively.
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub one_time_use: bool,
    pub used: bool,
    pub times_used: i32,
}

/// Redeemability of an invite at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteState {
    Active,
    /// One-time invite that has been redeemed.
    Used,
    Expired,
}

impl Invite {
    /// True once `now` has reached the expiry. An invite expiring exactly
    /// at `now` is already expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// True when a one-time invite has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.one_time_use && self.used
    }

    /// True when the invite is restricted to someone other than `user_id`.
    pub fn excludes(&self, user_id: Uuid) -> bool {
        self.invited_user_id.is_some_and(|target| target != user_id)
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> InviteState {
        if self.is_exhausted() {
            InviteState::Used
        } else if self.is_expired_at(now) {
            InviteState::Expired
        } else {
            InviteState::Active
        }
    }
}

/// Result of one redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedemptionOutcome {
    Success(GroupMembership),
    NotFound,
    Exhausted,
    Expired,
    /// The invite targets a different user.
    Unauthorized,
    AlreadyMember,
}

impl RedemptionOutcome {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RedemptionOutcome::Success(_) => "success",
            RedemptionOutcome::NotFound => "not_found",
            RedemptionOutcome::Exhausted => "exhausted",
            RedemptionOutcome::Expired => "expired",
            RedemptionOutcome::Unauthorized => "unauthorized",
            RedemptionOutcome::AlreadyMember => "already_member",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RedemptionOutcome::Success(_))
    }
}

/// Request to create a new invite.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateInviteRequest {
    /// Restrict the invite to this user.
    #[validate(custom(function = "shared::validation::validate_username"))]
    pub invited_username: Option<String>,

    /// Defaults to true. Targeted invites must be one-time-use.
    pub one_time_use: Option<bool>,

    /// Must be strictly in the future when set.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Response after creating an invite.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CreateInviteResponse {
    pub id: Uuid,
    pub group_id: Uuid,
    pub code: String,
    pub invited_user_id: Option<Uuid>,
    pub one_time_use: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub invite_url: String,
}

/// Summary of an invite for listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct InviteSummary {
    pub id: Uuid,
    pub code: String,
    pub invited_user_id: Option<Uuid>,
    pub one_time_use: bool,
    pub times_used: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub state: InviteState,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl InviteSummary {
    pub fn from_invite(invite: Invite, now: DateTime<Utc>) -> Self {
        let state = invite.state_at(now);
        Self {
            id: invite.id,
            code: invite.code,
            invited_user_id: invite.invited_user_id,
            one_time_use: invite.one_time_use,
            times_used: invite.times_used,
            expires_at: invite.expires_at,
            state,
            created_by: invite.created_by,
            created_at: invite.created_at,
        }
    }
}

/// Response for listing invites.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListInvitesResponse {
    pub data: Vec<InviteSummary>,
}

/// Public invite info (for GET /invites/:code without auth).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PublicInviteInfo {
    pub group_name: String,
    pub member_count: i64,
    pub targeted: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_valid: bool,
}

/// Request to join a group using an invite code.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct RedeemInviteRequest {
    #[validate(custom(function = "shared::validation::validate_invite_code"))]
    pub code: String,
}

/// Response after redeeming an invite.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RedeemInviteResponse {
    pub group_id: Uuid,
    pub membership: super::group::MemberResponse,
}
