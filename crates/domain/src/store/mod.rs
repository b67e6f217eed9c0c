//! Storage contract consumed by the authorization and invite services.
//!
//! The PostgreSQL implementation lives in the `persistence` crate; an
//! in-memory implementation with the same guarantees lives in [`memory`].

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Group, GroupMembership, GroupRole, Invite, PrivacyLevel, User};

/// Constraint name for the one-membership-per-user-per-group rule.
pub const MEMBERSHIP_UNIQUE_CONSTRAINT: &str = "group_memberships_group_id_user_id_key";

/// Constraint name for case-insensitive invite code uniqueness.
pub const INVITE_CODE_UNIQUE_CONSTRAINT: &str = "idx_group_invites_code_upper";

/// Constraint name for the rule that an invite expires after it is created.
pub const INVITE_EXPIRY_CONSTRAINT: &str = "group_invites_expiry_after_creation";

/// Errors surfaced by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// The conditional invite usage update matched no row: a concurrent
    /// redemption consumed the one-time invite first.
    #[error("Invite already consumed")]
    InviteConsumed,

    #[error("Check constraint violated: {constraint}")]
    CheckViolation { constraint: String },

    #[error("Record not found")]
    NotFound,

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn unique_violation(constraint: impl Into<String>) -> Self {
        StoreError::UniqueViolation {
            constraint: constraint.into(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }
}

// ============================================================================
// Write records
// ============================================================================

/// Input for provisioning a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
}

/// Input for creating a group together with its owner membership.
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub privacy: PrivacyLevel,
}

/// Partial update of group settings. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct GroupChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub privacy: Option<PrivacyLevel>,
}

/// Input for a membership row.
#[derive(Debug, Clone)]
pub struct NewMembership {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: GroupRole,
    pub invite_id: Option<Uuid>,
}

/// Input for an invite row. The code must already be normalized.
///
/// `created_at` is written as given, so the expiry constraint is checked
/// against the same instant the creation rules used.
#[derive(Debug, Clone)]
pub struct NewInvite {
    pub group_id: Uuid,
    pub created_by: Uuid,
    pub invited_user_id: Option<Uuid>,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub one_time_use: bool,
}

/// Usage bump applied to an invite when a redemption commits.
///
/// For one-time invites the update only applies while the invite is still
/// unused; otherwise the commit fails with [`StoreError::InviteConsumed`].
#[derive(Debug, Clone, Copy)]
pub struct InviteUsageUpdate {
    pub invite_id: Uuid,
    pub one_time_use: bool,
}

// ============================================================================
// Store traits
// ============================================================================

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    /// Case-insensitive lookup.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Inserts the group and the owner's `Owner` membership atomically.
    async fn create_group(&self, group: NewGroup) -> Result<(Group, GroupMembership), StoreError>;

    async fn find_group(&self, group_id: Uuid) -> Result<Option<Group>, StoreError>;

    async fn find_groups_by_owner(&self, owner_id: Uuid) -> Result<Vec<Group>, StoreError>;

    async fn update_group(
        &self,
        group_id: Uuid,
        changes: GroupChanges,
    ) -> Result<Option<Group>, StoreError>;

    /// Deletes the group with its memberships and invites. Returns false if
    /// the group did not exist.
    async fn delete_group(&self, group_id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn find_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<GroupMembership>, StoreError>;

    async fn list_memberships(&self, group_id: Uuid) -> Result<Vec<GroupMembership>, StoreError>;

    async fn count_members(&self, group_id: Uuid) -> Result<i64, StoreError>;

    /// Fails with [`StoreError::UniqueViolation`] if the user is already a member.
    async fn add_membership(&self, membership: NewMembership)
        -> Result<GroupMembership, StoreError>;

    async fn update_membership_role(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRole,
    ) -> Result<Option<GroupMembership>, StoreError>;

    async fn remove_membership(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait InviteStore: Send + Sync {
    async fn find_invite_by_id(&self, invite_id: Uuid) -> Result<Option<Invite>, StoreError>;

    /// Case-insensitive lookup.
    async fn find_invite_by_code(&self, code: &str) -> Result<Option<Invite>, StoreError>;

    /// Case-insensitive existence check across all invites.
    async fn code_exists(&self, code: &str) -> Result<bool, StoreError>;

    async fn create_invite(&self, invite: NewInvite) -> Result<Invite, StoreError>;

    async fn list_invites(&self, group_id: Uuid) -> Result<Vec<Invite>, StoreError>;

    /// Inserts the membership and applies the usage update in one unit of
    /// work. Nothing is persisted when either step fails.
    async fn commit_redemption(
        &self,
        membership: NewMembership,
        usage: InviteUsageUpdate,
    ) -> Result<GroupMembership, StoreError>;
}

/// Handles to every store, shared by services and request handlers.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub groups: Arc<dyn GroupStore>,
    pub memberships: Arc<dyn MembershipStore>,
    pub invites: Arc<dyn InviteStore>,
}

impl Stores {
    /// Uses one backend for every store.
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: UserStore + GroupStore + MembershipStore + InviteStore + 'static,
    {
        Self {
            users: backend.clone(),
            groups: backend.clone(),
            memberships: backend.clone(),
            invites: backend,
        }
    }

    /// Creates stores backed by a fresh [`memory::InMemoryStore`].
    pub fn in_memory() -> (Self, Arc<memory::InMemoryStore>) {
        let backend = Arc::new(memory::InMemoryStore::new());
        (Self::from_backend(backend.clone()), backend)
    }
}
