//! Authorization resolver.
//!
//! Answers "what role does this user hold in this group" from the
//! membership store. Absence of a group or membership is a normal outcome;
//! only storage failures are errors.

use std::sync::Arc;
use uuid::Uuid;

use crate::models::{GroupRole, Principal};
use crate::store::{GroupStore, MembershipStore, StoreError, Stores};

/// Read-only role queries over the membership store.
#[derive(Clone)]
pub struct AuthorizationResolver {
    groups: Arc<dyn GroupStore>,
    memberships: Arc<dyn MembershipStore>,
}

impl AuthorizationResolver {
    pub fn new(stores: &Stores) -> Self {
        Self {
            groups: stores.groups.clone(),
            memberships: stores.memberships.clone(),
        }
    }

    /// User id of the caller, or `None` when unauthenticated.
    pub fn resolve_user_id(principal: Option<&Principal>) -> Option<Uuid> {
        principal.map(|p| p.user_id)
    }

    pub async fn group_exists(&self, group_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.groups.find_group(group_id).await?.is_some())
    }

    /// The user's role, or `None` if the group does not exist or the user
    /// is not a member.
    pub async fn role_in_group(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<GroupRole>, StoreError> {
        let membership = self.memberships.find_membership(group_id, user_id).await?;
        Ok(membership.map(|m| m.role))
    }

    pub async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        self.has_role(group_id, user_id, GroupRole::Member).await
    }

    pub async fn is_moderator(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        self.has_role(group_id, user_id, GroupRole::Moderator).await
    }

    /// True for the group's owner and for system administrators, who hold
    /// owner-equivalent authority without a membership row.
    pub async fn is_owner(&self, group_id: Uuid, principal: &Principal) -> Result<bool, StoreError> {
        if principal.is_admin {
            return Ok(true);
        }
        self.has_role(group_id, principal.user_id, GroupRole::Owner)
            .await
    }

    async fn has_role(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        required: GroupRole,
    ) -> Result<bool, StoreError> {
        Ok(self
            .role_in_group(group_id, user_id)
            .await?
            .is_some_and(|role| role.at_least(required)))
    }
}
