//! Named group policies.
//!
//! Each policy reads the group id from a route parameter and delegates to
//! the matching [`AuthorizationResolver`] predicate. They hold no logic of
//! their own beyond failing closed on missing input.

use std::collections::HashMap;
use uuid::Uuid;

use super::authorization::AuthorizationResolver;
use crate::models::{GroupRole, Principal};
use crate::store::StoreError;

/// Route parameter holding the group id unless configured otherwise.
pub const DEFAULT_GROUP_KEY: &str = "group_id";

/// Result of evaluating a policy against a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOutcome {
    Allow { group_id: Uuid, user_id: Uuid },
    /// No authenticated caller.
    Challenge,
    /// Group id missing, malformed, or unknown.
    NotFound,
    Forbidden,
}

/// A group gate: Member, Moderator or Owner.
#[derive(Debug, Clone)]
pub struct GroupPolicy {
    required: GroupRole,
    group_key: String,
}

impl GroupPolicy {
    pub fn member() -> Self {
        Self::requiring(GroupRole::Member)
    }

    pub fn moderator() -> Self {
        Self::requiring(GroupRole::Moderator)
    }

    /// Satisfied by the group's owner or any system administrator.
    pub fn owner() -> Self {
        Self::requiring(GroupRole::Owner)
    }

    fn requiring(required: GroupRole) -> Self {
        Self {
            required,
            group_key: DEFAULT_GROUP_KEY.to_string(),
        }
    }

    /// Read the group id from a different route parameter.
    pub fn with_group_key(mut self, key: impl Into<String>) -> Self {
        self.group_key = key.into();
        self
    }

    pub fn required_role(&self) -> GroupRole {
        self.required
    }

    pub fn group_key(&self) -> &str {
        &self.group_key
    }

    /// Evaluate the policy for `principal` against the route parameters.
    pub async fn check(
        &self,
        resolver: &AuthorizationResolver,
        principal: Option<&Principal>,
        params: &HashMap<String, String>,
    ) -> Result<PolicyOutcome, StoreError> {
        let (Some(principal), Some(user_id)) =
            (principal, AuthorizationResolver::resolve_user_id(principal))
        else {
            return Ok(PolicyOutcome::Challenge);
        };

        let Some(group_id) = params
            .get(&self.group_key)
            .and_then(|raw| Uuid::parse_str(raw).ok())
        else {
            return Ok(PolicyOutcome::NotFound);
        };

        if !resolver.group_exists(group_id).await? {
            return Ok(PolicyOutcome::NotFound);
        }

        let allowed = match self.required {
            GroupRole::Member => resolver.is_member(group_id, user_id).await?,
            GroupRole::Moderator => resolver.is_moderator(group_id, user_id).await?,
            GroupRole::Owner => resolver.is_owner(group_id, principal).await?,
        };

        if allowed {
            Ok(PolicyOutcome::Allow { group_id, user_id })
        } else {
            tracing::debug!(
                %group_id,
                %user_id,
                required = %self.required,
                "group policy denied"
            );
            Ok(PolicyOutcome::Forbidden)
        }
    }
}
