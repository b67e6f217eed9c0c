//! Invite redemption.
//!
//! A redemption loads the invite, checks it against the redeeming user,
//! then commits the new membership and the invite usage bump in one unit of
//! work. Concurrent redemptions are resolved by the storage layer: the
//! unique `(group_id, user_id)` constraint rejects duplicate memberships and
//! the conditional usage update rejects a second consumer of a one-time
//! invite. Both signals map back to ordinary outcomes here.

use chrono::{DateTime, Utc};
use shared::invite_code::normalize_code;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{GroupRole, Invite, RedemptionOutcome};
use crate::store::{
    InviteStore, InviteUsageUpdate, MembershipStore, NewMembership, StoreError, Stores,
};

/// Converts invites into memberships.
#[derive(Clone)]
pub struct RedemptionService {
    invites: Arc<dyn InviteStore>,
    memberships: Arc<dyn MembershipStore>,
}

impl RedemptionService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            invites: stores.invites.clone(),
            memberships: stores.memberships.clone(),
        }
    }

    /// Redeem an invite code (case-insensitive) for `user_id`.
    pub async fn redeem_invite(
        &self,
        code: &str,
        user_id: Uuid,
    ) -> Result<RedemptionOutcome, StoreError> {
        self.redeem_invite_at(code, user_id, Utc::now()).await
    }

    /// Redeem an invite code as of `now`.
    pub async fn redeem_invite_at(
        &self,
        code: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RedemptionOutcome, StoreError> {
        let invite = self.invites.find_invite_by_code(&normalize_code(code)).await?;
        self.redeem(invite, user_id, now).await
    }

    /// Redeem an invite by its id.
    pub async fn redeem_invite_by_id(
        &self,
        invite_id: Uuid,
        user_id: Uuid,
    ) -> Result<RedemptionOutcome, StoreError> {
        let invite = self.invites.find_invite_by_id(invite_id).await?;
        self.redeem(invite, user_id, Utc::now()).await
    }

    async fn redeem(
        &self,
        invite: Option<Invite>,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RedemptionOutcome, StoreError> {
        let outcome = self.try_redeem(invite, user_id, now).await?;
        match &outcome {
            RedemptionOutcome::Success(membership) => tracing::info!(
                group_id = %membership.group_id,
                %user_id,
                invite_id = ?membership.invite_id,
                "invite redeemed"
            ),
            other => tracing::debug!(%user_id, outcome = other.as_str(), "invite not redeemed"),
        }
        Ok(outcome)
    }

    async fn try_redeem(
        &self,
        invite: Option<Invite>,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RedemptionOutcome, StoreError> {
        let Some(invite) = invite else {
            return Ok(RedemptionOutcome::NotFound);
        };

        // A targeted invite is reported as unauthorized for anyone else,
        // whatever its usage or expiry.
        if invite.excludes(user_id) {
            return Ok(RedemptionOutcome::Unauthorized);
        }

        if self.is_member(invite.group_id, user_id).await? {
            return Ok(RedemptionOutcome::AlreadyMember);
        }

        if invite.is_exhausted() {
            return Ok(RedemptionOutcome::Exhausted);
        }

        if invite.is_expired_at(now) {
            return Ok(RedemptionOutcome::Expired);
        }

        let membership = NewMembership {
            group_id: invite.group_id,
            user_id,
            role: GroupRole::Member,
            invite_id: Some(invite.id),
        };
        let usage = InviteUsageUpdate {
            invite_id: invite.id,
            one_time_use: invite.one_time_use,
        };

        match self.invites.commit_redemption(membership, usage).await {
            Ok(created) => Ok(RedemptionOutcome::Success(created)),
            Err(err @ StoreError::UniqueViolation { .. }) => {
                // Lost a race against a concurrent redemption by the same user.
                if self.is_member(invite.group_id, user_id).await? {
                    Ok(RedemptionOutcome::AlreadyMember)
                } else {
                    Err(err)
                }
            }
            Err(StoreError::InviteConsumed) => Ok(RedemptionOutcome::Exhausted),
            // The group or invite was deleted between the load and the commit.
            Err(StoreError::NotFound) => Ok(RedemptionOutcome::NotFound),
            Err(err) => {
                tracing::error!(invite_id = %invite.id, %user_id, error = %err, "redemption commit failed");
                Err(err)
            }
        }
    }

    async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .memberships
            .find_membership(group_id, user_id)
            .await?
            .is_some())
    }
}
