//! Invite repository for database operations.

use async_trait::async_trait;
use domain::models::{GroupMembership, Invite};
use domain::store::{InviteStore, InviteUsageUpdate, NewInvite, NewMembership, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use super::membership::MEMBERSHIP_COLUMNS;
use crate::entities::{GroupInviteEntity, GroupMembershipEntity, GroupRoleDb};
use crate::error::map_sqlx_error;
use crate::metrics::QueryTimer;

const INVITE_COLUMNS: &str = "id, group_id, created_by, invited_user_id, code, created_at, \
                              expires_at, one_time_use, used, times_used";

/// Repository for invite-related database operations.
#[derive(Clone)]
pub struct InviteRepository {
    pool: PgPool,
}

impl InviteRepository {
    /// Creates a new InviteRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Membership insert followed by the conditional usage update, in one
    /// transaction. Dropping the transaction on an early return rolls it back.
    async fn redeem_in_transaction(
        &self,
        membership: NewMembership,
        usage: InviteUsageUpdate,
    ) -> Result<GroupMembership, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // A concurrent redemption by the same user blocks here on the
        // (group_id, user_id) unique index, then fails with 23505.
        let created = sqlx::query_as::<_, GroupMembershipEntity>(&format!(
            r#"
            INSERT INTO group_memberships (group_id, user_id, role, invite_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {MEMBERSHIP_COLUMNS}
            "#
        ))
        .bind(membership.group_id)
        .bind(membership.user_id)
        .bind(GroupRoleDb::from(membership.role))
        .bind(membership.invite_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        // For one-time invites the row lock serializes competing updates; the
        // loser re-evaluates the predicate against the committed row and
        // matches nothing.
        let updated = sqlx::query(
            r#"
            UPDATE group_invites
            SET times_used = times_used + 1,
                used = used OR $2
            WHERE id = $1 AND NOT (one_time_use AND used)
            "#,
        )
        .bind(usage.invite_id)
        .bind(usage.one_time_use)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Err(StoreError::InviteConsumed);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(created.into())
    }
}

#[async_trait]
impl InviteStore for InviteRepository {
    async fn find_invite_by_id(&self, invite_id: Uuid) -> Result<Option<Invite>, StoreError> {
        let timer = QueryTimer::new("find_invite_by_id");
        let result = sqlx::query_as::<_, GroupInviteEntity>(&format!(
            "SELECT {INVITE_COLUMNS} FROM group_invites WHERE id = $1"
        ))
        .bind(invite_id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result.map_err(map_sqlx_error)?.map(Into::into))
    }

    async fn find_invite_by_code(&self, code: &str) -> Result<Option<Invite>, StoreError> {
        let timer = QueryTimer::new("find_invite_by_code");
        let result = sqlx::query_as::<_, GroupInviteEntity>(&format!(
            "SELECT {INVITE_COLUMNS} FROM group_invites WHERE UPPER(code) = UPPER($1)"
        ))
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result.map_err(map_sqlx_error)?.map(Into::into))
    }

    async fn code_exists(&self, code: &str) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("check_invite_code_exists");
        let result = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM group_invites WHERE UPPER(code) = UPPER($1))",
        )
        .bind(code.trim())
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        result.map_err(map_sqlx_error)
    }

    async fn create_invite(&self, invite: NewInvite) -> Result<Invite, StoreError> {
        let timer = QueryTimer::new("create_invite");
        let result = sqlx::query_as::<_, GroupInviteEntity>(&format!(
            r#"
            INSERT INTO group_invites
                (group_id, created_by, invited_user_id, code, created_at, expires_at, one_time_use)
            VALUES ($1, $2, $3, UPPER($4), $5, $6, $7)
            RETURNING {INVITE_COLUMNS}
            "#
        ))
        .bind(invite.group_id)
        .bind(invite.created_by)
        .bind(invite.invited_user_id)
        .bind(&invite.code)
        .bind(invite.created_at)
        .bind(invite.expires_at)
        .bind(invite.one_time_use)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result.map_err(map_sqlx_error)?.into())
    }

    async fn list_invites(&self, group_id: Uuid) -> Result<Vec<Invite>, StoreError> {
        let timer = QueryTimer::new("list_group_invites");
        let result = sqlx::query_as::<_, GroupInviteEntity>(&format!(
            r#"
            SELECT {INVITE_COLUMNS}
            FROM group_invites
            WHERE group_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result
            .map_err(map_sqlx_error)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn commit_redemption(
        &self,
        membership: NewMembership,
        usage: InviteUsageUpdate,
    ) -> Result<GroupMembership, StoreError> {
        let timer = QueryTimer::new("commit_invite_redemption");
        let result = self.redeem_in_transaction(membership, usage).await;
        if matches!(result, Err(StoreError::Unavailable(_))) {
            crate::metrics::record_query_error("commit_invite_redemption");
        }
        timer.record();
        result
    }
}
