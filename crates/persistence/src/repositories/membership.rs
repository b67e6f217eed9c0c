//! Membership repository for database operations.

use async_trait::async_trait;
use domain::models::{GroupMembership, GroupRole};
use domain::store::{MembershipStore, NewMembership, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{GroupMembershipEntity, GroupRoleDb};
use crate::error::map_sqlx_error;
use crate::metrics::QueryTimer;

pub(crate) const MEMBERSHIP_COLUMNS: &str =
    "id, group_id, user_id, role, invite_id, joined_at, updated_at";

/// Repository for group membership rows.
#[derive(Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    /// Creates a new MembershipRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipStore for MembershipRepository {
    async fn find_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<GroupMembership>, StoreError> {
        let timer = QueryTimer::new("find_membership");
        let result = sqlx::query_as::<_, GroupMembershipEntity>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM group_memberships WHERE group_id = $1 AND user_id = $2"
        ))
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result.map_err(map_sqlx_error)?.map(Into::into))
    }

    async fn list_memberships(&self, group_id: Uuid) -> Result<Vec<GroupMembership>, StoreError> {
        let timer = QueryTimer::new("list_memberships");
        // group_role enum order is member < moderator < owner.
        let result = sqlx::query_as::<_, GroupMembershipEntity>(&format!(
            r#"
            SELECT {MEMBERSHIP_COLUMNS}
            FROM group_memberships
            WHERE group_id = $1
            ORDER BY role DESC, joined_at ASC
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

    async fn count_members(&self, group_id: Uuid) -> Result<i64, StoreError> {
        let timer = QueryTimer::new("count_group_members");
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM group_memberships WHERE group_id = $1",
        )
        .bind(group_id)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        result.map_err(map_sqlx_error)
    }

    async fn add_membership(
        &self,
        membership: NewMembership,
    ) -> Result<GroupMembership, StoreError> {
        let timer = QueryTimer::new("add_membership");
        let result = sqlx::query_as::<_, GroupMembershipEntity>(&format!(
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
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result.map_err(map_sqlx_error)?.into())
    }

    async fn update_membership_role(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRole,
    ) -> Result<Option<GroupMembership>, StoreError> {
        let timer = QueryTimer::new("update_membership_role");
        let result = sqlx::query_as::<_, GroupMembershipEntity>(&format!(
            r#"
            UPDATE group_memberships
            SET role = $3, updated_at = NOW()
            WHERE group_id = $1 AND user_id = $2
            RETURNING {MEMBERSHIP_COLUMNS}
            "#
        ))
        .bind(group_id)
        .bind(user_id)
        .bind(GroupRoleDb::from(role))
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result.map_err(map_sqlx_error)?.map(Into::into))
    }

    async fn remove_membership(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("remove_membership");
        let result =
            sqlx::query("DELETE FROM group_memberships WHERE group_id = $1 AND user_id = $2")
                .bind(group_id)
                .bind(user_id)
                .execute(&self.pool)
                .await;
        timer.finish(&result);
        Ok(result.map_err(map_sqlx_error)?.rows_affected() > 0)
    }
}
