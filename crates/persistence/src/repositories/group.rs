//! Group repository for database operations.

use async_trait::async_trait;
use domain::models::{Group, GroupMembership};
use domain::store::{GroupChanges, GroupStore, NewGroup, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{GroupEntity, GroupMembershipEntity, GroupRoleDb, PrivacyLevelDb};
use crate::error::map_sqlx_error;
use crate::metrics::QueryTimer;

const GROUP_COLUMNS: &str = "id, name, description, owner_id, privacy, created_at, updated_at";

/// Repository for group-related database operations.
#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    /// Creates a new GroupRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_with_owner(
        &self,
        new: NewGroup,
    ) -> Result<(GroupEntity, GroupMembershipEntity), sqlx::Error> {
        // Group row and owner membership commit together.
        let mut tx = self.pool.begin().await?;

        let group = sqlx::query_as::<_, GroupEntity>(&format!(
            r#"
            INSERT INTO groups (name, description, owner_id, privacy)
            VALUES ($1, $2, $3, $4)
            RETURNING {GROUP_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.owner_id)
        .bind(PrivacyLevelDb::from(new.privacy))
        .fetch_one(&mut *tx)
        .await?;

        let owner = sqlx::query_as::<_, GroupMembershipEntity>(
            r#"
            INSERT INTO group_memberships (group_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING id, group_id, user_id, role, invite_id, joined_at, updated_at
            "#,
        )
        .bind(group.id)
        .bind(new.owner_id)
        .bind(GroupRoleDb::Owner)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((group, owner))
    }
}

#[async_trait]
impl GroupStore for GroupRepository {
    async fn create_group(&self, new: NewGroup) -> Result<(Group, GroupMembership), StoreError> {
        let timer = QueryTimer::new("create_group");
        let result = self.insert_with_owner(new).await;
        timer.finish(&result);
        let (group, owner) = result.map_err(map_sqlx_error)?;
        Ok((group.into(), owner.into()))
    }

    async fn find_group(&self, group_id: Uuid) -> Result<Option<Group>, StoreError> {
        let timer = QueryTimer::new("find_group_by_id");
        let result = sqlx::query_as::<_, GroupEntity>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE id = $1"
        ))
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result.map_err(map_sqlx_error)?.map(Into::into))
    }

    async fn find_groups_by_owner(&self, owner_id: Uuid) -> Result<Vec<Group>, StoreError> {
        let timer = QueryTimer::new("find_groups_by_owner");
        let result = sqlx::query_as::<_, GroupEntity>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE owner_id = $1 ORDER BY created_at"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result
            .map_err(map_sqlx_error)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn update_group(
        &self,
        group_id: Uuid,
        changes: GroupChanges,
    ) -> Result<Option<Group>, StoreError> {
        let timer = QueryTimer::new("update_group");
        let result = sqlx::query_as::<_, GroupEntity>(&format!(
            r#"
            UPDATE groups
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                privacy = COALESCE($4, privacy),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {GROUP_COLUMNS}
            "#
        ))
        .bind(group_id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.privacy.map(PrivacyLevelDb::from))
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result.map_err(map_sqlx_error)?.map(Into::into))
    }

    async fn delete_group(&self, group_id: Uuid) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("delete_group");
        // Memberships and invites go with the group via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(group_id)
            .execute(&self.pool)
            .await;
        timer.finish(&result);
        Ok(result.map_err(map_sqlx_error)?.rows_affected() > 0)
    }
}
