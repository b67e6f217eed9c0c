//! Group and membership entities (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Group, GroupMembership, GroupRole, PrivacyLevel};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for group_role that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "group_role", rename_all = "lowercase")]
pub enum GroupRoleDb {
    Member,
    Moderator,
    Owner,
}

impl From<GroupRoleDb> for GroupRole {
    fn from(db_role: GroupRoleDb) -> Self {
        match db_role {
            GroupRoleDb::Member => GroupRole::Member,
            GroupRoleDb::Moderator => GroupRole::Moderator,
            GroupRoleDb::Owner => GroupRole::Owner,
        }
    }
}

impl From<GroupRole> for GroupRoleDb {
    fn from(role: GroupRole) -> Self {
        match role {
            GroupRole::Member => GroupRoleDb::Member,
            GroupRole::Moderator => GroupRoleDb::Moderator,
            GroupRole::Owner => GroupRoleDb::Owner,
        }
    }
}

/// Database enum for group_privacy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "group_privacy", rename_all = "snake_case")]
pub enum PrivacyLevelDb {
    Open,
    ModeratorInvite,
    OwnerInvite,
}

impl From<PrivacyLevelDb> for PrivacyLevel {
    fn from(db: PrivacyLevelDb) -> Self {
        match db {
            PrivacyLevelDb::Open => PrivacyLevel::Open,
            PrivacyLevelDb::ModeratorInvite => PrivacyLevel::ModeratorInvite,
            PrivacyLevelDb::OwnerInvite => PrivacyLevel::OwnerInvite,
        }
    }
}

impl From<PrivacyLevel> for PrivacyLevelDb {
    fn from(level: PrivacyLevel) -> Self {
        match level {
            PrivacyLevel::Open => PrivacyLevelDb::Open,
            PrivacyLevel::ModeratorInvite => PrivacyLevelDb::ModeratorInvite,
            PrivacyLevel::OwnerInvite => PrivacyLevelDb::OwnerInvite,
        }
    }
}

/// Database row mapping for the groups table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupEntity {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub privacy: PrivacyLevelDb,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GroupEntity> for Group {
    fn from(entity: GroupEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            description: entity.description,
            owner_id: entity.owner_id,
            privacy: entity.privacy.into(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the group_memberships table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupMembershipEntity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: GroupRoleDb,
    pub invite_id: Option<Uuid>,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GroupMembershipEntity> for GroupMembership {
    fn from(entity: GroupMembershipEntity) -> Self {
        Self {
            id: entity.id,
            group_id: entity.group_id,
            user_id: entity.user_id,
            role: entity.role.into(),
            invite_id: entity.invite_id,
            joined_at: entity.joined_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_role_db_conversion() {
        for role in [GroupRole::Member, GroupRole::Moderator, GroupRole::Owner] {
            let db: GroupRoleDb = role.into();
            assert_eq!(GroupRole::from(db), role);
        }
    }

    #[test]
    fn test_privacy_level_db_conversion() {
        for level in [
            PrivacyLevel::Open,
            PrivacyLevel::ModeratorInvite,
            PrivacyLevel::OwnerInvite,
        ] {
            let db: PrivacyLevelDb = level.into();
            assert_eq!(PrivacyLevel::from(db), level);
        }
    }

    #[test]
    fn test_membership_entity_conversion() {
        let now = Utc::now();
        let invite_id = Uuid::new_v4();
        let entity = GroupMembershipEntity {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role: GroupRoleDb::Moderator,
            invite_id: Some(invite_id),
            joined_at: now,
            updated_at: now,
        };

        let membership: GroupMembership = entity.into();
        assert_eq!(membership.role, GroupRole::Moderator);
        assert_eq!(membership.invite_id, Some(invite_id));
    }
}
