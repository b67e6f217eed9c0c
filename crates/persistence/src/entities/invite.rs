//! Invite entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::Invite;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the group_invites table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupInviteEntity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub created_by: Uuid,
    pub invited_user_id: Option<Uuid>,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub one_time_use: bool,
    pub used: bool,
    pub times_used: i32,
}

impl From<GroupInviteEntity> for Invite {
    fn from(entity: GroupInviteEntity) -> Self {
        Self {
            id: entity.id,
            group_id: entity.group_id,
            created_by: entity.created_by,
            invited_user_id: entity.invited_user_id,
            code: entity.code,
            created_at: entity.created_at,
            expires_at: entity.expires_at,
            one_time_use: entity.one_time_use,
            used: entity.used,
            times_used: entity.times_used,
        }
    }
}
