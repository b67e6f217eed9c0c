//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod group;
pub mod invite;
pub mod user;

pub use group::{GroupEntity, GroupMembershipEntity, GroupRoleDb, PrivacyLevelDb};
pub use invite::GroupInviteEntity;
pub use user::UserEntity;
