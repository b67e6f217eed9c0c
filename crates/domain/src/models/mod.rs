//! Domain models for calendar groups.

pub mod group;
pub mod invite;
pub mod role;
pub mod user;

pub use group::{Group, GroupMembership, PrivacyLevel};
pub use invite::{CreateInviteRequest, Invite, InviteState, RedemptionOutcome};
pub use role::{role_at_least, GroupRole};
pub use user::{Principal, User};
