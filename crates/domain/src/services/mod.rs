//! Domain services for calendar groups.
//!
//! Services hold the authorization and invite rules and talk to storage
//! only through the traits in [`crate::store`].

pub mod authorization;
pub mod invites;
pub mod policy;
pub mod redemption;

pub use authorization::AuthorizationResolver;
pub use invites::{
    CreateInviteValidation, InviteError, InviteManager, InviteSettings, ValidatedInvite,
};
pub use policy::{GroupPolicy, PolicyOutcome, DEFAULT_GROUP_KEY};
pub use redemption::RedemptionService;
