//! Domain layer for the calendar groups backend.
//!
//! This crate contains:
//! - Domain models (roles, groups, memberships, invites, users)
//! - The storage contract the core relies on, plus an in-memory implementation
//! - Authorization, policy, invite and redemption services

pub mod models;
pub mod services;
pub mod store;
