//! Shared utilities and common types for the calendar groups backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Invite code alphabet and secure random generation
//! - JWT issuing and validation for authenticated principals
//! - Common validation logic

pub mod invite_code;
pub mod jwt;
pub mod validation;
