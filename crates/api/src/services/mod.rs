//! Application services.

pub mod bootstrap;

pub use bootstrap::{bootstrap, BootstrapError, BootstrapReport};
