//! Repository implementations of the domain storage traits.

pub mod group;
pub mod invite;
pub mod membership;
pub mod user;

use domain::store::Stores;
use sqlx::PgPool;
use std::sync::Arc;

pub use group::GroupRepository;
pub use invite::InviteRepository;
pub use membership::MembershipRepository;
pub use user::UserRepository;

/// PostgreSQL-backed storage.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Store handles backed by this pool.
    pub fn stores(&self) -> Stores {
        Stores {
            users: Arc::new(UserRepository::new(self.pool.clone())),
            groups: Arc::new(GroupRepository::new(self.pool.clone())),
            memberships: Arc::new(MembershipRepository::new(self.pool.clone())),
            invites: Arc::new(InviteRepository::new(self.pool.clone())),
        }
    }
}
