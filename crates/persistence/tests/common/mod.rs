//! Common test utilities for PostgreSQL-backed tests.
//!
//! Tests run against the database named by `TEST_DATABASE_URL` and are
//! skipped when it is unset. Every test provisions its own users, groups and
//! invites, so tests can share one database without truncating it.

// Not every test binary uses every helper.
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use domain::models::{Group, Invite, PrivacyLevel, User};
use domain::store::{NewGroup, NewInvite, NewUser, Stores};
use persistence::db::{create_pool, run_migrations, DatabaseConfig};
use persistence::PostgresStore;
use sqlx::PgPool;
use uuid::Uuid;

/// Connects to the test database and applies migrations.
///
/// Returns `None` when `TEST_DATABASE_URL` is unset.
pub async fn create_test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping PostgreSQL test");
        return None;
    };

    let pool = create_pool(&DatabaseConfig {
        url,
        max_connections: 20,
        min_connections: 1,
        connect_timeout_secs: 10,
        idle_timeout_secs: 60,
    })
    .await
    .expect("Failed to connect to test database");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    Some(pool)
}

/// A migrated pool plus store handles over it.
pub struct TestDb {
    pub pool: PgPool,
    pub stores: Stores,
}

pub async fn test_db() -> Option<TestDb> {
    let pool = create_test_pool().await?;
    let stores = PostgresStore::new(pool.clone()).stores();
    Some(TestDb { pool, stores })
}

/// A code no other test run will produce.
pub fn unique_code() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_ascii_uppercase()
}

impl TestDb {
    pub async fn create_user(&self) -> User {
        self.stores
            .users
            .create_user(NewUser {
                username: format!("pg_{}", &Uuid::new_v4().simple().to_string()[..16]),
                display_name: None,
                is_admin: false,
            })
            .await
            .expect("Failed to create test user")
    }

    pub async fn create_group(&self, owner: &User) -> Group {
        self.stores
            .groups
            .create_group(NewGroup {
                name: "Postgres Group".to_string(),
                description: None,
                owner_id: owner.id,
                privacy: PrivacyLevel::Open,
            })
            .await
            .expect("Failed to create test group")
            .0
    }

    pub async fn create_invite(&self, group: &Group, one_time_use: bool) -> Invite {
        self.create_invite_at(group, one_time_use, Utc::now(), None)
            .await
            .expect("Failed to create test invite")
    }

    pub async fn create_invite_at(
        &self,
        group: &Group,
        one_time_use: bool,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Invite, domain::store::StoreError> {
        self.stores
            .invites
            .create_invite(NewInvite {
                group_id: group.id,
                created_by: group.owner_id,
                invited_user_id: None,
                code: unique_code(),
                created_at,
                expires_at,
                one_time_use,
            })
            .await
    }

    /// Membership rows for `user_id` in `group_id`, read straight from the table.
    pub async fn membership_rows(&self, group_id: Uuid, user_id: Uuid) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM group_memberships WHERE group_id = $1 AND user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to count memberships")
    }

    pub async fn times_used(&self, invite_id: Uuid) -> i32 {
        sqlx::query_scalar::<_, i32>("SELECT times_used FROM group_invites WHERE id = $1")
            .bind(invite_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to read invite usage")
    }
}
