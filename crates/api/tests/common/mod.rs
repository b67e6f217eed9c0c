//! Common test utilities for integration tests.
//!
//! Tests drive the full router against the in-memory store, so no database
//! is needed. Tokens are signed with a shared HS256 secret.

// Not every test binary uses every helper.
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use calendar_groups_api::{
    app::{create_app, AppState},
    config::{
        BootstrapConfig, Config, DatabaseConfig, InviteConfig, JwtAuthConfig, LoggingConfig,
        SecurityConfig, ServerConfig,
    },
};
use domain::models::{Group, PrivacyLevel, User};
use domain::store::{memory::InMemoryStore, NewGroup, NewUser, Stores};
use fake::{faker::internet::en::Username, Fake};
use serde_json::Value;
use shared::jwt::JwtConfig;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret";
pub const TEST_APP_BASE_URL: &str = "http://localhost:3000";

/// Test configuration. The database URL is unused by the in-memory store.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            app_base_url: TEST_APP_BASE_URL.to_string(),
        },
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig::default(),
        jwt: JwtAuthConfig {
            private_key: String::new(),
            public_key: String::new(),
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_secs: 3600,
            leeway_secs: 0,
        },
        invites: InviteConfig::default(),
        bootstrap: BootstrapConfig::default(),
    }
}

/// A router plus direct access to its stores.
pub struct TestApp {
    pub router: Router,
    pub stores: Stores,
    pub backend: Arc<InMemoryStore>,
    pub jwt: JwtConfig,
}

pub fn spawn_app() -> TestApp {
    let (stores, backend) = Stores::in_memory();
    let jwt = JwtConfig::with_secret(TEST_JWT_SECRET, 3600);
    let state = AppState::new(test_config(), jwt.clone(), stores.clone());
    TestApp {
        router: create_app(state),
        stores,
        backend,
        jwt,
    }
}

/// A unique, valid username.
pub fn unique_username() -> String {
    let base: String = Username().fake();
    let base: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(40)
        .collect();
    format!("{}_{}", base, &Uuid::new_v4().simple().to_string()[..8])
}

impl TestApp {
    pub async fn create_user(&self) -> User {
        self.create_user_with(false).await
    }

    pub async fn create_admin(&self) -> User {
        self.create_user_with(true).await
    }

    async fn create_user_with(&self, is_admin: bool) -> User {
        self.stores
            .users
            .create_user(NewUser {
                username: unique_username(),
                display_name: None,
                is_admin,
            })
            .await
            .expect("Failed to create test user")
    }

    pub fn token_for(&self, user: &User) -> String {
        self.jwt
            .generate_access_token(user.id, user.is_admin)
            .expect("Failed to sign test token")
            .0
    }

    /// Creates a group directly in the store.
    pub async fn create_group(&self, owner: &User, privacy: PrivacyLevel) -> Group {
        self.stores
            .groups
            .create_group(NewGroup {
                name: "Test Group".to_string(),
                description: None,
                owner_id: owner.id,
                privacy,
            })
            .await
            .expect("Failed to create test group")
            .0
    }

    /// Sends a request and returns the status with the parsed JSON body
    /// (`Value::Null` for empty bodies).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, token, None).await
    }
}
