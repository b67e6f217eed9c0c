use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use domain::services::{AuthorizationResolver, InviteManager, InviteSettings, RedemptionService};
use domain::store::Stores;
use shared::jwt::JwtConfig;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_group_member, require_group_moderator,
    require_group_owner, require_user_auth, trace_id,
};
use crate::routes::{groups, health, invites, members};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub stores: Stores,
    pub resolver: AuthorizationResolver,
    pub invites: InviteManager,
    pub redemption: RedemptionService,
    /// Present when backed by PostgreSQL; used by health checks.
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(config: Config, jwt: JwtConfig, stores: Stores) -> Self {
        let settings = InviteSettings::from(&config.invites);
        Self {
            resolver: AuthorizationResolver::new(&stores),
            invites: InviteManager::new(&stores, settings),
            redemption: RedemptionService::new(&stores),
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            stores,
            pool: None,
        }
    }

    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let member = || middleware::from_fn_with_state(state.clone(), require_group_member);
    let moderator = || middleware::from_fn_with_state(state.clone(), require_group_moderator);
    let owner = || middleware::from_fn_with_state(state.clone(), require_group_owner);

    // Protected routes (require a user JWT).
    // Each group route carries its own gate; the gate runs after user auth
    // because the Router-level layer below wraps it.
    let protected_routes = Router::new()
        .route("/api/v1/groups", post(groups::create_group))
        .route(
            "/api/v1/groups/:group_id",
            get(groups::get_group).route_layer(member()),
        )
        .route(
            "/api/v1/groups/:group_id",
            patch(groups::update_group).route_layer(owner()),
        )
        .route(
            "/api/v1/groups/:group_id",
            delete(groups::delete_group).route_layer(owner()),
        )
        .route(
            "/api/v1/groups/:group_id/members",
            get(members::list_members).route_layer(member()),
        )
        .route(
            "/api/v1/groups/:group_id/members",
            post(members::add_member).route_layer(moderator()),
        )
        .route(
            "/api/v1/groups/:group_id/members/:user_id",
            delete(members::remove_member).route_layer(moderator()),
        )
        .route(
            "/api/v1/groups/:group_id/members/:user_id/role",
            put(members::update_member_role).route_layer(owner()),
        )
        .route(
            "/api/v1/groups/:group_id/leave",
            post(members::leave_group).route_layer(member()),
        )
        .route(
            "/api/v1/groups/:group_id/invites",
            post(invites::create_invite).route_layer(member()),
        )
        .route(
            "/api/v1/groups/:group_id/invites",
            get(invites::list_invites).route_layer(moderator()),
        )
        .route("/api/v1/invites/redeem", post(invites::redeem_invite))
        // Auth runs first (outermost layer = runs first)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/api/v1/invites/:code", get(invites::get_invite_info))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware)) // Prometheus metrics
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id)) // Request ID and logging
        .layer(cors)
        .with_state(state)
}
