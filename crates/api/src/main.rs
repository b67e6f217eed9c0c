use anyhow::{Context, Result};
use persistence::PostgresStore;
use tracing::info;

use calendar_groups_api::{app, config, middleware, services};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load()?;

    middleware::logging::init_logging(&config.logging)?;
    middleware::init_metrics()?;

    info!("Starting Calendar Groups API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&(&config.database).into()).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let jwt = config
        .jwt
        .build()
        .context("Failed to initialize JWT configuration")?;

    let stores = PostgresStore::new(pool.clone()).stores();
    services::bootstrap(&stores, &config.bootstrap).await?;

    let addr = config.socket_addr()?;
    let state = app::AppState::new(config, jwt, stores).with_pool(pool);
    let app = app::create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
