//! Storefront API - e-commerce backend
//!
//! The core of this service is the token-based authentication and
//! ownership-based authorization engine:
//! - Access tokens: short-lived HS256 JWTs carrying the caller's roles,
//!   sent as `Authorization: Bearer`.
//! - Refresh tokens: long-lived JWTs carrying only the account UUID,
//!   delivered as an HTTP-only cookie and used solely to mint new access
//!   tokens against a fresh role lookup.
//! - A per-request interception pipeline verifies the bearer token and
//!   attaches the resolved principal to the request.
//! - Mutation endpoints are guarded by an ownership decision: the caller
//!   must be the resource owner or hold the admin role.

mod auth;
mod config;
mod db;
mod error;
mod response;
mod routes;
mod state;

use crate::config::Settings;
use crate::routes::create_router;
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting Storefront API...");

    // Load configuration
    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");

    if settings.auth.jwt_secret == config::AuthConfig::default().jwt_secret {
        warn!("⚠️  JWT_SECRET not set, using default (INSECURE - set in production!)");
    }

    // Initialize database pool and bootstrap the schema
    let pool = init_database_pool(&settings).await?;
    info!("✅ Database pool created successfully");

    if let Err(e) = create_database_tables(&pool).await {
        warn!("⚠️  Warning creating tables: {}", e);
    }

    let state = Arc::new(AppState::new(pool, &settings.auth));

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   ─── Authentication ───");
    info!("   POST  /auth/login                        - Login with username/password");
    info!("   POST  /auth/register                     - Register new account");
    info!("   GET   /auth/refresh                      - Refresh access token (cookie)");
    info!("   GET   /auth/logout                       - Clear refresh cookie");
    info!("");
    info!("   ─── Users ───");
    info!("   GET    /api/v1/users/me                  - Current principal");
    info!("   PATCH  /api/v1/users/username/{{username}} - Update account (owner or admin)");
    info!("   PATCH  /api/v1/users/uuid/{{uuid}}         - Update account (owner or admin)");
    info!("   PATCH  /api/v1/users/email/{{email}}       - Update account (owner or admin)");
    info!("   DELETE /api/v1/users/...                 - Delete account (owner or admin)");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,storefront_api=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Initialize database pool from settings
async fn init_database_pool(settings: &Settings) -> anyhow::Result<deadpool_postgres::Pool> {
    use deadpool_postgres::{Config, ManagerConfig, RecyclingMethod};

    let db = &settings.database;

    let mut cfg = Config::new();
    cfg.host = Some(db.host.clone());
    cfg.port = Some(db.port);
    cfg.user = Some(db.user.clone());
    cfg.password = Some(db.password.clone());
    cfg.dbname = Some(db.database.clone());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    // Hosted providers commonly require TLS (sslmode=require)
    let pool = if db.require_tls {
        let certs = rustls_native_certs::load_native_certs();
        let mut root_store = rustls::RootCertStore::empty();
        for cert in certs.certs {
            root_store.add(cert).ok();
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

        cfg.create_pool(Some(deadpool_postgres::Runtime::Tokio1), tls)
            .map_err(|e| anyhow::anyhow!("Failed to create TLS pool: {}", e))?
    } else {
        cfg.create_pool(Some(deadpool_postgres::Runtime::Tokio1), tokio_postgres::NoTls)
            .map_err(|e| anyhow::anyhow!("Failed to create pool: {}", e))?
    };

    // Verify the connection before serving traffic
    let client = pool
        .get()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to get pool connection: {}", e))?;
    client
        .query_one("SELECT 1 as ok", &[])
        .await
        .map_err(|e| anyhow::anyhow!("Failed to verify database connection: {}", e))?;

    info!("✅ Database connection successful (TLS: {})", db.require_tls);
    Ok(pool)
}

/// Create database tables if they don't exist
async fn create_database_tables(pool: &deadpool_postgres::Pool) -> anyhow::Result<()> {
    let client = pool.get().await?;

    // Roles table
    client
        .execute(
            "CREATE TABLE IF NOT EXISTS roles (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(50) UNIQUE NOT NULL
            )",
            &[],
        )
        .await?;

    // Accounts table
    client
        .execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                id BIGSERIAL PRIMARY KEY,
                uuid UUID UNIQUE NOT NULL,
                username VARCHAR(32) UNIQUE NOT NULL,
                email VARCHAR(255) UNIQUE NOT NULL,
                password VARCHAR(255) NOT NULL,
                is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            &[],
        )
        .await?;

    // Role membership
    client
        .execute(
            "CREATE TABLE IF NOT EXISTS account_roles (
                account_id BIGINT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                role_id BIGINT NOT NULL REFERENCES roles(id),
                PRIMARY KEY (account_id, role_id)
            )",
            &[],
        )
        .await?;

    // Seed the fixed role set
    let _ = client
        .execute(
            "INSERT INTO roles (name) VALUES
             ('ROLE_USER'),
             ('ROLE_MODERATOR'),
             ('ROLE_ADMIN')
             ON CONFLICT (name) DO NOTHING",
            &[],
        )
        .await;

    let _ = client
        .execute(
            "CREATE INDEX IF NOT EXISTS idx_account_roles_account_id ON account_roles(account_id)",
            &[],
        )
        .await;

    info!("✅ Database tables initialized");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
