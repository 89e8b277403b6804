//! Escrow Wallet Service - Main Application Entry Point
//!
//! REST API server for task-payment escrow: wallets with available and
//! escrowed balances, an append-only transaction audit trail, a double-entry
//! ledger facility, and the hold/release escrow protocol on top.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries, row-level locks)
//! - **Money**: rust_decimal fixed-point, scale 4
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Wire services onto the Postgres stores
//! 5. Build HTTP router and start serving

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use taskpay::{AppState, config, db, handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging. Reads RUST_LOG (defaults to "info" level).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let state = AppState::new(pool, config.escrow());

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        // Wallet management
        .route("/api/v1/wallets", post(handlers::wallets::create_wallet))
        .route("/api/v1/wallets/{id}", get(handlers::wallets::get_wallet))
        .route(
            "/api/v1/wallets/{id}/suspend",
            post(handlers::wallets::suspend_wallet),
        )
        .route(
            "/api/v1/wallets/{id}/activate",
            post(handlers::wallets::activate_wallet),
        )
        .route(
            "/api/v1/wallets/{id}/close",
            post(handlers::wallets::close_wallet),
        )
        .route(
            "/api/v1/users/{user_id}/wallet",
            get(handlers::wallets::get_wallet_by_user),
        )
        // Transaction queries
        .route(
            "/api/v1/transactions",
            get(handlers::transactions::list_transactions),
        )
        .route(
            "/api/v1/transactions/{id}",
            get(handlers::transactions::get_transaction),
        )
        // Escrow protocol
        .route("/api/v1/escrow/hold", post(handlers::escrow::hold_funds))
        .route(
            "/api/v1/escrow/release",
            post(handlers::escrow::release_funds),
        )
        .route(
            "/api/v1/escrow/refund",
            post(handlers::escrow::refund_funds),
        )
        .route(
            "/api/v1/escrow/{task_id}",
            get(handlers::escrow::get_escrow_status),
        )
        // Task lifecycle events
        .route(
            "/api/v1/events/task",
            post(handlers::events::handle_task_event),
        )
        // Ledger facility
        .route(
            "/api/v1/ledger/entries",
            post(handlers::ledger::create_double_entry),
        )
        .route(
            "/api/v1/ledger/transactions/{transaction_id}/verify",
            get(handlers::ledger::verify_transaction),
        )
        .route(
            "/api/v1/ledger/accounts/{account_type}/balance",
            get(handlers::ledger::account_balance),
        )
        // Request tracing for observability
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
