/*! The XFeature server.

This binary is the web server for the XFeature engine, written in Rust
using [`sqlx`](https://github.com/launchbadge/sqlx) for database access
and [`axum`](https://github.com/tokio-rs/axum) for the HTTP surface.

## Setup

1. Install Rust, say by using [rustup](https://rustup.rs/)
2. Point `DATABASE_URL` at a SQLite file or Postgres connection string
3. Drop feature XML documents into `specs/xfeature/`
4. `cargo run --bin server`

## Configuration

See `xfeature::app::Config` for the full list of environment variables
and CLI flags (`--help` prints them).
*/

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use xfeature::app::{AppState, Config};
use xfeature::db::DbPool;
use xfeature::mock::MockStore;
use xfeature::routes;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Config::parse();

    let db = DbPool::connect(config.dialect(), &config.database_url)
        .await
        .expect("Failed to connect to database");

    let shutdown = CancellationToken::new();

    let state = AppState {
        db,
        mock: MockStore::new(config.mock_root.clone(), config.capture_mock),
        feature_root: config.feature_root.clone(),
        shutdown: shutdown.clone(),
    };

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .unwrap();
    info!("XFeature server listening at port {}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .unwrap();
}

/// Waits for Ctrl-C, then cancels `shutdown` so every in-flight request's
/// child token observes it.
async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::signal::ctrl_c().await.expect("failed to install Ctrl-C handler");
    info!("shutdown signal received, cancelling in-flight requests");
    shutdown.cancel();
}
