use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::get, Json, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use gitpulse::config::Config;
use gitpulse::store::SqliteStore;
use gitpulse::webhook::webhook_router;
use gitpulse::AppState;

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gitpulse=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db_path = config.state_dir.join("gitpulse.db");
    let store = SqliteStore::new(&db_path)
        .with_context(|| format!("opening database at {}", db_path.display()))?;
    info!(path = %db_path.display(), "database ready");

    let state = Arc::new(AppState::new(Arc::new(store), config.webhook_secret));

    let app = Router::new()
        .route("/health", get(health_handler))
        .merge(webhook_router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening for webhook deliveries");

    axum::serve(listener, app)
        .await
        .context("server error")?;
    Ok(())
}
