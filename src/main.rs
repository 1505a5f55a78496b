//! PARLogic - PAR-level inventory planning for medical supplies.
//!
//! # API Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /upload/` - Store normalized usage records
//! - `GET /analyze/usage/` - Usage profile for a window
//! - `GET /calculate/par/` - PAR levels for an item
//! - `GET /recommendations/` - Reorder recommendations
//! - `GET /recommendations/legacy/` - Deprecated recommendation shape

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use parlogic::api::{AppState, router};
use parlogic::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("parlogic=info".parse()?))
        .init();

    let config = ServerConfig::from_env();

    info!(
        port = config.port,
        service_level = config.default_service_level,
        review_period_days = config.engine.review_period_days,
        cache_enabled = config.cache_enabled,
        "Starting PARLogic server"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::new(config));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "PARLogic is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
