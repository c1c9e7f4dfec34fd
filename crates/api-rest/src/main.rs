//! Standalone REST gateway binary.
//!
//! ## Purpose
//! Serves the patient REST API and forwards every request to the EHR gRPC backend.
//!
//! ## Intended use
//! Run alongside `ehr-api-grpc` when the two processes are deployed separately. The workspace's
//! main `ehr-run` binary runs both in one process.

use api_rest::{router, AppState, GatewayConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the EHR REST gateway.
///
/// # Environment Variables
/// - `EHR_REST_ADDR`: Server address (default: "0.0.0.0:8080")
/// - `EHR_BACKEND_URL`: gRPC backend (default: "http://localhost:50051")
///
/// # Errors
/// Returns an error if the configuration is invalid, the address cannot be bound, or the HTTP
/// server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = GatewayConfig::from_env_values(
        std::env::var("EHR_REST_ADDR").ok(),
        std::env::var("EHR_BACKEND_URL").ok(),
    )?;

    tracing::info!(
        "-- Starting EHR REST gateway on {} (backend {})",
        cfg.addr(),
        cfg.backend_url()
    );

    let app = router(AppState::connect_lazy(cfg.backend_url())?);
    let listener = tokio::net::TcpListener::bind(cfg.addr()).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
