use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_grpc::{EhrService, build_server, reflection_enabled};
use api_rest::{AppState, GatewayConfig, router};
use ehr_core::{CoreConfig, PatientService};

/// Main entry point for the EHR application
///
/// Starts both servers concurrently in one process:
/// - gRPC CRUD server on port 50051 (configurable via EHR_GRPC_ADDR)
/// - REST gateway on port 8080 (configurable via EHR_REST_ADDR), forwarding to EHR_BACKEND_URL
///
/// # Environment Variables
/// - `EHR_GRPC_ADDR`: gRPC server address (default: "0.0.0.0:50051")
/// - `EHR_REST_ADDR`: REST gateway address (default: "0.0.0.0:8080")
/// - `EHR_BACKEND_URL`: gRPC server the gateway calls (default: "http://localhost:50051")
/// - `EHR_STORAGE`: `memory` or `file` (default: "memory")
/// - `PATIENT_DATA_DIR`: Root of the file store (default: "patient_data")
/// - `EHR_DEFAULT_PAGE_LIMIT`: Page size used when a list request asks for 0 (default: 100)
/// - `EHR_ENABLE_REFLECTION`: Enables gRPC reflection when "true"
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ehr_run=info".parse()?)
                .add_directive("api_grpc=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("ehr_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let grpc_addr: SocketAddr = std::env::var("EHR_GRPC_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:50051".into())
        .parse()?;
    let gateway_cfg = GatewayConfig::from_env_values(
        std::env::var("EHR_REST_ADDR").ok(),
        std::env::var("EHR_BACKEND_URL").ok(),
    )?;
    let core_cfg = Arc::new(CoreConfig::from_env_values(
        std::env::var("PATIENT_DATA_DIR").ok(),
        std::env::var("EHR_STORAGE").ok(),
        std::env::var("EHR_DEFAULT_PAGE_LIMIT").ok(),
    )?);

    let patients = PatientService::new(core_cfg);
    tracing::info!(
        "++ Starting EHR gRPC on {} ({} storage)",
        grpc_addr,
        patients.backend_name()
    );
    tracing::info!(
        "++ Starting EHR REST gateway on {} (backend {})",
        gateway_cfg.addr(),
        gateway_cfg.backend_url()
    );

    let grpc_server = build_server(
        EhrService::new(patients),
        reflection_enabled(std::env::var("EHR_ENABLE_REFLECTION").ok()),
    )?
    .serve(grpc_addr);

    let rest_app = router(AppState::connect_lazy(gateway_cfg.backend_url())?);
    let listener = tokio::net::TcpListener::bind(gateway_cfg.addr()).await?;
    let rest_server = async move { axum::serve(listener, rest_app).await };

    // Run both; the first failure stops the process.
    tokio::try_join!(
        async { grpc_server.await.map_err(anyhow::Error::from) },
        async { rest_server.await.map_err(anyhow::Error::from) },
    )?;

    Ok(())
}
