use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_grpc::{build_server, reflection_enabled, EhrService};
use ehr_core::{CoreConfig, PatientService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_grpc=info".parse()?)
                .add_directive("ehr_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr: SocketAddr = std::env::var("EHR_GRPC_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:50051".into())
        .parse()?;

    let cfg = Arc::new(CoreConfig::from_env_values(
        std::env::var("PATIENT_DATA_DIR").ok(),
        std::env::var("EHR_STORAGE").ok(),
        std::env::var("EHR_DEFAULT_PAGE_LIMIT").ok(),
    )?);
    let patients = PatientService::new(cfg);

    tracing::info!(
        "-- Starting EHR gRPC on {} ({} storage)",
        addr,
        patients.backend_name()
    );

    let server = build_server(
        EhrService::new(patients),
        reflection_enabled(std::env::var("EHR_ENABLE_REFLECTION").ok()),
    )?;
    server.serve(addr).await?;

    Ok(())
}
