//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging when you only want the REST server (with
//! OpenAPI/Swagger UI). The workspace's main `hrm-run` binary runs both gRPC and REST
//! concurrently.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hrm_core::{config::data_dir_from_env_value, CoreConfig, RegistryService};

/// Main entry point for the HRM REST API server
///
/// # Environment Variables
/// - `HRM_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `HRM_DATA_DIR`: Snapshot directory; unset keeps the registry in memory
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the registry snapshot cannot be loaded,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("hrm=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("HRM_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::new(data_dir_from_env_value(
        std::env::var("HRM_DATA_DIR").ok(),
    ))?);
    let registry = RegistryService::new(cfg)?;

    tracing::info!("-- Starting HRM REST API on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, api_rest::router(registry)).await?;

    Ok(())
}
