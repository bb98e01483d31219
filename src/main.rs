use std::net::SocketAddr;
use std::sync::Arc;
use tonic::transport::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_grpc::{HrmService, api_key_interceptor};
use api_shared::pb::hrm_server::HrmServer;
use hrm_core::{CoreConfig, RegistryService, config::data_dir_from_env_value};

/// Main entry point for the HRM application
///
/// Starts both gRPC and REST servers concurrently over one shared registry, so a doctor
/// registered through one surface is immediately visible through the other:
/// - gRPC server on port 50051 (configurable via HRM_ADDR)
/// - REST server on port 3000 (configurable via HRM_REST_ADDR)
///
/// # Environment Variables
/// - `HRM_ADDR`: gRPC server address (default: "0.0.0.0:50051")
/// - `HRM_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `HRM_DATA_DIR`: Snapshot directory; unset keeps the registry in memory
/// - `API_KEY`: API key for gRPC authentication; unset disables the check
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hrm=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("api_grpc=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let grpc_addr: SocketAddr = std::env::var("HRM_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:50051".into())
        .parse()?;
    let rest_addr = std::env::var("HRM_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::new(data_dir_from_env_value(
        std::env::var("HRM_DATA_DIR").ok(),
    ))?);
    let registry = RegistryService::new(cfg)?;

    let api_key: Option<Arc<str>> = std::env::var("API_KEY").ok().map(Arc::from);
    if api_key.is_none() {
        tracing::warn!("API_KEY not set; gRPC API key check disabled");
    }

    tracing::info!("++ Starting HRM gRPC on {}", grpc_addr);
    tracing::info!("++ Starting HRM REST on {}", rest_addr);

    let rest_app = api_rest::router(registry.clone());
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    let rest_server = tokio::spawn(async move { axum::serve(listener, rest_app).await });

    let grpc_server = Server::builder()
        .add_service(HrmServer::with_interceptor(
            HrmService::new(registry),
            api_key_interceptor(api_key),
        ))
        .serve(grpc_addr);

    let (rest_result, grpc_result) = tokio::join!(rest_server, grpc_server);
    rest_result??;
    grpc_result?;

    Ok(())
}
