//! Standalone gRPC API server binary.
//!
//! The workspace's main `hrm-run` binary runs both gRPC and REST concurrently; this one is useful
//! when only the gRPC surface is wanted.

use std::net::SocketAddr;
use std::sync::Arc;
use tonic::transport::Server;
use tonic_reflection::server::Builder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_grpc::{api_key_interceptor, pb::hrm_server::HrmServer, HrmService};
use api_shared::FILE_DESCRIPTOR_SET;
use hrm_core::{config::data_dir_from_env_value, CoreConfig, RegistryService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("hrm=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr: SocketAddr = std::env::var("HRM_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:50051".into())
        .parse()?;

    let cfg = Arc::new(CoreConfig::new(data_dir_from_env_value(
        std::env::var("HRM_DATA_DIR").ok(),
    ))?);
    let registry = RegistryService::new(cfg)?;

    let api_key: Option<Arc<str>> = std::env::var("API_KEY").ok().map(Arc::from);
    if api_key.is_none() {
        tracing::warn!("API_KEY not set; gRPC API key check disabled");
    }

    tracing::info!("-- Starting HRM gRPC on {}", addr);

    let mut server_builder = Server::builder().add_service(HrmServer::with_interceptor(
        HrmService::new(registry),
        api_key_interceptor(api_key),
    ));

    if std::env::var("HRM_ENABLE_REFLECTION").unwrap_or_else(|_| "false".to_string()) == "true" {
        let reflection_service = Builder::configure()
            .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
            .build_v1()?;
        server_builder = server_builder.add_service(reflection_service);
        tracing::info!("gRPC server reflection enabled");
    } else {
        tracing::info!("gRPC server reflection disabled");
    }

    server_builder.serve(addr).await?;

    Ok(())
}
