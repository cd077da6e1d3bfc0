//! # gridcall Task Gateway
//!
//! Long-running gRPC server exposing CreateTask and PollTask. This is
//! the production deployment target for the broker's online half.
//!
//! ## Usage
//!
//! ```bash
//! DB_HOST=... DB_PORT=... DB_USER=... DB_PASSWORD=... DB_NAME=... \
//! TASK_SERVICE_HOST=0.0.0.0 TASK_SERVICE_PORT=50051 \
//! TASK_SERVICE_POOL_SIZE=8 PROJECT_DIR=/srv/vch \
//! cargo run --bin gridcall-server
//! ```

use std::net::SocketAddr;

use tokio::signal;
use tonic::transport::Server;
use tracing::info;

use gridcall_server::gateway::TaskServiceImpl;
use gridcall_server::launcher::WorkLauncher;
use gridcall_server::store::TaskStore;
use gridcall_shared::config::{DatabaseConfig, ServiceConfig};
use gridcall_shared::logging;
use gridcall_shared::proto::v1::task_service_server::TaskServiceServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_tracing();

    info!("Starting gridcall task gateway...");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));

    let db_config = DatabaseConfig::from_env()?;
    let service_config = ServiceConfig::from_env()?;

    let store = TaskStore::connect(&db_config, service_config.pool_size).await?;
    let launcher = WorkLauncher::new(&service_config.project_dir)?;
    let service = TaskServiceImpl::new(store, launcher);

    let addr: SocketAddr = service_config.bind_addr().parse()?;

    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<TaskServiceServer<TaskServiceImpl>>()
        .await;

    info!(
        addr = %addr,
        pool_size = service_config.pool_size,
        "Task gateway listening"
    );
    info!("   Press Ctrl+C to shutdown gracefully");

    // The request concurrency bound matches the store pool size so RPC
    // workers and database connections cannot starve each other.
    Server::builder()
        .concurrency_limit_per_connection(service_config.pool_size as usize)
        .add_service(health_service)
        .add_service(service.into_server())
        .serve_with_shutdown(addr, shutdown_signal())
        .await?;

    info!("Task gateway shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
