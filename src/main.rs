//! Metadata-aware HTTP gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────────┐
//!                        │                 METADATA GATEWAY                  │
//!                        │                                                   │
//!   Client Request       │  ┌──────────┐   ┌──────────┐   ┌──────────────┐   │
//!   ─────────────────────┼─▶│ ingress  │──▶│ routing  │──▶│   egress     │   │
//!   (metadata headers)   │  │ decode + │   │  match   │   │ encode +     │   │
//!                        │  │ scope    │   │          │   │ router-label │   │
//!                        │  └──────────┘   └──────────┘   └──────┬───────┘   │
//!                        │                                       ▼           │
//!                        │                 ┌──────────┐   ┌──────────────┐   │
//!   Client Response      │                 │ report   │◀──│ engine + lb  │───┼──▶ Instance
//!   ◀────────────────────┼─────────────────│ result   │   │ quota/select │   │
//!                        │                 └──────────┘   └──────────────┘   │
//!                        └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use mesh_metadata::admin::{setup_admin_router, AdminState};
use mesh_metadata::config::{load_config, GatewayConfig};
use mesh_metadata::lifecycle::{signals, Shutdown};
use mesh_metadata::observability::{logging, metrics};
use mesh_metadata::HttpServer;

#[derive(Parser)]
#[command(name = "metadata-gateway")]
#[command(about = "HTTP gateway propagating request metadata between services", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "metadata-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        namespace = %config.service.namespace,
        service = %config.service.service,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::new(config.clone());
    let holder = server.holder().clone().install()?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin listener started");
        let admin = setup_admin_router(AdminState::new(&config, Arc::clone(holder.statics())));
        let stopped = shutdown.signalled();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, admin)
                .with_graceful_shutdown(stopped)
                .await
            {
                tracing::error!(error = %e, "Admin listener failed");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
