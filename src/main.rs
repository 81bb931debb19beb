//! Tenant service runtime.
//!
//! # Architecture Overview
//!
//! ```text
//!   config (TOML + env) ─▶ logging ─▶ [event fan-out] ─▶ database (retry)
//!                                                            │
//!                                                            ▼
//!   Client ─▶ axum-server ─▶ ingress middleware ─▶ routes ─▶ ExecutionContext
//!                                (correlation ID,                 │
//!                                 Begin / End.)                   ▼
//!                                                        derived contexts
//! ```
//!
//! Any lifecycle error ends the process with a non-zero exit code.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use tenant_runtime::config::{load_config, ProcessEnv};
use tenant_runtime::http::HealthRoutes;
use tenant_runtime::lifecycle::{signals, App, BootstrapOptions};
use tenant_runtime::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "tenant-runtime")]
#[command(about = "Multi-tenant service runtime", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service name stamped on every log line.
    #[arg(short, long, default_value = "tenant-runtime")]
    name: String,

    /// Prefix for environment overrides.
    #[arg(long, default_value = "")]
    env_prefix: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref(), &ProcessEnv, &cli.env_prefix) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let sink = logging::sink_for(&config.observability);
    let options = BootstrapOptions::new(cli.name, config, sink);
    let app = match App::bootstrap(options).await {
        Ok(app) => Arc::new(app),
        Err(e) => {
            tracing::error!(error = %e, "Failed to bootstrap, exiting the application!");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = app.migrate_db().await {
        tracing::error!(error = %e, "Failed to migrate DB, exiting the application!");
        return ExitCode::FAILURE;
    }

    if let Err(e) = app.initialize(&[&HealthRoutes]) {
        tracing::error!(error = %e, "Failed to initialize, exiting the application!");
        return ExitCode::FAILURE;
    }

    let stopper = Arc::clone(&app);
    let stop_task = tokio::spawn(async move {
        signals::wait_for_shutdown_signal().await;
        stopper.stop().await
    });

    if let Err(e) = app.start().await {
        tracing::error!(error = %e, "Unable to start server, exiting the application!");
        return ExitCode::FAILURE;
    }

    match stop_task.await {
        Ok(Ok(())) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Shutdown failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "Shutdown task panicked");
            ExitCode::FAILURE
        }
    }
}
