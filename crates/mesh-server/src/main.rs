// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mesh controller binary.

use clap::Parser;
use mesh_server::{create_router, AppState};
use mesh_server_config::{LogFormat, LoggingConfig};
use mesh_server_registry::NodeRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Mesh controller - hands out tunnel addresses and keys, distributes peer lists.
#[derive(Parser, Debug)]
#[command(name = "mesh-server", about = "Mesh VPN controller", version)]
struct Args {
	/// TOML configuration file (default: /etc/mesh/server.toml)
	#[arg(long, short, env = "MESH_SERVER_CONFIG")]
	config: Option<PathBuf>,
}

fn init_tracing(logging: &LoggingConfig) {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
	let registry = tracing_subscriber::registry().with(filter);
	match logging.format {
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json())
			.init(),
		LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
	}
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %e, "failed to listen for Ctrl-C");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(e) => {
				tracing::error!(error = %e, "failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
	tracing::info!("Received shutdown signal");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	let config = match args.config {
		Some(path) => mesh_server_config::load_config_with_file(path)?,
		None => mesh_server_config::load_config()?,
	};

	init_tracing(&config.logging);

	let registry = NodeRegistry::new(config.registry.network, config.registry.start_offset)?;
	tracing::info!(
		network = %registry.network(),
		capacity = registry.stats().address_capacity,
		"registry ready"
	);

	let app = create_router(AppState::new(Arc::new(registry)));

	let addr = config.socket_addr();
	let listener = tokio::net::TcpListener::bind(&addr).await?;
	tracing::info!(%addr, "listening");

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	tracing::info!("Server shutdown complete");
	Ok(())
}
