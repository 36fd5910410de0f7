// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mesh agent binary.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use mesh_agent::config::{DEFAULT_CONTROLLER_URL, DEFAULT_INTERFACE};
use mesh_agent::{AgentConfig, HttpControlClient, MeshAgent};
use mesh_common::DEFAULT_LISTEN_PORT;
use mesh_tunnel::{CommandDevice, MockDevice, TunnelDevice, TunnelReconciler};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
	Pretty,
	Json,
}

/// Mesh agent - joins this host to the mesh and keeps its tunnel current.
#[derive(Parser, Debug)]
#[command(name = "mesh-agent", about = "Mesh VPN agent", version)]
struct Args {
	/// Controller base URL
	#[arg(long, env = "MESH_AGENT_CONTROLLER", default_value = DEFAULT_CONTROLLER_URL)]
	controller: Url,

	/// Name reported to the controller (default: system hostname)
	#[arg(long, env = "MESH_AGENT_HOSTNAME")]
	hostname: Option<String>,

	/// WireGuard interface to manage
	#[arg(long, env = "MESH_AGENT_INTERFACE", default_value = DEFAULT_INTERFACE)]
	interface: String,

	#[arg(long, env = "MESH_AGENT_LISTEN_PORT", default_value_t = DEFAULT_LISTEN_PORT)]
	listen_port: u16,

	/// Extra host:port to announce ahead of discovered addresses (repeatable)
	#[arg(long = "endpoint", env = "MESH_AGENT_ENDPOINTS", value_delimiter = ',')]
	endpoints: Vec<String>,

	#[arg(long, env = "MESH_AGENT_POLL_SECS", default_value_t = 15)]
	poll_secs: u64,

	/// 0 disables announcing
	#[arg(long, env = "MESH_AGENT_ANNOUNCE_SECS", default_value_t = 60)]
	announce_secs: u64,

	#[arg(long, env = "MESH_AGENT_TIMEOUT_SECS", default_value_t = 10)]
	timeout_secs: u64,

	/// Apply peer sets to an in-memory device instead of the OS
	#[arg(long, env = "MESH_AGENT_DRY_RUN")]
	dry_run: bool,

	#[arg(long, env = "MESH_AGENT_LOG_LEVEL", default_value = "info")]
	log_level: String,

	#[arg(long, env = "MESH_AGENT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
	log_format: LogFormat,
}

impl Args {
	fn into_config(self) -> anyhow::Result<AgentConfig> {
		let hostname = match self.hostname {
			Some(name) => name,
			None => hostname::get()
				.context("reading system hostname")?
				.into_string()
				.map_err(|raw| anyhow::anyhow!("system hostname is not UTF-8: {raw:?}"))?,
		};

		let mut config = AgentConfig::new(self.controller, hostname);
		config.interface = self.interface;
		config.listen_port = self.listen_port;
		config.static_endpoints = self.endpoints;
		config.poll_interval = Duration::from_secs(self.poll_secs);
		config.announce_interval = (self.announce_secs > 0).then(|| Duration::from_secs(self.announce_secs));
		config.request_timeout = Duration::from_secs(self.timeout_secs);
		config.validate()?;
		Ok(config)
	}
}

fn init_tracing(level: &str, format: LogFormat) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
	let registry = tracing_subscriber::registry().with(filter);
	match format {
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json())
			.init(),
		LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
	}
}

async fn shutdown_signal(cancel: CancellationToken) {
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
	cancel.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	init_tracing(&args.log_level, args.log_format);

	let dry_run = args.dry_run;
	let config = args.into_config()?;

	let device: Arc<dyn TunnelDevice> = if dry_run {
		tracing::warn!(iface = %config.interface, "dry run: no OS changes will be made");
		Arc::new(MockDevice::new(config.interface.clone()))
	} else {
		Arc::new(CommandDevice::new(config.interface.clone()))
	};

	let control = HttpControlClient::new(config.controller_url.clone(), config.request_timeout)
		.context("building controller client")?;
	tracing::info!(
		controller = %control.base_url(),
		hostname = %config.hostname,
		iface = %config.interface,
		"starting mesh agent"
	);

	let cancel = CancellationToken::new();
	tokio::spawn(shutdown_signal(cancel.clone()));

	let mut agent = MeshAgent::new(config, Arc::new(control), TunnelReconciler::new(device));
	agent.run(cancel).await?;

	Ok(())
}
