// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the mesh controller.
//!
//! Layers are merged from built-in defaults, a TOML file
//! (`/etc/mesh/server.toml` unless overridden) and `MESH_SERVER_*`
//! environment variables, in that order of increasing precedence.
//!
//! ```toml
//! [http]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [registry]
//! cidr = "100.64.0.0/16"
//! start_offset = 10
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub registry: RegistryConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Loads defaults, `/etc/mesh/server.toml`, then the environment.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Same as [`load_config`] with a caller-chosen file.
pub fn load_config_with_file(config_path: impl Into<PathBuf>) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let registry = layer.registry.unwrap_or_default().finalize()?;
	let logging = layer.logging.unwrap_or_default().finalize();

	info!(
		host = %http.host,
		port = http.port,
		network = %registry.network,
		start_offset = registry.start_offset,
		log_format = %logging.format,
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		http,
		registry,
		logging,
	})
}
