// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{HttpConfigLayer, LogFormat, LoggingConfigLayer, RegistryConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/mesh/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: MESH_SERVER_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		load_from(|name| std::env::var(name).ok())
	}
}

/// Builds a layer from a variable lookup so the mapping is testable without
/// touching process state.
fn load_from<F>(lookup: F) -> Result<ServerConfigLayer, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	let var = |name: &str| lookup(name).filter(|s| !s.is_empty());

	Ok(ServerConfigLayer {
		http: Some(HttpConfigLayer {
			host: var("MESH_SERVER_HOST"),
			port: parse_var("MESH_SERVER_PORT", var("MESH_SERVER_PORT"))?,
		}),
		registry: Some(RegistryConfigLayer {
			cidr: var("MESH_SERVER_CIDR"),
			start_offset: parse_var("MESH_SERVER_START_OFFSET", var("MESH_SERVER_START_OFFSET"))?,
		}),
		logging: Some(LoggingConfigLayer {
			level: var("MESH_SERVER_LOG_LEVEL"),
			format: parse_var::<LogFormat>("MESH_SERVER_LOG_FORMAT", var("MESH_SERVER_LOG_FORMAT"))?,
		}),
	})
}

fn parse_var<T>(name: &str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
	T: FromStr,
	T::Err: std::fmt::Display,
{
	match value {
		Some(v) => v.parse().map(Some).map_err(|e| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid value '{v}': {e}"),
		}),
		None => Ok(None),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |name| map.get(name).cloned()
	}

	#[test]
	fn precedence_order() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}

	#[test]
	fn env_maps_to_sections() {
		let layer = load_from(lookup(&[
			("MESH_SERVER_PORT", "9090"),
			("MESH_SERVER_CIDR", "10.20.0.0/16"),
			("MESH_SERVER_START_OFFSET", "2"),
			("MESH_SERVER_LOG_FORMAT", "json"),
			("MESH_SERVER_HOST", ""),
		]))
		.unwrap();

		let http = layer.http.unwrap();
		assert_eq!(http.port, Some(9090));
		assert!(http.host.is_none());
		let registry = layer.registry.unwrap();
		assert_eq!(registry.cidr.as_deref(), Some("10.20.0.0/16"));
		assert_eq!(registry.start_offset, Some(2));
		assert_eq!(layer.logging.unwrap().format, Some(LogFormat::Json));
	}

	#[test]
	fn bad_env_number_names_the_variable() {
		let err = load_from(lookup(&[("MESH_SERVER_PORT", "eighty")])).unwrap_err();
		assert!(err.to_string().contains("MESH_SERVER_PORT"));
	}

	#[test]
	fn missing_file_is_empty_layer() {
		let dir = tempfile::tempdir().unwrap();
		let layer = TomlSource::new(dir.path().join("absent.toml")).load().unwrap();
		assert!(layer.http.is_none());
		assert!(layer.registry.is_none());
	}

	#[test]
	fn malformed_file_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("server.toml");
		std::fs::write(&path, "[http\nport = ").unwrap();
		assert!(matches!(
			TomlSource::new(&path).load(),
			Err(ConfigError::TomlParse { .. })
		));
	}
}
