// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use mesh_common::{is_valid_endpoint, DEFAULT_LISTEN_PORT};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_CONTROLLER_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_INTERFACE: &str = "wg0";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_ANNOUNCE_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Linux caps interface names at IFNAMSIZ - 1.
const MAX_INTERFACE_LEN: usize = 15;

#[derive(Debug, Clone)]
pub struct AgentConfig {
	pub controller_url: Url,
	pub hostname: String,
	pub os: String,
	pub version: String,
	pub interface: String,
	pub listen_port: u16,
	/// Announced ahead of discovered addresses, e.g. a port-forwarded public
	/// address the host cannot see on its own interfaces.
	pub static_endpoints: Vec<String>,
	pub poll_interval: Duration,
	/// `None` disables announcing.
	pub announce_interval: Option<Duration>,
	pub request_timeout: Duration,
}

impl AgentConfig {
	pub fn new(controller_url: Url, hostname: impl Into<String>) -> Self {
		Self {
			controller_url,
			hostname: hostname.into(),
			os: std::env::consts::OS.to_string(),
			version: env!("CARGO_PKG_VERSION").to_string(),
			interface: DEFAULT_INTERFACE.to_string(),
			listen_port: DEFAULT_LISTEN_PORT,
			static_endpoints: Vec::new(),
			poll_interval: DEFAULT_POLL_INTERVAL,
			announce_interval: Some(DEFAULT_ANNOUNCE_INTERVAL),
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
		}
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		match self.controller_url.scheme() {
			"http" | "https" => {}
			other => {
				return Err(invalid(
					"controller_url",
					format!("scheme must be http or https, got {other}"),
				))
			}
		}

		if self.hostname.trim().is_empty() {
			return Err(invalid("hostname", "must not be empty"));
		}

		if self.interface.is_empty()
			|| self.interface.len() > MAX_INTERFACE_LEN
			|| self
				.interface
				.chars()
				.any(|c| c == '/' || c.is_whitespace())
		{
			return Err(invalid(
				"interface",
				format!("'{}' is not a valid interface name", self.interface),
			));
		}

		if self.listen_port == 0 {
			return Err(invalid("listen_port", "must be non-zero"));
		}

		if let Some(bad) = self
			.static_endpoints
			.iter()
			.find(|e| !is_valid_endpoint(e))
		{
			return Err(invalid("endpoint", format!("'{bad}' is not host:port")));
		}

		if self.poll_interval.is_zero() {
			return Err(invalid("poll_interval", "must be greater than zero"));
		}
		if self.announce_interval.is_some_and(|d| d.is_zero()) {
			return Err(invalid("announce_interval", "must be greater than zero"));
		}
		if self.request_timeout.is_zero() {
			return Err(invalid("request_timeout", "must be greater than zero"));
		}

		Ok(())
	}
}

fn invalid(key: &'static str, message: impl Into<String>) -> ConfigError {
	ConfigError::Invalid {
		key,
		message: message.into(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn base() -> AgentConfig {
		AgentConfig::new(DEFAULT_CONTROLLER_URL.parse().unwrap(), "alpha")
	}

	#[test]
	fn defaults_are_valid() {
		let config = base();
		assert!(config.validate().is_ok());
		assert_eq!(config.interface, "wg0");
		assert_eq!(config.listen_port, 51820);
		assert_eq!(config.poll_interval, Duration::from_secs(15));
		assert_eq!(config.announce_interval, Some(Duration::from_secs(60)));
	}

	#[test]
	fn rejects_non_http_controller() {
		let mut config = base();
		config.controller_url = "ftp://controller.example".parse().unwrap();
		let err = config.validate().unwrap_err();
		assert!(err.to_string().contains("controller_url"));
	}

	#[test]
	fn rejects_bad_interface_names() {
		for name in ["", "this-name-is-far-too-long", "wg/0", "wg 0"] {
			let mut config = base();
			config.interface = name.to_string();
			assert!(config.validate().is_err(), "accepted {name:?}");
		}
	}

	#[test]
	fn rejects_zero_intervals_and_port() {
		let mut config = base();
		config.poll_interval = Duration::ZERO;
		assert!(config.validate().is_err());

		let mut config = base();
		config.announce_interval = Some(Duration::ZERO);
		assert!(config.validate().is_err());

		let mut config = base();
		config.announce_interval = None;
		assert!(config.validate().is_ok());

		let mut config = base();
		config.listen_port = 0;
		assert!(config.validate().is_err());
	}

	#[test]
	fn static_endpoints_must_parse() {
		let mut config = base();
		config.static_endpoints = vec!["vpn.example.com:51820".to_string()];
		assert!(config.validate().is_ok());

		config.static_endpoints.push("vpn.example.com".to_string());
		assert!(config.validate().is_err());
	}
}
