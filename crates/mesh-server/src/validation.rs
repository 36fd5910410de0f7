// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request bounds checked before anything reaches the registry.

use crate::error::ServerError;
use mesh_common::{AnnounceRequest, RegisterRequest};

pub const MAX_HOSTNAME_LEN: usize = 253;
pub const MAX_LABEL_LEN: usize = 64;
pub const MAX_ENDPOINTS: usize = 32;
pub const MAX_ENDPOINT_LEN: usize = 255;

pub fn validate_register(request: &RegisterRequest) -> Result<(), ServerError> {
	let hostname = request.hostname.trim();
	if hostname.is_empty() {
		return Err(ServerError::Malformed("hostname is required".to_string()));
	}
	if hostname.len() > MAX_HOSTNAME_LEN {
		return Err(ServerError::Malformed(format!(
			"hostname exceeds {MAX_HOSTNAME_LEN} bytes"
		)));
	}
	check_label("os", &request.os)?;
	check_label("version", &request.version)?;
	check_endpoints(&request.endpoints)?;
	check_port(request.listen_port)
}

pub fn validate_announce(request: &AnnounceRequest) -> Result<(), ServerError> {
	if request.node_id.trim().is_empty() {
		return Err(ServerError::Malformed("nodeId is required".to_string()));
	}
	check_endpoints(&request.endpoints)?;
	check_port(request.listen_port)
}

fn check_label(field: &str, value: &str) -> Result<(), ServerError> {
	if value.len() > MAX_LABEL_LEN {
		return Err(ServerError::Malformed(format!(
			"{field} exceeds {MAX_LABEL_LEN} bytes"
		)));
	}
	Ok(())
}

fn check_endpoints(endpoints: &[String]) -> Result<(), ServerError> {
	if endpoints.len() > MAX_ENDPOINTS {
		return Err(ServerError::Malformed(format!(
			"at most {MAX_ENDPOINTS} endpoints may be submitted"
		)));
	}
	if endpoints.iter().any(|e| e.len() > MAX_ENDPOINT_LEN) {
		return Err(ServerError::Malformed(format!(
			"endpoint exceeds {MAX_ENDPOINT_LEN} bytes"
		)));
	}
	Ok(())
}

fn check_port(port: Option<u16>) -> Result<(), ServerError> {
	match port {
		Some(0) => Err(ServerError::Malformed(
			"listenPort must be between 1 and 65535".to_string(),
		)),
		_ => Ok(()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn register(hostname: &str) -> RegisterRequest {
		RegisterRequest {
			hostname: hostname.to_string(),
			os: "linux".to_string(),
			version: "0.1.0".to_string(),
			endpoints: vec![],
			listen_port: None,
		}
	}

	#[test]
	fn accepts_reasonable_request() {
		assert!(validate_register(&register("alpha")).is_ok());
	}

	#[test]
	fn rejects_empty_and_long_hostnames() {
		assert!(validate_register(&register("  ")).is_err());
		assert!(validate_register(&register(&"a".repeat(254))).is_err());
		assert!(validate_register(&register(&"a".repeat(253))).is_ok());
	}

	#[test]
	fn rejects_oversized_labels_and_endpoint_lists() {
		let mut request = register("alpha");
		request.os = "x".repeat(65);
		assert!(validate_register(&request).is_err());

		let mut request = register("alpha");
		request.endpoints = vec!["1.2.3.4:5".to_string(); 33];
		assert!(validate_register(&request).is_err());

		let mut request = register("alpha");
		request.endpoints = vec!["h".repeat(256)];
		assert!(validate_register(&request).is_err());
	}

	#[test]
	fn unparseable_endpoints_are_not_malformed() {
		let mut request = register("alpha");
		request.endpoints = vec!["garbage".to_string()];
		assert!(validate_register(&request).is_ok());
	}

	#[test]
	fn announce_needs_node_id() {
		let request = AnnounceRequest {
			node_id: String::new(),
			endpoints: vec![],
			listen_port: Some(51820),
		};
		assert!(validate_announce(&request).is_err());
	}

	#[test]
	fn zero_port_rejected() {
		let mut request = register("alpha");
		request.listen_port = Some(0);
		assert!(validate_register(&request).is_err());
	}
}
