// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! JSON shapes exchanged between agents and the controller.
//!
//! Field names are camelCase on the wire. Optional fields decode to their
//! zero value when absent so older agents and controllers interoperate.

use crate::secret::SecretString;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A member of the mesh as the controller describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Node {
	pub id: String,
	#[serde(default)]
	pub hostname: String,
	#[serde(default)]
	pub os: String,
	#[serde(default)]
	pub version: String,
	/// Base64 WireGuard public key. Empty when unknown.
	#[serde(default)]
	pub public_key: String,
	/// Dotted-quad tunnel address. Empty when unknown.
	#[serde(default)]
	pub tunnel_ip: String,
	#[serde(default)]
	pub endpoints: Vec<String>,
	/// The candidate peers should dial.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub endpoint: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub listen_port: Option<u16>,
	#[serde(default)]
	pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
	pub hostname: String,
	#[serde(default)]
	pub os: String,
	#[serde(default)]
	pub version: String,
	#[serde(default)]
	pub endpoints: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub listen_port: Option<u16>,
}

/// Returned once per registration. `priv_key` is the only time the node's
/// private key leaves the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
	pub node: Node,
	#[serde(default)]
	pub peers: Vec<Node>,
	#[serde(with = "crate::secret::exposed")]
	#[cfg_attr(feature = "openapi", schema(value_type = String))]
	pub priv_key: SecretString,
	pub network_cidr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PeersResponse {
	#[serde(default)]
	pub peers: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AnnounceRequest {
	pub node_id: String,
	#[serde(default)]
	pub endpoints: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub listen_port: Option<u16>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn node_uses_camel_case_and_omits_empty_optionals() {
		let node = Node {
			id: "abc".to_string(),
			hostname: "alpha".to_string(),
			os: "linux".to_string(),
			version: "0.1.0".to_string(),
			public_key: "pk".to_string(),
			tunnel_ip: "100.64.0.10".to_string(),
			endpoints: vec![],
			endpoint: None,
			listen_port: None,
			last_seen: None,
		};
		let value = serde_json::to_value(&node).unwrap();
		assert_eq!(value["publicKey"], "pk");
		assert_eq!(value["tunnelIp"], "100.64.0.10");
		assert!(value.get("endpoint").is_none());
		assert!(value.get("listenPort").is_none());
	}

	#[test]
	fn missing_node_fields_decode_empty() {
		let node: Node = serde_json::from_value(json!({ "id": "x" })).unwrap();
		assert_eq!(node.public_key, "");
		assert_eq!(node.tunnel_ip, "");
		assert!(node.endpoints.is_empty());
		assert!(node.last_seen.is_none());
	}

	#[test]
	fn register_response_carries_private_key() {
		let raw = json!({
			"node": { "id": "x" },
			"peers": [],
			"privKey": "secret-material",
			"networkCidr": "100.64.0.0/16"
		});
		let response: RegisterResponse = serde_json::from_value(raw).unwrap();
		assert_eq!(response.priv_key.expose(), "secret-material");
		assert!(!format!("{response:?}").contains("secret-material"));

		let back = serde_json::to_value(&response).unwrap();
		assert_eq!(back["privKey"], "secret-material");
		assert_eq!(back["networkCidr"], "100.64.0.0/16");
	}

	#[test]
	fn announce_request_field_names() {
		let request = AnnounceRequest {
			node_id: "n1".to_string(),
			endpoints: vec!["198.51.100.4:51820".to_string()],
			listen_port: Some(51820),
		};
		let value = serde_json::to_value(&request).unwrap();
		assert_eq!(value["nodeId"], "n1");
		assert_eq!(value["listenPort"], 51820);
	}
}
