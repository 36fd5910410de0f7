// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt::Write as _;
use std::net::{Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use ipnet::Ipv4Net;
use mesh_common::{SecretString, WgPrivateKey, WgPublicKey};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
	pub public_key: WgPublicKey,
	/// Always a /32 for the peer's tunnel address.
	pub allowed_ip: Ipv4Net,
	pub endpoint: Option<SocketAddr>,
}

/// Full desired device state. Applying it replaces every existing peer.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
	pub private_key: WgPrivateKey,
	pub listen_port: Option<u16>,
	pub peers: Vec<PeerConfig>,
}

impl DeviceConfig {
	/// Renders the `wg setconf`/`wg syncconf` file format. Contains the
	/// private key, hence the wrapper.
	pub fn render(&self) -> SecretString {
		let mut out = String::new();
		out.push_str("[Interface]\n");
		let _ = writeln!(out, "PrivateKey = {}", self.private_key.to_base64().expose());
		if let Some(port) = self.listen_port {
			let _ = writeln!(out, "ListenPort = {port}");
		}

		for peer in &self.peers {
			out.push_str("\n[Peer]\n");
			let _ = writeln!(out, "PublicKey = {}", peer.public_key);
			let _ = writeln!(out, "AllowedIPs = {}", peer.allowed_ip);
			if let Some(endpoint) = peer.endpoint {
				let _ = writeln!(out, "Endpoint = {endpoint}");
			}
		}

		SecretString::new(out)
	}
}

/// The operations the reconciler needs from a WireGuard interface.
///
/// Every method must be safe to repeat: calling it against a device that
/// already matches leaves the device unchanged.
#[async_trait]
pub trait TunnelDevice: Send + Sync {
	fn name(&self) -> &str;

	/// Creates the interface if absent and brings it up.
	async fn ensure_device(&self) -> Result<()>;

	/// Leaves exactly `address/32` on the interface and a route for
	/// `network` through it.
	async fn ensure_address_and_route(&self, address: Ipv4Addr, network: Ipv4Net) -> Result<()>;

	/// Replaces key, listen port and the whole peer set in one update.
	async fn configure_device(&self, config: &DeviceConfig) -> Result<()>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn render_lists_each_peer() {
		let private = WgPrivateKey::from_bytes([1u8; 32]);
		let a = WgPrivateKey::from_bytes([2u8; 32]).public_key();
		let b = WgPrivateKey::from_bytes([3u8; 32]).public_key();
		let config = DeviceConfig {
			private_key: private.clone(),
			listen_port: Some(51820),
			peers: vec![
				PeerConfig {
					public_key: a,
					allowed_ip: "100.64.0.11/32".parse().unwrap(),
					endpoint: Some("203.0.113.5:51820".parse().unwrap()),
				},
				PeerConfig {
					public_key: b,
					allowed_ip: "100.64.0.12/32".parse().unwrap(),
					endpoint: None,
				},
			],
		};

		let rendered = config.render();
		let text = rendered.expose();
		assert!(text.starts_with("[Interface]\n"));
		assert!(text.contains(&format!("PrivateKey = {}", private.to_base64().expose())));
		assert!(text.contains("ListenPort = 51820"));
		assert_eq!(text.matches("[Peer]").count(), 2);
		assert!(text.contains(&format!("PublicKey = {a}")));
		assert!(text.contains("AllowedIPs = 100.64.0.11/32"));
		assert_eq!(text.matches("Endpoint = ").count(), 1);
		assert!(!format!("{rendered:?}").contains("PrivateKey"));
	}

	#[test]
	fn render_without_peers_or_port() {
		let config = DeviceConfig {
			private_key: WgPrivateKey::from_bytes([1u8; 32]),
			listen_port: None,
			peers: vec![],
		};
		let rendered = config.render();
		assert!(!rendered.expose().contains("ListenPort"));
		assert!(!rendered.expose().contains("[Peer]"));
	}
}
