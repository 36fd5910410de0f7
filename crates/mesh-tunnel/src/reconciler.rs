// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use ipnet::Ipv4Net;
use mesh_common::{Node, WgPrivateKey, WgPublicKey};
use tokio::net::lookup_host;
use tracing::{debug, info, instrument};

use crate::device::{DeviceConfig, PeerConfig, TunnelDevice};
use crate::error::ReconcileError;

/// This node's side of the tunnel, as issued at registration.
#[derive(Debug, Clone)]
pub struct LocalTunnel {
	pub node_id: String,
	pub private_key: WgPrivateKey,
	pub address: Ipv4Addr,
	pub network: Ipv4Net,
	pub listen_port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
	pub peers_configured: usize,
	/// Peers with a missing or unparseable key or address, plus self.
	pub peers_skipped: usize,
	/// Configured peers whose announced endpoint did not resolve.
	pub endpoints_unresolved: usize,
}

/// Converges a [`TunnelDevice`] onto a desired peer list.
pub struct TunnelReconciler {
	device: Arc<dyn TunnelDevice>,
}

impl TunnelReconciler {
	pub fn new(device: Arc<dyn TunnelDevice>) -> Self {
		Self { device }
	}

	/// Brings the device up, pins the local address and route, then
	/// replaces the peer set with `desired`. Safe to repeat with the same
	/// input. A failed step stops the apply; earlier steps stay applied.
	#[instrument(skip_all, fields(iface = %self.device.name(), node_id = %local.node_id, desired = desired.len()))]
	pub async fn apply(
		&self,
		local: &LocalTunnel,
		desired: &[Node],
	) -> Result<ApplyReport, ReconcileError> {
		self
			.device
			.ensure_device()
			.await
			.map_err(ReconcileError::EnsureDevice)?;

		self
			.device
			.ensure_address_and_route(local.address, local.network)
			.await
			.map_err(ReconcileError::AddressRoute)?;

		let mut report = ApplyReport::default();
		let mut peers: Vec<PeerConfig> = Vec::with_capacity(desired.len());

		for node in desired {
			let Some((public_key, address)) = peer_identity(local, node) else {
				report.peers_skipped += 1;
				continue;
			};
			if peers.iter().any(|p| p.public_key == public_key) {
				debug!(node_id = %node.id, "duplicate public key, skipping");
				report.peers_skipped += 1;
				continue;
			}

			let endpoint = match node.endpoint.as_deref() {
				Some(endpoint) => {
					let resolved = resolve_endpoint(endpoint).await;
					if resolved.is_none() {
						debug!(node_id = %node.id, %endpoint, "endpoint did not resolve");
						report.endpoints_unresolved += 1;
					}
					resolved
				}
				None => None,
			};

			peers.push(PeerConfig {
				public_key,
				allowed_ip: Ipv4Net::from(address),
				endpoint,
			});
		}

		report.peers_configured = peers.len();

		self
			.device
			.configure_device(&DeviceConfig {
				private_key: local.private_key.clone(),
				listen_port: local.listen_port,
				peers,
			})
			.await
			.map_err(ReconcileError::Configure)?;

		info!(
			configured = report.peers_configured,
			skipped = report.peers_skipped,
			unresolved = report.endpoints_unresolved,
			"tunnel reconciled"
		);
		Ok(report)
	}
}

fn peer_identity(local: &LocalTunnel, node: &Node) -> Option<(WgPublicKey, Ipv4Addr)> {
	if node.id == local.node_id {
		return None;
	}
	if node.public_key.is_empty() || node.tunnel_ip.is_empty() {
		debug!(node_id = %node.id, "peer missing key or address");
		return None;
	}
	let public_key = WgPublicKey::from_base64(&node.public_key)
		.map_err(|e| debug!(node_id = %node.id, error = %e, "invalid peer key"))
		.ok()?;
	let address: Ipv4Addr = node
		.tunnel_ip
		.parse()
		.map_err(|_| debug!(node_id = %node.id, tunnel_ip = %node.tunnel_ip, "invalid peer address"))
		.ok()?;
	if address == local.address {
		return None;
	}
	Some((public_key, address))
}

/// Prefers an IPv4 result since the mesh runs over IPv4.
async fn resolve_endpoint(endpoint: &str) -> Option<SocketAddr> {
	let addrs: Vec<SocketAddr> = lookup_host(endpoint).await.ok()?.collect();
	addrs
		.iter()
		.find(|a| a.is_ipv4())
		.or_else(|| addrs.first())
		.copied()
}
