// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Local endpoint discovery for announce.

use std::net::{IpAddr, SocketAddr};

use ipnet::Ipv4Net;
use tracing::warn;

/// Addresses of every local interface, as reported by the OS.
pub fn local_addresses() -> Vec<IpAddr> {
	match local_ip_address::list_afinet_netifas() {
		Ok(ifaces) => ifaces.into_iter().map(|(_, addr)| addr).collect(),
		Err(e) => {
			warn!(error = %e, "failed to enumerate local interfaces");
			Vec::new()
		}
	}
}

/// Builds the announce list: `static_endpoints` in order, then each usable
/// local IPv4 address paired with `listen_port`. Loopback, unspecified and
/// addresses inside `mesh` (our own tunnel) are left out. Duplicates are
/// dropped, keeping the first occurrence.
pub fn candidate_endpoints(
	static_endpoints: &[String],
	local: &[IpAddr],
	listen_port: u16,
	mesh: Option<Ipv4Net>,
) -> Vec<String> {
	let mut out: Vec<String> = Vec::with_capacity(static_endpoints.len() + local.len());
	let mut push = |candidate: String| {
		if !out.contains(&candidate) {
			out.push(candidate);
		}
	};

	for endpoint in static_endpoints {
		push(endpoint.clone());
	}

	// Without a port there is nothing to pair local addresses with.
	if listen_port != 0 {
		for addr in local {
			let IpAddr::V4(v4) = addr else { continue };
			if v4.is_loopback() || v4.is_unspecified() {
				continue;
			}
			if mesh.is_some_and(|net| net.contains(v4)) {
				continue;
			}
			push(SocketAddr::new(*addr, listen_port).to_string());
		}
	}

	out
}
