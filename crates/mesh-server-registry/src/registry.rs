// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::allocator::AddressAllocator;
use crate::error::{RegistryError, Result};
use chrono::{DateTime, Utc};
use ipnet::Ipv4Net;
use mesh_common::{new_node_id, select_endpoint, Node, WgKeyPair, WgPrivateKey, WgPublicKey};
use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
	pub id: String,
	pub hostname: String,
	pub os: String,
	pub version: String,
	pub public_key: WgPublicKey,
	pub tunnel_address: Ipv4Addr,
	pub candidate_endpoints: Vec<String>,
	pub selected_endpoint: Option<String>,
	pub listen_port: Option<u16>,
	pub last_seen: DateTime<Utc>,
}

impl From<&NodeRecord> for Node {
	fn from(record: &NodeRecord) -> Self {
		Node {
			id: record.id.clone(),
			hostname: record.hostname.clone(),
			os: record.os.clone(),
			version: record.version.clone(),
			public_key: record.public_key.to_base64(),
			tunnel_ip: record.tunnel_address.to_string(),
			endpoints: record.candidate_endpoints.clone(),
			endpoint: record.selected_endpoint.clone(),
			listen_port: record.listen_port,
			last_seen: Some(record.last_seen),
		}
	}
}

/// Validated registration input.
#[derive(Debug, Clone, Default)]
pub struct RegisterNode {
	pub hostname: String,
	pub os: String,
	pub version: String,
	pub endpoints: Vec<String>,
	pub listen_port: Option<u16>,
}

/// A freshly admitted node together with the private key generated for it.
/// The key is not retained by the registry.
#[derive(Debug)]
pub struct Registration {
	pub record: NodeRecord,
	pub private_key: WgPrivateKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
	pub nodes: usize,
	pub addresses_issued: u64,
	pub address_capacity: u64,
}

#[derive(Debug)]
struct RegistryState {
	nodes: HashMap<String, NodeRecord>,
	by_address: BTreeMap<Ipv4Addr, String>,
	allocator: AddressAllocator,
}

/// Thread-safe node membership.
///
/// Key and identifier generation happen before the write lock is taken, so
/// the critical section is allocation plus two map inserts.
#[derive(Debug)]
pub struct NodeRegistry {
	network: Ipv4Net,
	state: RwLock<RegistryState>,
}

impl NodeRegistry {
	pub fn new(network: Ipv4Net, start_offset: u32) -> Result<Self> {
		let allocator = AddressAllocator::new(network, start_offset)?;
		Ok(Self {
			network: allocator.network(),
			state: RwLock::new(RegistryState {
				nodes: HashMap::new(),
				by_address: BTreeMap::new(),
				allocator,
			}),
		})
	}

	pub fn network(&self) -> Ipv4Net {
		self.network
	}

	fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
		self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
		self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Admits a new node: fresh key pair, fresh identifier, next free
	/// address. Nothing is stored when any step fails.
	#[instrument(skip(self, request), fields(hostname = %request.hostname))]
	pub fn register(&self, request: RegisterNode) -> Result<Registration> {
		let keypair = WgKeyPair::try_generate()?;
		let id = new_node_id()?;
		let selected_endpoint = select_endpoint(&request.endpoints);

		let record = {
			let mut state = self.write();
			let tunnel_address = state.allocator.allocate()?;
			let record = NodeRecord {
				id: id.clone(),
				hostname: request.hostname,
				os: request.os,
				version: request.version,
				public_key: *keypair.public_key(),
				tunnel_address,
				candidate_endpoints: request.endpoints,
				selected_endpoint,
				listen_port: request.listen_port,
				last_seen: Utc::now(),
			};
			state.by_address.insert(tunnel_address, id.clone());
			state.nodes.insert(id, record.clone());
			record
		};

		info!(
			node_id = %record.id,
			tunnel_address = %record.tunnel_address,
			endpoint = ?record.selected_endpoint,
			"node registered"
		);

		Ok(Registration {
			record,
			private_key: keypair.into_private_key(),
		})
	}

	/// Every node except `excluding`, ordered by tunnel address.
	pub fn list_peers(&self, excluding: Option<&str>) -> Vec<NodeRecord> {
		let state = self.read();
		state
			.by_address
			.values()
			.filter(|id| Some(id.as_str()) != excluding)
			.filter_map(|id| state.nodes.get(id))
			.cloned()
			.collect()
	}

	pub fn get(&self, node_id: &str) -> Option<NodeRecord> {
		self.read().nodes.get(node_id).cloned()
	}

	/// Replaces a node's candidate endpoints and re-runs selection.
	#[instrument(skip(self, endpoints), fields(candidates = endpoints.len()))]
	pub fn update_endpoints(
		&self,
		node_id: &str,
		endpoints: Vec<String>,
		listen_port: Option<u16>,
	) -> Result<NodeRecord> {
		let selected_endpoint = select_endpoint(&endpoints);

		let mut state = self.write();
		let record = state
			.nodes
			.get_mut(node_id)
			.ok_or_else(|| RegistryError::NotFound(node_id.to_string()))?;

		record.candidate_endpoints = endpoints;
		record.selected_endpoint = selected_endpoint;
		if listen_port.is_some() {
			record.listen_port = listen_port;
		}
		record.last_seen = Utc::now();

		debug!(endpoint = ?record.selected_endpoint, "endpoints updated");
		Ok(record.clone())
	}

	pub fn len(&self) -> usize {
		self.read().nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn stats(&self) -> RegistryStats {
		let state = self.read();
		RegistryStats {
			nodes: state.nodes.len(),
			addresses_issued: state.allocator.issued_count(),
			address_capacity: state.allocator.capacity(),
		}
	}
}
