// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use ipnet::Ipv4Net;
use mesh_common::{AnnounceRequest, Node, RegisterRequest, RegisterResponse, WgPrivateKey, WgPublicKey};
use mesh_tunnel::{ApplyReport, LocalTunnel, TunnelReconciler};
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::AgentConfig;
use crate::control::ControlPlane;
use crate::endpoints::{candidate_endpoints, local_addresses};
use crate::error::{AgentError, ControlError, Result, SyncError};

/// What the controller issued to this node.
#[derive(Debug, Clone)]
pub struct Membership {
	pub node: Node,
	pub tunnel: LocalTunnel,
}

#[derive(Debug, Clone, Default)]
pub enum AgentState {
	#[default]
	Unregistered,
	Synchronizing(Box<Membership>),
}

pub struct MeshAgent {
	config: AgentConfig,
	control: Arc<dyn ControlPlane>,
	reconciler: TunnelReconciler,
	local_addresses: fn() -> Vec<IpAddr>,
	state: AgentState,
}

impl MeshAgent {
	pub fn new(config: AgentConfig, control: Arc<dyn ControlPlane>, reconciler: TunnelReconciler) -> Self {
		Self {
			config,
			control,
			reconciler,
			local_addresses,
			state: AgentState::Unregistered,
		}
	}

	/// Replaces interface enumeration used when announcing.
	pub fn with_local_addresses(mut self, source: fn() -> Vec<IpAddr>) -> Self {
		self.local_addresses = source;
		self
	}

	pub fn state(&self) -> &AgentState {
		&self.state
	}

	pub fn membership(&self) -> Option<&Membership> {
		match &self.state {
			AgentState::Synchronizing(membership) => Some(membership),
			AgentState::Unregistered => None,
		}
	}

	/// Obtains an identity from the controller and returns the peers it
	/// already knows about.
	#[instrument(skip(self), fields(hostname = %self.config.hostname))]
	pub async fn register(&mut self) -> Result<Vec<Node>> {
		let request = RegisterRequest {
			hostname: self.config.hostname.clone(),
			os: self.config.os.clone(),
			version: self.config.version.clone(),
			endpoints: self.config.static_endpoints.clone(),
			listen_port: Some(self.config.listen_port),
		};

		let response = self
			.control
			.register(&request)
			.await
			.map_err(AgentError::Registration)?;
		let membership =
			membership_from(&response, self.config.listen_port).map_err(AgentError::Registration)?;

		info!(
			node_id = %membership.node.id,
			tunnel_ip = %membership.tunnel.address,
			network = %membership.tunnel.network,
			peers = response.peers.len(),
			"registered with controller"
		);

		self.state = AgentState::Synchronizing(Box::new(membership));
		Ok(response.peers)
	}

	/// Fetches the current peer set and applies it.
	pub async fn sync_once(&self) -> std::result::Result<ApplyReport, SyncError> {
		let membership = self.membership().ok_or(SyncError::NotRegistered)?;
		let peers = self.control.fetch_peers(&membership.node.id).await?;
		debug!(peers = peers.len(), "fetched peers");
		Ok(self.reconciler.apply(&membership.tunnel, &peers).await?)
	}

	/// Announces the current candidate endpoints. Returns how many were sent.
	pub async fn announce_once(&self) -> std::result::Result<usize, SyncError> {
		let membership = self.membership().ok_or(SyncError::NotRegistered)?;
		let endpoints = candidate_endpoints(
			&self.config.static_endpoints,
			&(self.local_addresses)(),
			self.config.listen_port,
			Some(membership.tunnel.network),
		);
		let count = endpoints.len();

		self
			.control
			.announce(&AnnounceRequest {
				node_id: membership.node.id.clone(),
				endpoints,
				listen_port: Some(self.config.listen_port),
			})
			.await?;
		debug!(endpoints = count, "announced endpoints");
		Ok(count)
	}

	/// Registers, applies the initial peer set, then polls and announces
	/// until `cancel` fires. Only a failed registration is returned as an
	/// error; everything after that is logged and retried on the next tick.
	pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
		if cancel.is_cancelled() {
			info!("cancelled before start");
			return Ok(());
		}

		if self.membership().is_none() {
			let peers = tokio::select! {
				biased;
				_ = cancel.cancelled() => {
					info!("cancelled during registration");
					return Ok(());
				}
				result = self.register() => result?,
			};
			self.apply_initial(&peers, &cancel).await;
		}

		let period = self.config.poll_interval;
		let mut poll = interval_at(Instant::now() + period, period);
		poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

		let mut announce = self.config.announce_interval.map(|period| {
			let mut ticker = interval(period);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
			ticker
		});

		info!(
			poll_secs = period.as_secs(),
			announce_secs = self.config.announce_interval.map(|d| d.as_secs()),
			"agent synchronizing"
		);

		loop {
			tokio::select! {
				biased;
				_ = cancel.cancelled() => break,
				_ = poll.tick() => self.poll_cycle(&cancel).await,
				_ = next_tick(&mut announce) => self.announce_cycle(&cancel).await,
			}
		}

		info!("agent stopped");
		Ok(())
	}

	async fn apply_initial(&self, peers: &[Node], cancel: &CancellationToken) {
		let Some(membership) = self.membership() else {
			return;
		};
		tokio::select! {
			biased;
			_ = cancel.cancelled() => {}
			result = self.reconciler.apply(&membership.tunnel, peers) => {
				if let Err(e) = result {
					error!(error = %e, "initial tunnel apply failed");
				}
			}
		}
	}

	async fn poll_cycle(&self, cancel: &CancellationToken) {
		tokio::select! {
			biased;
			_ = cancel.cancelled() => {}
			result = self.sync_once() => match result {
				Ok(report) => debug!(configured = report.peers_configured, "poll cycle complete"),
				Err(e) => warn!(error = %e, "poll cycle failed"),
			}
		}
	}

	async fn announce_cycle(&self, cancel: &CancellationToken) {
		tokio::select! {
			biased;
			_ = cancel.cancelled() => {}
			result = self.announce_once() => match result {
				Ok(_) => {}
				Err(SyncError::Control(ControlError::UnknownNode(id))) => {
					warn!(node_id = %id, "controller lost our identity; restart the agent to re-register");
				}
				Err(e) => warn!(error = %e, "announce failed"),
			}
		}
	}
}

/// Pending forever when announcing is disabled.
async fn next_tick(ticker: &mut Option<Interval>) {
	match ticker {
		Some(ticker) => {
			ticker.tick().await;
		}
		None => std::future::pending().await,
	}
}

fn membership_from(response: &RegisterResponse, listen_port: u16) -> std::result::Result<Membership, ControlError> {
	let node = response.node.clone();
	let private_key = WgPrivateKey::from_base64(response.priv_key.expose())
		.map_err(|e| ControlError::InvalidResponse(format!("privKey: {e}")))?;
	let address: Ipv4Addr = node
		.tunnel_ip
		.parse()
		.map_err(|_| ControlError::InvalidResponse(format!("tunnelIp '{}'", node.tunnel_ip)))?;
	let network: Ipv4Net = response
		.network_cidr
		.parse()
		.map_err(|_| ControlError::InvalidResponse(format!("networkCidr '{}'", response.network_cidr)))?;
	if !network.contains(&address) {
		return Err(ControlError::InvalidResponse(format!(
			"tunnel address {address} is outside {network}"
		)));
	}

	match WgPublicKey::from_base64(&node.public_key) {
		Ok(published) if published != private_key.public_key() => {
			warn!(node_id = %node.id, "published public key does not match issued private key");
		}
		Ok(_) => {}
		Err(e) => warn!(node_id = %node.id, error = %e, "controller published an unreadable public key"),
	}

	Ok(Membership {
		tunnel: LocalTunnel {
			node_id: node.id.clone(),
			private_key,
			address,
			network,
			listen_port: Some(listen_port),
		},
		node,
	})
}
