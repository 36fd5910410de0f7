// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory [`TunnelDevice`] for tests and `--dry-run`.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use ipnet::Ipv4Net;
use mesh_common::WgPublicKey;
use tracing::info;

use crate::device::{DeviceConfig, PeerConfig, TunnelDevice};
use crate::error::{DeviceError, Result};

/// Recorded call to the mock device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockCall {
	EnsureDevice,
	EnsureAddressAndRoute { address: Ipv4Addr, network: Ipv4Net },
	ConfigureDevice { peers: usize },
}

/// Step at which the mock should fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockFailure {
	EnsureDevice,
	AddressRoute,
	Configure,
}

/// What a real interface would look like after the calls so far. The
/// private key is kept only as its public half.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MockDeviceState {
	pub exists: bool,
	pub up: bool,
	pub addresses: Vec<Ipv4Net>,
	pub routes: Vec<Ipv4Net>,
	pub public_key: Option<WgPublicKey>,
	pub listen_port: Option<u16>,
	pub peers: Vec<PeerConfig>,
	/// Incremented whenever an operation actually changes the state.
	pub changes: u64,
}

/// Clones share calls and state.
#[derive(Clone, Debug)]
pub struct MockDevice {
	name: String,
	failure: Arc<Mutex<Option<MockFailure>>>,
	state: Arc<Mutex<MockDeviceState>>,
	calls: Arc<Mutex<Vec<MockCall>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockDevice {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			failure: Arc::new(Mutex::new(None)),
			state: Arc::new(Mutex::new(MockDeviceState::default())),
			calls: Arc::new(Mutex::new(Vec::new())),
		}
	}

	pub fn with_failure(self, failure: MockFailure) -> Self {
		self.set_failure(Some(failure));
		self
	}

	pub fn set_failure(&self, failure: Option<MockFailure>) {
		*lock(&self.failure) = failure;
	}

	pub fn state(&self) -> MockDeviceState {
		lock(&self.state).clone()
	}

	pub fn get_calls(&self) -> Vec<MockCall> {
		lock(&self.calls).clone()
	}

	fn record(&self, call: MockCall) {
		lock(&self.calls).push(call);
	}

	fn check(&self, stage: MockFailure) -> Result<()> {
		if *lock(&self.failure) == Some(stage) {
			return Err(DeviceError::CommandFailed {
				program: "mock",
				args: format!("{stage:?}"),
				stderr: "injected failure".to_string(),
			});
		}
		Ok(())
	}
}

#[async_trait]
impl TunnelDevice for MockDevice {
	fn name(&self) -> &str {
		&self.name
	}

	async fn ensure_device(&self) -> Result<()> {
		self.record(MockCall::EnsureDevice);
		self.check(MockFailure::EnsureDevice)?;

		let mut state = lock(&self.state);
		if !state.exists || !state.up {
			state.exists = true;
			state.up = true;
			state.changes += 1;
		}
		Ok(())
	}

	async fn ensure_address_and_route(&self, address: Ipv4Addr, network: Ipv4Net) -> Result<()> {
		self.record(MockCall::EnsureAddressAndRoute { address, network });
		self.check(MockFailure::AddressRoute)?;

		let wanted = Ipv4Net::from(address);
		let mut state = lock(&self.state);
		if state.addresses != [wanted] {
			state.addresses = vec![wanted];
			state.changes += 1;
		}
		if !state.routes.contains(&network) {
			state.routes.push(network);
			state.changes += 1;
		}
		Ok(())
	}

	async fn configure_device(&self, config: &DeviceConfig) -> Result<()> {
		self.record(MockCall::ConfigureDevice {
			peers: config.peers.len(),
		});
		self.check(MockFailure::Configure)?;

		let public_key = Some(config.private_key.public_key());
		let mut state = lock(&self.state);
		if state.public_key != public_key
			|| state.listen_port != config.listen_port
			|| state.peers != config.peers
		{
			state.public_key = public_key;
			state.listen_port = config.listen_port;
			state.peers = config.peers.clone();
			state.changes += 1;
			info!(device = %self.name, peers = config.peers.len(), "dry-run peer set applied");
		}
		Ok(())
	}
}
