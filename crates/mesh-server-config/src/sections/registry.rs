// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tunnel address block configuration.

use ipnet::Ipv4Net;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_CIDR: &str = "100.64.0.0/16";
/// Offset of the first address handed out; the bottom of the block stays
/// free for the network address and infrastructure.
pub const DEFAULT_START_OFFSET: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
	pub network: Ipv4Net,
	pub start_offset: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfigLayer {
	#[serde(default)]
	pub cidr: Option<String>,
	#[serde(default)]
	pub start_offset: Option<u32>,
}

impl RegistryConfigLayer {
	pub fn merge(&mut self, other: RegistryConfigLayer) {
		if other.cidr.is_some() {
			self.cidr = other.cidr;
		}
		if other.start_offset.is_some() {
			self.start_offset = other.start_offset;
		}
	}

	pub fn finalize(self) -> Result<RegistryConfig, ConfigError> {
		let cidr = self.cidr.unwrap_or_else(|| DEFAULT_CIDR.to_string());
		let network: Ipv4Net = cidr.parse().map_err(|e| ConfigError::InvalidValue {
			key: "registry.cidr".to_string(),
			message: format!("'{cidr}' is not an IPv4 CIDR block: {e}"),
		})?;
		let network = network.trunc();

		let start_offset = self.start_offset.unwrap_or(DEFAULT_START_OFFSET);
		let block_size = 1u64 << (32 - u32::from(network.prefix_len()));
		if u64::from(start_offset) >= block_size {
			return Err(ConfigError::InvalidValue {
				key: "registry.start_offset".to_string(),
				message: format!(
					"offset {start_offset} does not fit in {network} ({block_size} addresses)"
				),
			});
		}

		Ok(RegistryConfig {
			network,
			start_offset,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = RegistryConfigLayer::default().finalize().unwrap();
		assert_eq!(config.network.to_string(), "100.64.0.0/16");
		assert_eq!(config.start_offset, 10);
	}

	#[test]
	fn test_invalid_cidr() {
		let layer = RegistryConfigLayer {
			cidr: Some("not-a-block".to_string()),
			start_offset: None,
		};
		let err = layer.finalize().unwrap_err();
		assert!(err.to_string().contains("registry.cidr"));
	}

	#[test]
	fn test_ipv6_block_rejected() {
		let layer = RegistryConfigLayer {
			cidr: Some("fd00::/64".to_string()),
			start_offset: None,
		};
		assert!(layer.finalize().is_err());
	}

	#[test]
	fn test_offset_must_fit() {
		let layer = RegistryConfigLayer {
			cidr: Some("10.0.0.0/29".to_string()),
			start_offset: Some(8),
		};
		let err = layer.finalize().unwrap_err();
		assert!(err.to_string().contains("registry.start_offset"));
	}

	#[test]
	fn test_host_bits_truncated() {
		let layer = RegistryConfigLayer {
			cidr: Some("10.1.2.3/16".to_string()),
			start_offset: None,
		};
		assert_eq!(layer.finalize().unwrap().network.to_string(), "10.1.0.0/16");
	}
}
