// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use ipnet::Ipv4Net;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
	#[error("address block {network} is exhausted")]
	AllocationExhausted { network: Ipv4Net },

	#[error("key generation failed: {0}")]
	KeyGeneration(#[from] mesh_common::KeyError),

	#[error("node not found: {0}")]
	NotFound(String),

	#[error("invalid address block {network}: {reason}")]
	InvalidBlock { network: Ipv4Net, reason: String },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
