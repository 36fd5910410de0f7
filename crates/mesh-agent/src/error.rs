// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use mesh_tunnel::ReconcileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
	/// The only fatal condition: without an identity there is nothing to sync.
	#[error("registration failed: {0}")]
	Registration(#[source] ControlError),

	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ControlError {
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("URL parse error: {0}")]
	Url(#[from] url::ParseError),

	#[error("{operation} returned HTTP {status}: {body}")]
	Status {
		operation: &'static str,
		status: u16,
		body: String,
	},

	#[error("controller does not know node {0}")]
	UnknownNode(String),

	#[error("invalid controller response: {0}")]
	InvalidResponse(String),
}

/// Failure of one poll or announce cycle. Logged; the next tick retries.
#[derive(Debug, Error)]
pub enum SyncError {
	#[error("agent is not registered")]
	NotRegistered,

	#[error(transparent)]
	Control(#[from] ControlError),

	#[error(transparent)]
	Apply(#[from] ReconcileError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("invalid {key}: {message}")]
	Invalid { key: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, AgentError>;
