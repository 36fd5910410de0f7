// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
	#[error("{program} is not installed")]
	ToolMissing { program: &'static str },

	#[error("{program} {args} failed: {stderr}")]
	CommandFailed {
		program: &'static str,
		args: String,
		stderr: String,
	},

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

/// Which reconciliation step failed. Nothing already applied is rolled back.
#[derive(Error, Debug)]
pub enum ReconcileError {
	#[error("failed to ensure tunnel device: {0}")]
	EnsureDevice(#[source] DeviceError),

	#[error("failed to configure tunnel address or route: {0}")]
	AddressRoute(#[source] DeviceError),

	#[error("failed to apply peer configuration: {0}")]
	Configure(#[source] DeviceError),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
