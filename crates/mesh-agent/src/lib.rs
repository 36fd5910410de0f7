// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mesh agent: registers this host with the controller, then keeps the
//! local WireGuard device in step with the controller's peer list.

pub mod config;
pub mod control;
pub mod daemon;
pub mod endpoints;
pub mod error;

pub use config::AgentConfig;
pub use control::{ControlPlane, HttpControlClient};
pub use daemon::{AgentState, MeshAgent, Membership};
pub use endpoints::{candidate_endpoints, local_addresses};
pub use error::{AgentError, ConfigError, ControlError, Result, SyncError};
