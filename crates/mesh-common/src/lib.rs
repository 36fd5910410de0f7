// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Types shared by the mesh controller and agent.

pub mod endpoint;
pub mod keys;
pub mod node;
pub mod secret;

pub use endpoint::{is_valid_endpoint, parse_endpoint, select_endpoint};
pub use keys::{new_node_id, random_id, KeyError, WgKeyPair, WgPrivateKey, WgPublicKey};
pub use node::{AnnounceRequest, Node, PeersResponse, RegisterRequest, RegisterResponse};
pub use secret::{Secret, SecretString};

/// Conventional WireGuard listen port.
pub const DEFAULT_LISTEN_PORT: u16 = 51820;
