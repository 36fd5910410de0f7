// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use mesh_common::{AnnounceRequest, Node, PeersResponse, RegisterRequest, RegisterResponse};
use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::routes::health::HealthResponse;

#[derive(OpenApi)]
#[openapi(
	info(title = "Mesh control API", description = "Node registration and peer distribution"),
	paths(
		crate::routes::health::health_check,
		crate::routes::nodes::register,
		crate::routes::nodes::list_peers,
		crate::routes::nodes::announce,
	),
	components(schemas(
		Node,
		RegisterRequest,
		RegisterResponse,
		PeersResponse,
		AnnounceRequest,
		HealthResponse,
		ErrorResponse,
	)),
	tags(
		(name = "nodes", description = "Mesh membership"),
		(name = "health", description = "Controller health"),
	)
)]
pub struct ApiDoc;
