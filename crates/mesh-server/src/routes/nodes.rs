// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Node registration, peer listing and endpoint announcement.

use axum::{
	extract::{
		rejection::{JsonRejection, QueryRejection},
		Query, State,
	},
	http::StatusCode,
	Json,
};
use mesh_common::{AnnounceRequest, Node, PeersResponse, RegisterRequest, RegisterResponse};
use mesh_server_registry::RegisterNode;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use utoipa::IntoParams;

use crate::{
	error::{ErrorResponse, ServerError},
	validation::{validate_announce, validate_register},
	AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct PeersQuery {
	/// Caller to leave out of the list.
	pub node_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Node admitted", body = RegisterResponse),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 503, description = "Address block exhausted", body = ErrorResponse),
        (status = 500, description = "Key generation failed", body = ErrorResponse)
    ),
    tag = "nodes"
)]
/// POST /api/register - Admit a node and return its identity, key and peers.
#[instrument(skip(state, payload))]
pub async fn register(
	State(state): State<AppState>,
	payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ServerError> {
	let Json(request) = payload?;
	validate_register(&request)?;

	let registration = state.registry.register(RegisterNode {
		hostname: request.hostname.trim().to_string(),
		os: request.os,
		version: request.version,
		endpoints: request.endpoints,
		listen_port: request.listen_port,
	})?;

	let node_id = registration.record.id.clone();
	let peers: Vec<Node> = state
		.registry
		.list_peers(Some(&node_id))
		.iter()
		.map(Node::from)
		.collect();

	info!(
		node_id = %node_id,
		tunnel_ip = %registration.record.tunnel_address,
		peers = peers.len(),
		"registration complete"
	);

	Ok(Json(RegisterResponse {
		node: Node::from(&registration.record),
		peers,
		priv_key: registration.private_key.to_base64(),
		network_cidr: state.registry.network().to_string(),
	}))
}

#[utoipa::path(
    get,
    path = "/api/peers",
    params(PeersQuery),
    responses(
        (status = 200, description = "Current peers ordered by tunnel address", body = PeersResponse),
        (status = 400, description = "Malformed query", body = ErrorResponse)
    ),
    tag = "nodes"
)]
/// GET /api/peers - Every node except the caller.
pub async fn list_peers(
	State(state): State<AppState>,
	query: Result<Query<PeersQuery>, QueryRejection>,
) -> Result<Json<PeersResponse>, ServerError> {
	let Query(query) = query?;
	let excluding = query.node_id.as_deref().filter(|id| !id.is_empty());

	let peers = state
		.registry
		.list_peers(excluding)
		.iter()
		.map(Node::from)
		.collect();

	Ok(Json(PeersResponse { peers }))
}

#[utoipa::path(
    post,
    path = "/api/announce",
    request_body = AnnounceRequest,
    responses(
        (status = 204, description = "Endpoints replaced"),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 404, description = "Unknown node", body = ErrorResponse)
    ),
    tag = "nodes"
)]
/// POST /api/announce - Replace a node's candidate endpoints.
#[instrument(skip(state, payload))]
pub async fn announce(
	State(state): State<AppState>,
	payload: Result<Json<AnnounceRequest>, JsonRejection>,
) -> Result<StatusCode, ServerError> {
	let Json(request) = payload?;
	validate_announce(&request)?;

	match state
		.registry
		.update_endpoints(&request.node_id, request.endpoints, request.listen_port)
	{
		Ok(record) => {
			info!(
				node_id = %record.id,
				endpoint = ?record.selected_endpoint,
				"endpoints announced"
			);
			Ok(StatusCode::NO_CONTENT)
		}
		Err(e) => {
			warn!(node_id = %request.node_id, error = %e, "announce rejected");
			Err(e.into())
		}
	}
}
