// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
	pub status: String,
	pub nodes: usize,
	pub addresses_issued: u64,
	pub address_capacity: u64,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Controller is serving", body = HealthResponse)
    ),
    tag = "health"
)]
/// GET /health - Liveness plus address block usage.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
	let stats = state.registry.stats();
	Json(HealthResponse {
		status: "ok".to_string(),
		nodes: stats.nodes,
		addresses_issued: stats.addresses_issued,
		address_capacity: stats.address_capacity,
	})
}
