// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP control API for the mesh controller.

pub mod api_docs;
pub mod error;
pub mod routes;
pub mod validation;

use std::sync::Arc;

use axum::{
	routing::{get, post},
	Json, Router,
};
use mesh_server_registry::NodeRegistry;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

pub use error::{ErrorResponse, ServerError};

/// Shared handler state. Handlers hold no state of their own.
#[derive(Clone)]
pub struct AppState {
	pub registry: Arc<NodeRegistry>,
}

impl AppState {
	pub fn new(registry: Arc<NodeRegistry>) -> Self {
		Self { registry }
	}
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(routes::health::health_check))
		.route("/api/register", post(routes::nodes::register))
		.route("/api/peers", get(routes::nodes::list_peers))
		.route("/api/announce", post(routes::nodes::announce))
		.route(
			"/api/openapi.json",
			get(|| async { Json(api_docs::ApiDoc::openapi()) }),
		)
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}
