// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	extract::rejection::{JsonRejection, QueryRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use mesh_server_registry::RegistryError;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	/// Request body or query failed validation.
	#[error("Malformed request: {0}")]
	Malformed(String),

	#[error("Node not found: {0}")]
	NotFound(String),

	/// The tunnel address block has no free addresses.
	#[error("Address block exhausted: {0}")]
	Exhausted(String),

	#[error("Internal error: {0}")]
	Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl From<RegistryError> for ServerError {
	fn from(e: RegistryError) -> Self {
		match e {
			RegistryError::AllocationExhausted { .. } => ServerError::Exhausted(e.to_string()),
			RegistryError::NotFound(id) => ServerError::NotFound(id),
			RegistryError::KeyGeneration(_) | RegistryError::InvalidBlock { .. } => {
				ServerError::Internal(e.to_string())
			}
		}
	}
}

impl From<JsonRejection> for ServerError {
	fn from(rejection: JsonRejection) -> Self {
		ServerError::Malformed(rejection.body_text())
	}
}

impl From<QueryRejection> for ServerError {
	fn from(rejection: QueryRejection) -> Self {
		ServerError::Malformed(rejection.body_text())
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, error, message) = match self {
			ServerError::Malformed(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
			ServerError::NotFound(id) => (
				StatusCode::NOT_FOUND,
				"not_found",
				format!("Node not found: {id}"),
			),
			ServerError::Exhausted(msg) => {
				tracing::warn!(error = %msg, "address block exhausted");
				(
					StatusCode::SERVICE_UNAVAILABLE,
					"address_exhausted",
					"No tunnel addresses are available".to_string(),
				)
			}
			ServerError::Internal(msg) => {
				tracing::error!(error = %msg, "internal error");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					"internal_error",
					"An internal error occurred".to_string(),
				)
			}
		};

		(
			status,
			Json(ErrorResponse {
				error: error.to_string(),
				message,
			}),
		)
			.into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn registry_errors_map_to_status() {
		let exhausted: ServerError = RegistryError::AllocationExhausted {
			network: "10.0.0.0/30".parse().unwrap(),
		}
		.into();
		assert_eq!(
			exhausted.into_response().status(),
			StatusCode::SERVICE_UNAVAILABLE
		);

		let missing: ServerError = RegistryError::NotFound("abc".to_string()).into();
		assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);
	}

	#[test]
	fn malformed_is_bad_request() {
		let err = ServerError::Malformed("hostname is required".to_string());
		assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
	}
}
