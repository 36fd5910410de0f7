// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The agent's view of the controller API.

use std::time::Duration;

use async_trait::async_trait;
use mesh_common::{AnnounceRequest, Node, PeersResponse, RegisterRequest, RegisterResponse};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use crate::error::ControlError;

/// Longest error body kept in a [`ControlError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[async_trait]
pub trait ControlPlane: Send + Sync {
	async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ControlError>;

	/// Every node except `node_id`.
	async fn fetch_peers(&self, node_id: &str) -> Result<Vec<Node>, ControlError>;

	/// Fails with [`ControlError::UnknownNode`] when the controller has no
	/// record of the node.
	async fn announce(&self, request: &AnnounceRequest) -> Result<(), ControlError>;
}

pub struct HttpControlClient {
	base_url: Url,
	http: Client,
}

impl HttpControlClient {
	/// API paths resolve under `base_url`, so a controller mounted at
	/// `https://host/mesh` is reached at `https://host/mesh/api/...`.
	pub fn new(mut base_url: Url, timeout: Duration) -> Result<Self, ControlError> {
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());
			base_url.set_path(&path);
		}
		let http = mesh_common_http::new_client_with_timeout(timeout)?;
		Ok(Self { base_url, http })
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	fn endpoint(&self, path: &str) -> Result<Url, ControlError> {
		Ok(self.base_url.join(path)?)
	}
}

#[async_trait]
impl ControlPlane for HttpControlClient {
	#[instrument(skip(self, request), fields(hostname = %request.hostname))]
	async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ControlError> {
		let url = self.endpoint("api/register")?;
		debug!(%url, "registering with controller");

		let response = self.http.post(url).json(request).send().await?;
		let response = check_status("register", response).await?;
		Ok(response.json::<RegisterResponse>().await?)
	}

	#[instrument(skip(self))]
	async fn fetch_peers(&self, node_id: &str) -> Result<Vec<Node>, ControlError> {
		let mut url = self.endpoint("api/peers")?;
		url.query_pairs_mut().append_pair("nodeId", node_id);

		let response = self.http.get(url).send().await?;
		let response = check_status("fetch peers", response).await?;
		Ok(response.json::<PeersResponse>().await?.peers)
	}

	#[instrument(skip(self, request), fields(node_id = %request.node_id, endpoints = request.endpoints.len()))]
	async fn announce(&self, request: &AnnounceRequest) -> Result<(), ControlError> {
		let url = self.endpoint("api/announce")?;

		let response = self.http.post(url).json(request).send().await?;
		if response.status() == StatusCode::NOT_FOUND {
			return Err(ControlError::UnknownNode(request.node_id.clone()));
		}
		check_status("announce", response).await?;
		Ok(())
	}
}

async fn check_status(operation: &'static str, response: Response) -> Result<Response, ControlError> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}

	let mut body = response.text().await.unwrap_or_default();
	if body.len() > MAX_ERROR_BODY {
		let mut cut = MAX_ERROR_BODY;
		while !body.is_char_boundary(cut) {
			cut -= 1;
		}
		body.truncate(cut);
	}
	Err(ControlError::Status {
		operation,
		status: status.as_u16(),
		body,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn client(base: &str) -> HttpControlClient {
		HttpControlClient::new(base.parse().unwrap(), Duration::from_secs(1)).unwrap()
	}

	#[test]
	fn api_paths_resolve_under_root() {
		let control = client("http://controller.example:8080");
		assert_eq!(
			control.endpoint("api/register").unwrap().as_str(),
			"http://controller.example:8080/api/register"
		);
	}

	#[test]
	fn api_paths_keep_a_path_prefix() {
		for base in ["http://controller.example/mesh", "http://controller.example/mesh/"] {
			let control = client(base);
			assert_eq!(control.base_url().as_str(), "http://controller.example/mesh/");
			assert_eq!(
				control.endpoint("api/peers").unwrap().as_str(),
				"http://controller.example/mesh/api/peers"
			);
		}
	}
}
