// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end tests of the control API through the axum router.

use std::sync::Arc;

use axum::{
	body::{to_bytes, Body},
	http::{header, Method, Request, StatusCode},
	Router,
};
use mesh_common::{Node, PeersResponse, RegisterResponse, WgPrivateKey, WgPublicKey};
use mesh_server::{create_router, AppState};
use mesh_server_registry::NodeRegistry;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(cidr: &str, start_offset: u32) -> Router {
	let registry = NodeRegistry::new(cidr.parse().unwrap(), start_offset).unwrap();
	create_router(AppState::new(Arc::new(registry)))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
	let builder = Request::builder().method(method).uri(uri);
	let request = match body {
		Some(value) => builder
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(value.to_string()))
			.unwrap(),
		None => builder.body(Body::empty()).unwrap(),
	};

	let response = app.clone().oneshot(request).await.unwrap();
	let status = response.status();
	let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
	(status, bytes.to_vec())
}

async fn register(app: &Router, hostname: &str, endpoints: &[&str]) -> RegisterResponse {
	let (status, body) = send(
		app,
		Method::POST,
		"/api/register",
		Some(json!({
			"hostname": hostname,
			"os": "linux",
			"version": "0.1.0",
			"endpoints": endpoints,
			"listenPort": 51820
		})),
	)
	.await;
	assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));
	serde_json::from_slice(&body).unwrap()
}

async fn peers(app: &Router, node_id: &str) -> Vec<Node> {
	let (status, body) = send(app, Method::GET, &format!("/api/peers?nodeId={node_id}"), None).await;
	assert_eq!(status, StatusCode::OK);
	serde_json::from_slice::<PeersResponse>(&body).unwrap().peers
}

#[tokio::test]
async fn two_nodes_discover_each_other() {
	let app = app("100.64.0.0/24", 10);

	let a = register(&app, "alpha", &[]).await;
	assert_eq!(a.node.tunnel_ip, "100.64.0.10");
	assert_eq!(a.network_cidr, "100.64.0.0/24");
	assert!(a.peers.is_empty());

	let b = register(&app, "bravo", &["198.51.100.20:51820"]).await;
	assert_eq!(b.node.tunnel_ip, "100.64.0.11");
	assert_eq!(b.peers.len(), 1);
	assert_eq!(b.peers[0].id, a.node.id);

	let a_peers = peers(&app, &a.node.id).await;
	assert_eq!(a_peers.len(), 1);
	assert_eq!(a_peers[0].id, b.node.id);
	assert_eq!(a_peers[0].endpoint.as_deref(), Some("198.51.100.20:51820"));

	let (status, _) = send(
		&app,
		Method::POST,
		"/api/announce",
		Some(json!({
			"nodeId": a.node.id,
			"endpoints": ["203.0.113.5:51820"],
			"listenPort": 51820
		})),
	)
	.await;
	assert_eq!(status, StatusCode::NO_CONTENT);

	let b_peers = peers(&app, &b.node.id).await;
	assert_eq!(b_peers.len(), 1);
	assert_eq!(b_peers[0].id, a.node.id);
	assert_eq!(b_peers[0].endpoint.as_deref(), Some("203.0.113.5:51820"));
}

#[tokio::test]
async fn returned_private_key_matches_published_public_key() {
	let app = app("100.64.0.0/24", 10);
	let a = register(&app, "alpha", &[]).await;

	let private = WgPrivateKey::from_base64(a.priv_key.expose()).unwrap();
	let public = WgPublicKey::from_base64(&a.node.public_key).unwrap();
	assert_eq!(private.public_key(), public);
}

#[tokio::test]
async fn peers_without_node_id_lists_everyone_in_address_order() {
	let app = app("100.64.0.0/24", 10);
	for name in ["a", "b", "c"] {
		register(&app, name, &[]).await;
	}

	let (status, body) = send(&app, Method::GET, "/api/peers", None).await;
	assert_eq!(status, StatusCode::OK);
	let all = serde_json::from_slice::<PeersResponse>(&body).unwrap().peers;
	let ips: Vec<_> = all.iter().map(|n| n.tunnel_ip.as_str()).collect();
	assert_eq!(ips, vec!["100.64.0.10", "100.64.0.11", "100.64.0.12"]);
}

#[tokio::test]
async fn exhausted_block_returns_503() {
	let app = app("10.0.0.0/29", 6);
	register(&app, "a", &[]).await;
	register(&app, "b", &[]).await;

	let (status, body) = send(
		&app,
		Method::POST,
		"/api/register",
		Some(json!({ "hostname": "c", "os": "linux", "version": "0.1.0", "endpoints": [] })),
	)
	.await;
	assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
	let error: Value = serde_json::from_slice(&body).unwrap();
	assert_eq!(error["error"], "address_exhausted");

	let (_, body) = send(&app, Method::GET, "/health", None).await;
	let health: Value = serde_json::from_slice(&body).unwrap();
	assert_eq!(health["nodes"], 2);
	assert_eq!(health["addressesIssued"], 2);
	assert_eq!(health["addressCapacity"], 2);
}

#[tokio::test]
async fn malformed_register_bodies_are_400() {
	let app = app("100.64.0.0/24", 10);

	for body in [
		json!({ "hostname": "" }),
		json!({ "hostname": 42 }),
		json!({ "os": "linux" }),
		json!({ "hostname": "x", "endpoints": "not-a-list" }),
	] {
		let (status, response) = send(&app, Method::POST, "/api/register", Some(body.clone())).await;
		assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
		let error: Value = serde_json::from_slice(&response).unwrap();
		assert_eq!(error["error"], "bad_request");
	}

	let request = Request::builder()
		.method(Method::POST)
		.uri("/api/register")
		.header(header::CONTENT_TYPE, "application/json")
		.body(Body::from("{not json"))
		.unwrap();
	let response = app.clone().oneshot(request).await.unwrap();
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let (_, body) = send(&app, Method::GET, "/health", None).await;
	let health: Value = serde_json::from_slice(&body).unwrap();
	assert_eq!(health["nodes"], 0);
}

#[tokio::test]
async fn announce_for_unknown_node_is_404() {
	let app = app("100.64.0.0/24", 10);
	let (status, body) = send(
		&app,
		Method::POST,
		"/api/announce",
		Some(json!({ "nodeId": "nobody", "endpoints": ["203.0.113.5:51820"], "listenPort": 51820 })),
	)
	.await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	let error: Value = serde_json::from_slice(&body).unwrap();
	assert_eq!(error["error"], "not_found");
}

#[tokio::test]
async fn announce_with_only_invalid_candidates_clears_endpoint() {
	let app = app("100.64.0.0/24", 10);
	let a = register(&app, "alpha", &["203.0.113.5:51820"]).await;
	let b = register(&app, "bravo", &[]).await;

	let (status, _) = send(
		&app,
		Method::POST,
		"/api/announce",
		Some(json!({ "nodeId": a.node.id, "endpoints": ["garbage"], "listenPort": 51820 })),
	)
	.await;
	assert_eq!(status, StatusCode::NO_CONTENT);

	let b_peers = peers(&app, &b.node.id).await;
	assert!(b_peers[0].endpoint.is_none());
	assert_eq!(b_peers[0].endpoints, vec!["garbage".to_string()]);
}

#[tokio::test]
async fn openapi_document_is_served() {
	let app = app("100.64.0.0/24", 10);
	let (status, body) = send(&app, Method::GET, "/api/openapi.json", None).await;
	assert_eq!(status, StatusCode::OK);
	let doc: Value = serde_json::from_slice(&body).unwrap();
	assert!(doc["paths"]["/api/register"].is_object());
}
