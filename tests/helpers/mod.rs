//! Test helper utilities for driving the router in-process
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use sewer_batch_import::{
    app_state::AppState,
    models::notification::Notifier,
    models::permission::{AccessLevel, TransactionGrant},
    routes,
    services::{
        backend::BackendClient,
        permissions::{JwtAuthenticator, UserClaims},
        table_state::MemoryTableStateStore,
        validation::MAX_BATCH_BYTES,
        workflow::NavigationPolicy,
    },
};

pub const JWT_SECRET: &str = "test-secret";
pub const USER: &str = "u123";

const BOUNDARY: &str = "sewer-batch-boundary";

pub fn test_state(backend_uri: &str) -> AppState {
    test_state_with(backend_uri, MAX_BATCH_BYTES, NavigationPolicy::Free)
}

pub fn test_state_with(backend_uri: &str, max_batch_bytes: u64, policy: NavigationPolicy) -> AppState {
    let backend = BackendClient::new(backend_uri, None, Duration::from_secs(5))
        .expect("Failed to build backend client");
    AppState::new(
        backend,
        Arc::new(MemoryTableStateStore::new()),
        Arc::new(JwtAuthenticator::new(JWT_SECRET)),
        Notifier::new(5000),
        max_batch_bytes,
        policy,
        Duration::from_secs(1800),
    )
}

pub fn test_app(state: AppState) -> Router {
    routes::router(state)
}

/// Signed token for `user` with the given grants.
pub fn token_with(user: &str, grants: Vec<TransactionGrant>) -> String {
    let claims = UserClaims {
        sub: user.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as u64,
        transactions: grants,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign token")
}

/// Token with no grants: every screen keeps its writable defaults.
pub fn token() -> String {
    token_with(USER, vec![])
}

pub fn read_only(transaction: &str) -> TransactionGrant {
    TransactionGrant {
        transaction: transaction.to_string(),
        level: AccessLevel::Read,
        components: vec![],
        rules: vec![],
    }
}

pub fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_post(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

/// Multipart upload with one `files` part per entry.
pub fn multipart_upload(uri: &str, token: &str, files: &[(&str, Vec<u8>)]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, bytes) in files {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("Response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("Response body is not UTF-8")
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.expect("Router failed");
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body")
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}
