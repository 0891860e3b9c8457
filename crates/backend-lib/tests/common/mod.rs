//! Test utilities for the auth backend integration tests
//!
//! Builds an `AppState` over a flat-file store in a temporary directory and
//! the router on top of it, plus helpers for reading responses.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request},
    response::Response,
    Router,
};
use backend_lib::{config::Settings, router::create_router, AppState};
use cloudkit_common::{RegisterUser, User};
use std::sync::Arc;
use tempfile::TempDir;

pub const KNOWN_EMAIL: &str = "known@x.com";
pub const KNOWN_PASSWORD: &str = "rightpass";

/// Sets up a test environment with a temporary directory
///
/// # Returns
///
/// A tuple with:
/// - The router under test
/// - The shared state, for seeding and inspecting
/// - The temporary directory (keep this in scope to prevent cleanup during the test)
pub fn setup_test_env() -> (Router, Arc<AppState>, TempDir) {
    let temp_dir = TempDir::new().unwrap();

    let mut settings = Settings::default();
    settings.storage.path = temp_dir.path().to_path_buf();
    settings.password.scrypt_log_n = 8;

    let state = Arc::new(AppState::with_flat_file_storage(settings).expect("Failed to create AppState for test"));
    (create_router(state.clone()), state, temp_dir)
}

/// Register `known@x.com` / `rightpass` directly through the user service
pub async fn seed_known_user(state: &AppState) -> User {
    state
        .users
        .create_user(RegisterUser {
            email: KNOWN_EMAIL.to_string(),
            name: "Known".to_string(),
            password: KNOWN_PASSWORD.to_string(),
            confirm_password: KNOWN_PASSWORD.to_string(),
        })
        .await
        .unwrap()
}

pub fn json_request(method: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri("/api/v1/auth")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn form_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/auth")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub const MULTIPART_BOUNDARY: &str = "cloudkit-e2e-boundary";

/// `POST /api/v1/auth` with a `multipart/form-data` body, as a browser `FormData` submit sends
pub fn multipart_request(fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{MULTIPART_BOUNDARY}--\r\n"));

    Request::builder()
        .method("POST")
        .uri("/api/v1/auth")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn with_cookie(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

/// `name=value` of the first `Set-Cookie` header, if any
pub fn session_cookie(response: &Response) -> Option<String> {
    let value = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    value.split(';').next().map(str::to_string)
}

pub fn set_cookie_header(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
