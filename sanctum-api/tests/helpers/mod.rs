//! Test Helper Utilities
//!
//! Shared utilities for testing sanctum-api: a router over a throwaway
//! SQLite file and filesystem blob root, plus request shortcuts.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use sanctum_api::blob::FilesystemBlobStore;
use sanctum_api::{build_router, AppState};
use sanctum_common::auth::{HashCost, PasswordService, TokenService};
use sanctum_common::config::RunMode;
use sanctum_common::db::init_database;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const TEST_SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";
pub const BLOB_BASE_URL: &str = "http://127.0.0.1:5780/blob/files";
/// Track URLs outside the blob store are stored as opaque locations
pub const EXTERNAL_MEDIA_URL: &str = "https://media.example.com/audio";

/// Router plus the handles tests poke at directly
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub state: AppState,
    /// Keeps the database file and blob root alive
    pub dir: TempDir,
}

impl TestApp {
    pub fn blob_root(&self) -> std::path::PathBuf {
        self.dir.path().join("blobs")
    }
}

pub async fn create_test_state(mode: RunMode) -> (AppState, SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_url = format!("sqlite://{}", dir.path().join("sanctum-test.db").display());
    let pool = init_database(&db_url, 4)
        .await
        .expect("Failed to initialize test database");

    let blob_root = dir.path().join("blobs");
    let blobs = FilesystemBlobStore::new(&blob_root, BLOB_BASE_URL)
        .await
        .expect("Failed to create blob store");

    let state = AppState::new(
        pool.clone(),
        TokenService::new(TEST_SECRET),
        PasswordService::new(HashCost::minimal()).expect("Failed to build password service"),
        Arc::new(blobs),
        mode,
    )
    .with_blob_files_root(blob_root);

    (state, pool, dir)
}

pub async fn create_test_app_with_mode(mode: RunMode) -> TestApp {
    let (state, pool, dir) = create_test_state(mode).await;
    TestApp {
        router: build_router(state.clone()),
        pool,
        state,
        dir,
    }
}

/// Development-mode app over a fresh database
pub async fn create_test_app() -> TestApp {
    create_test_app_with_mode(RunMode::Development).await
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send a request and decode the JSON body (Null when the body is not JSON)
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Register a user and return (token, user id)
pub async fn register(router: &Router, username: &str, password: &str) -> (String, String) {
    let (status, body) = send(
        router,
        json_request(
            Method::POST,
            "/auth?action=register",
            None,
            Some(json!({ "username": username, "password": password })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);

    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

pub fn track_body(name: &str, track_type: &str, file_size: i64, mime_type: &str) -> Value {
    json!({
        "name": name,
        "filename": format!("{}.mp3", name.to_lowercase().replace(' ', "-")),
        "url": format!("{}/{}.mp3", EXTERNAL_MEDIA_URL, name.to_lowercase().replace(' ', "-")),
        "type": track_type,
        "fileSize": file_size,
        "mimeType": mime_type,
    })
}

/// Create a track through the API and return its JSON
pub async fn create_track(router: &Router, token: &str, name: &str, track_type: &str) -> Value {
    let (status, body) = send(
        router,
        json_request(
            Method::POST,
            "/tracks",
            Some(token),
            Some(track_body(name, track_type, 1024, "audio/mpeg")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "track creation failed: {}", body);
    body["track"].clone()
}

/// Build a multipart body with a `file` part and optional `type` part
pub fn multipart_request(
    token: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
    track_type: Option<&str>,
) -> Request<Body> {
    let boundary = "sanctum-test-boundary";
    let mut body = Vec::with_capacity(data.len() + 512);

    if let Some(track_type) = track_type {
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"type\"\r\n\r\n{t}\r\n",
                b = boundary,
                t = track_type
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: {c}\r\n\r\n",
            b = boundary,
            f = filename,
            c = content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/blob/direct-upload")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}
