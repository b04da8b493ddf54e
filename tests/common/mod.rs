//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use course_admin::database::{AppState, Store};
use course_admin::route::create_app;
use course_admin::upload::{LocalObjectStore, ObjectStore};

pub const PUBLIC_URL: &str = "http://localhost:8080/files";

/// Router plus direct handles on its store and temp directory
pub struct TestApp {
    pub router: Router,
    pub store: Store,
    pub dir: TempDir,
}

impl TestApp {
    pub fn uploads_root(&self) -> std::path::PathBuf {
        self.dir.path().join("uploads")
    }
}

/// Test application with a temporary database and local object storage
pub fn setup_test_app() -> TestApp {
    setup_test_app_with(|dir, _| {
        Arc::new(LocalObjectStore::new(dir.path().join("uploads"), PUBLIC_URL)) as Arc<dyn ObjectStore>
    })
}

/// Test application with a custom object storage backend
pub fn setup_test_app_with<F>(uploads: F) -> TestApp
where
    F: FnOnce(&TempDir, &Store) -> Arc<dyn ObjectStore>,
{
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.redb");
    let store = Store::open(db_path.to_str().unwrap()).expect("Failed to open test store");

    let state = AppState {
        store: store.clone(),
        uploads: uploads(&dir, &store),
        max_upload_bytes: 1024 * 1024,
    };

    TestApp {
        router: create_app(state),
        store,
        dir,
    }
}

/// Helper function to parse response body as JSON
pub async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

/// Sends one request and returns the status and the JSON body
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, response_json(response.into_body()).await)
}

pub async fn create_course(app: &Router, title: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/courses",
        Some(json!({
            "title": title,
            "description": "Learn basic phrases and vocabulary",
            "language": "Spanish",
            "dialect": "Latin American"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

pub async fn create_chapter(app: &Router, course_id: &str, name: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        &format!("/api/courses/{}/chapters", course_id),
        Some(json!({ "name": name, "content": format!("{} content", name) })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

/// Chapter ids of a course in the order the API lists them
pub async fn chapter_ids(app: &Router, course_id: &str) -> Vec<String> {
    let (status, body) = send(app, "GET", &format!("/api/courses/{}/chapters", course_id), None).await;
    assert_eq!(status, StatusCode::OK);
    body.as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_string())
        .collect()
}

/// Builds a multipart/form-data body with text fields and an optional file
pub fn multipart_body(
    boundary: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                boundary, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                boundary, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}

pub async fn send_multipart(app: &Router, uri: &str, boundary: &str, body: Vec<u8>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, response_json(response.into_body()).await)
}
