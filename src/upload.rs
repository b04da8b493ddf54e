//! Object storage for chapter audio files
//!
//! The storage service is an external collaborator with a narrow contract:
//! it takes bytes and a relative path and answers with a public URL, or fails.
//! Two backends are provided. [`HttpObjectStore`] talks to an S3/R2-style
//! endpoint over plain `PUT`/`DELETE`; [`LocalObjectStore`] writes files under
//! a directory and is used for development and tests.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("object storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("object storage rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid object path: {0:?}")]
    InvalidPath(String),

    #[error("invalid storage token")]
    InvalidToken,
}

/// Destination for uploaded assets
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` at `path` and returns the public URL of the object
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, UploadError>;

    /// Deletes the object at `path`
    async fn remove(&self, path: &str) -> Result<(), UploadError>;
}

/// Rejects empty paths, absolute paths and any `..` segment
pub fn validate_object_path(path: &str) -> Result<(), UploadError> {
    let invalid = || UploadError::InvalidPath(path.to_string());
    if path.is_empty() || path.starts_with('/') {
        return Err(invalid());
    }
    let all_normal = Path::new(path)
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !all_normal {
        return Err(invalid());
    }
    Ok(())
}

/// Builds the storage path for a chapter audio file
///
/// Format: `courses/{course_id}/chapters/{millis}_{file_name}`. Path
/// separators and other unsafe characters in the file name become `_`.
pub fn chapter_audio_path(course_id: &str, file_name: &str, millis: i64) -> String {
    let safe_name: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe_name = safe_name.trim_start_matches('.');
    let safe_name = if safe_name.is_empty() { "audio" } else { safe_name };
    format!("courses/{}/chapters/{}_{}", course_id, millis, safe_name)
}

fn public_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Object storage reached over HTTP
///
/// Objects are written with `PUT {endpoint}/{path}` and removed with
/// `DELETE {endpoint}/{path}`. The optional token is sent as a bearer token.
#[derive(Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
    public_base_url: String,
}

impl HttpObjectStore {
    pub fn new(
        endpoint: impl Into<String>,
        public_base_url: impl Into<String>,
        token: Option<&str>,
    ) -> Result<Self, UploadError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| UploadError::InvalidToken)?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            public_base_url: public_base_url.into(),
        })
    }

    fn object_url(&self, path: &str) -> String {
        public_url(&self.endpoint, path)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, UploadError> {
        validate_object_path(path)?;

        let response = self
            .client
            .put(self.object_url(path))
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(path, "object uploaded");
        Ok(public_url(&self.public_base_url, path))
    }

    async fn remove(&self, path: &str) -> Result<(), UploadError> {
        validate_object_path(path)?;

        let response = self.client.delete(self.object_url(path)).send().await?;
        let status = response.status();
        // A missing object is already in the desired state
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Object storage backed by a local directory
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, UploadError> {
        validate_object_path(path)?;

        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        Ok(public_url(&self.public_base_url, path))
    }

    async fn remove(&self, path: &str) -> Result<(), UploadError> {
        validate_object_path(path)?;

        match tokio::fs::remove_file(self.root.join(path)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn audio_path_sanitizes_file_name() {
        assert_eq!(
            chapter_audio_path("c1", "../hola mundo.mp3", 1700000000000),
            "courses/c1/chapters/1700000000000__hola_mundo.mp3"
        );
        assert_eq!(
            chapter_audio_path("c1", "", 5),
            "courses/c1/chapters/5_audio"
        );
    }

    #[test]
    fn rejects_escaping_paths() {
        assert!(validate_object_path("courses/c1/a.mp3").is_ok());
        assert!(validate_object_path("../etc/passwd").is_err());
        assert!(validate_object_path("/abs/path").is_err());
        assert!(validate_object_path("").is_err());
    }

    #[tokio::test]
    async fn local_store_writes_and_removes() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://localhost:8080/files/");

        let url = store
            .put("courses/c1/chapters/1_a.mp3", b"ID3".to_vec(), "audio/mpeg")
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:8080/files/courses/c1/chapters/1_a.mp3");

        let on_disk = dir.path().join("courses/c1/chapters/1_a.mp3");
        assert_eq!(std::fs::read(&on_disk).unwrap(), b"ID3");

        store.remove("courses/c1/chapters/1_a.mp3").await.unwrap();
        assert!(!on_disk.exists());
        // Removing twice is not an error
        store.remove("courses/c1/chapters/1_a.mp3").await.unwrap();
    }
}
