//! Typed HTTP client for the course administration API
//!
//! Used by the dashboard views. Every method is a single round trip with no
//! retries; a non-2xx answer becomes [`ClientError::Api`] carrying the
//! server's `error` message.

use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::model::{
    Admin, AdminResponse, Chapter, Course, CreateAdminRequest, CreateChapterRequest,
    CreateCourseRequest, SweepReport,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(err) => err.status().map(|s| s.as_u16()),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Audio attached to a new chapter
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:8080`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send(request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Unexpected response")
                .to_string(),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        Ok(Self::send(request).await?.json().await?)
    }

    // --------------------------------------------------------------- courses

    pub async fn list_courses(&self) -> Result<Vec<Course>, ClientError> {
        Self::fetch(self.http.get(self.url("/courses"))).await
    }

    pub async fn get_course(&self, id: &str) -> Result<Course, ClientError> {
        Self::fetch(self.http.get(self.url(&format!("/courses/{}", id)))).await
    }

    pub async fn create_course(&self, course: &CreateCourseRequest) -> Result<Course, ClientError> {
        Self::fetch(self.http.post(self.url("/courses")).json(course)).await
    }

    pub async fn delete_course(&self, id: &str) -> Result<(), ClientError> {
        Self::send(self.http.delete(self.url(&format!("/courses/{}", id)))).await?;
        Ok(())
    }

    // -------------------------------------------------------------- chapters

    pub async fn list_chapters(&self, course_id: &str) -> Result<Vec<Chapter>, ClientError> {
        Self::fetch(self.http.get(self.url(&format!("/courses/{}/chapters", course_id)))).await
    }

    pub async fn create_chapter(
        &self,
        course_id: &str,
        chapter: &CreateChapterRequest,
    ) -> Result<Chapter, ClientError> {
        let url = self.url(&format!("/courses/{}/chapters", course_id));
        Self::fetch(self.http.post(url).json(chapter)).await
    }

    /// Sends the chapter fields and the audio file as one multipart request
    pub async fn create_chapter_with_audio(
        &self,
        course_id: &str,
        chapter: &CreateChapterRequest,
        audio: AudioFile,
    ) -> Result<Chapter, ClientError> {
        let part = Part::bytes(audio.bytes)
            .file_name(audio.file_name)
            .mime_str(&audio.content_type)?;
        let form = Form::new()
            .text("name", chapter.name.clone())
            .text("description", chapter.description.clone())
            .text("content", chapter.content.clone())
            .part("audio", part);

        let url = self.url(&format!("/courses/{}/chapters/upload", course_id));
        Self::fetch(self.http.post(url).multipart(form)).await
    }

    pub async fn delete_chapter(&self, id: &str) -> Result<(), ClientError> {
        Self::send(self.http.delete(self.url(&format!("/chapters/{}", id)))).await?;
        Ok(())
    }

    pub async fn reorder_chapters(
        &self,
        course_id: &str,
        chapter_ids: &[String],
    ) -> Result<Vec<Chapter>, ClientError> {
        let url = self.url(&format!("/courses/{}/chapters/order", course_id));
        Self::fetch(self.http.put(url).json(&json!({ "chapterIds": chapter_ids }))).await
    }

    // ---------------------------------------------------------------- admins

    pub async fn list_admins(&self) -> Result<Vec<Admin>, ClientError> {
        Self::fetch(self.http.get(self.url("/admins"))).await
    }

    pub async fn create_admin(
        &self,
        admin: &CreateAdminRequest,
    ) -> Result<AdminResponse, ClientError> {
        Self::fetch(self.http.post(self.url("/admins")).json(admin)).await
    }

    // ----------------------------------------------------------- maintenance

    pub async fn sweep_orphans(&self) -> Result<SweepReport, ClientError> {
        Self::fetch(self.http.post(self.url("/maintenance/sweep"))).await
    }
}
