//! Data models for the course administration backend
//!
//! This module defines the stored documents (admins, courses, chapters), the
//! request payloads accepted at the HTTP boundary and their validation rules.
//! JSON field names are camelCase to match what the dashboard sends.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Administrator account as stored in the `admins` table
///
/// The password is kept exactly as submitted. Nothing hashes it yet, so the
/// create handler strips it from its response through [`AdminResponse`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    /// Calendar date of creation, serialized as `YYYY-MM-DD`
    pub created_at: NaiveDate,
}

/// Admin record with the password removed
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: NaiveDate,
}

impl From<Admin> for AdminResponse {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.id,
            name: admin.name,
            email: admin.email,
            role: admin.role,
            created_at: admin.created_at,
        }
    }
}

/// Publication state of a course
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CourseStatus {
    Published,
    #[default]
    Draft,
    Archived,
}

/// A language course as stored in the `courses` table
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub language: String,
    pub dialect: String,
    pub status: CourseStatus,

    /// Number of chapters currently attached to this course.
    /// Maintained by the store in the same transaction as chapter writes.
    #[serde(default)]
    pub chapters_count: u32,

    pub created_at: DateTime<Utc>,
}

/// Progress state of a chapter
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChapterStatus {
    Complete,
    #[serde(rename = "In Progress")]
    InProgress,
    #[default]
    Pending,
}

/// One ordered unit of content inside a course
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub course_id: String,
    pub name: String,
    pub description: String,
    pub content: String,

    /// Public URL of the uploaded audio asset, if any
    pub audio_file: Option<String>,

    /// 1-based position inside the course
    pub order: u32,
    pub status: ChapterStatus,
}

/// Rejected request payload
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{field} {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: &'static str,
}

impl ValidationError {
    fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

/// Boundary check run by handlers before anything reaches the store
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

fn required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}

fn optional_non_blank(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(v) => required(field, v),
        None => Ok(()),
    }
}

/// Keeps an explicit `null` apart from an absent field
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn audio_url(value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => Err(
            ValidationError::new("audioFile", "must be an http(s) URL"),
        ),
        _ => Ok(()),
    }
}

/// Request payload for creating an admin account
///
/// # Example
/// ```json
/// { "name": "A", "email": "a@x.com", "password": "p", "role": "editor" }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateAdminRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

impl Validate for CreateAdminRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        required("name", &self.name)?;
        required("email", &self.email)?;
        match self.email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err(ValidationError::new("email", "must be an email address")),
        }
        required("password", &self.password)?;
        required("role", &self.role)
    }
}

/// Request payload for creating a course
///
/// `description` and `dialect` may be omitted; `status` defaults to `Draft`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub language: String,
    #[serde(default)]
    pub dialect: String,
    #[serde(default)]
    pub status: Option<CourseStatus>,
}

impl Validate for CreateCourseRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        required("title", &self.title)?;
        required("language", &self.language)
    }
}

/// Partial update of a course; absent fields are left untouched
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CourseStatus>,
}

impl Validate for UpdateCourseRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        optional_non_blank("title", self.title.as_deref())?;
        optional_non_blank("language", self.language.as_deref())
    }
}

impl UpdateCourseRequest {
    pub fn apply(self, course: &mut Course) {
        if let Some(title) = self.title {
            course.title = title;
        }
        if let Some(description) = self.description {
            course.description = description;
        }
        if let Some(language) = self.language {
            course.language = language;
        }
        if let Some(dialect) = self.dialect {
            course.dialect = dialect;
        }
        if let Some(status) = self.status {
            course.status = status;
        }
    }
}

/// Request payload for creating a chapter inside a course
///
/// # Example
/// ```json
/// {
///   "name": "Greetings",
///   "description": "Hola and friends",
///   "content": "...",
///   "audioFile": "https://cdn.example.com/courses/c1/chapters/1700000000000_hola.mp3"
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateChapterRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub audio_file: Option<String>,
}

impl Validate for CreateChapterRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        required("name", &self.name)?;
        audio_url(self.audio_file.as_deref())
    }
}

/// Partial update of a chapter; `order` only changes through reorder
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChapterRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Absent leaves the audio alone, `null` detaches it
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ChapterStatus>,
}

impl Validate for UpdateChapterRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        optional_non_blank("name", self.name.as_deref())?;
        audio_url(self.audio_file.as_ref().and_then(|url| url.as_deref()))
    }
}

impl UpdateChapterRequest {
    pub fn apply(self, chapter: &mut Chapter) {
        if let Some(name) = self.name {
            chapter.name = name;
        }
        if let Some(description) = self.description {
            chapter.description = description;
        }
        if let Some(content) = self.content {
            chapter.content = content;
        }
        if let Some(audio_file) = self.audio_file {
            chapter.audio_file = audio_file;
        }
        if let Some(status) = self.status {
            chapter.status = status;
        }
    }
}

/// Full desired ordering of a course's chapters
///
/// # Example
/// ```json
/// { "chapterIds": ["c2", "c1", "c3"] }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub chapter_ids: Vec<String>,
}

impl Validate for ReorderRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.chapter_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(ValidationError::new("chapterIds", "must not contain empty ids"));
        }
        Ok(())
    }
}

/// Result of an orphan sweep
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Chapters removed because their course no longer exists
    pub orphan_chapters: usize,
    /// Index entries removed because their chapter document is gone
    pub dangling_index_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_requires_an_email_address() {
        let req = CreateAdminRequest {
            name: "A".into(),
            email: "not-an-email".into(),
            password: "p".into(),
            role: "editor".into(),
        };
        assert_eq!(
            req.validate(),
            Err(ValidationError::new("email", "must be an email address"))
        );
    }

    #[test]
    fn chapter_audio_must_be_http_url() {
        let req = CreateChapterRequest {
            name: "Greetings".into(),
            audio_file: Some("file:///etc/passwd".into()),
            ..Default::default()
        };
        assert_eq!(req.validate().unwrap_err().field, "audioFile");

        let req = CreateChapterRequest {
            name: "Greetings".into(),
            audio_file: Some("https://cdn.example.com/a.mp3".into()),
            ..Default::default()
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn chapter_update_tells_null_audio_from_absent() {
        let absent: UpdateChapterRequest = serde_json::from_str(r#"{"name":"B"}"#).unwrap();
        let cleared: UpdateChapterRequest = serde_json::from_str(r#"{"audioFile":null}"#).unwrap();
        assert_eq!(absent.audio_file, None);
        assert_eq!(cleared.audio_file, Some(None));

        let mut chapter = Chapter {
            id: "ch1".into(),
            course_id: "c1".into(),
            name: "A".into(),
            description: String::new(),
            content: String::new(),
            audio_file: Some("https://cdn.example.com/a.mp3".into()),
            order: 1,
            status: ChapterStatus::Pending,
        };
        absent.apply(&mut chapter);
        assert!(chapter.audio_file.is_some());
        cleared.apply(&mut chapter);
        assert_eq!(chapter.audio_file, None);
    }

    #[test]
    fn course_update_rejects_blank_title() {
        let req = UpdateCourseRequest {
            title: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(req.validate().unwrap_err().field, "title");
    }

    #[test]
    fn chapter_status_uses_display_names() {
        let json = serde_json::to_string(&ChapterStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let status: ChapterStatus = serde_json::from_str("\"Complete\"").unwrap();
        assert_eq!(status, ChapterStatus::Complete);
    }

    #[test]
    fn admin_response_drops_password() {
        let admin = Admin {
            id: "1".into(),
            name: "A".into(),
            email: "a@x.com".into(),
            password: "secret".into(),
            role: "editor".into(),
            created_at: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        };
        let value = serde_json::to_value(AdminResponse::from(admin)).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["createdAt"], "2024-03-01");
    }
}
