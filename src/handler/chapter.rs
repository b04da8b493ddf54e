//! Chapter handlers
//!
//! Chapters live inside a course and carry a 1-based `order`. New chapters
//! are appended, deletes close the gap, and reorder rewrites every position
//! from an explicit list of ids.

use axum::{
    extract::rejection::JsonRejection,
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::{AppState, ReorderOutcome};
use crate::error::{ApiError, ApiResult, StoreResultExt};
use crate::model::{
    Chapter, ChapterStatus, CreateChapterRequest, ReorderRequest, UpdateChapterRequest, Validate,
};
use crate::upload::chapter_audio_path;

const COURSE_NOT_FOUND: &str = "Course not found";
const CHAPTER_NOT_FOUND: &str = "Chapter not found";

fn new_chapter(course_id: String, request: CreateChapterRequest) -> Chapter {
    Chapter {
        id: Uuid::new_v4().to_string(),
        course_id,
        name: request.name,
        description: request.description,
        content: request.content,
        audio_file: request.audio_file,
        // assigned by the store
        order: 0,
        status: ChapterStatus::Pending,
    }
}

/// Lists the chapters of a course ordered by `order`
///
/// # Response
///
/// - **200 OK** - Array of chapters
/// - **404 Not Found** - The course does not exist
pub async fn list_chapters(
    Path(course_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Chapter>>> {
    state
        .store
        .list_chapters(&course_id)
        .or_fail("Failed to fetch chapters")?
        .map(Json)
        .ok_or(ApiError::NotFound(COURSE_NOT_FOUND))
}

pub async fn get_chapter(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Chapter>> {
    state
        .store
        .get_chapter(&id)
        .or_fail("Failed to fetch chapter")?
        .map(Json)
        .ok_or(ApiError::NotFound(CHAPTER_NOT_FOUND))
}

/// Appends a chapter to a course
///
/// # Request Body
///
/// ```json
/// { "name": "Greetings", "description": "", "content": "...", "audioFile": null }
/// ```
///
/// # Response
///
/// - **201 Created** - Stored chapter with `order = count + 1` and status `Pending`
/// - **400 Bad Request** - Missing name or non-http audio URL
/// - **404 Not Found** - The course does not exist
pub async fn create_chapter(
    Path(course_id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<CreateChapterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Chapter>)> {
    let Json(payload) = payload?;
    payload.validate()?;

    let chapter = state
        .store
        .insert_chapter(new_chapter(course_id, payload))
        .or_fail("Failed to create chapter")?
        .ok_or(ApiError::NotFound(COURSE_NOT_FOUND))?;

    tracing::info!(
        chapter_id = %chapter.id,
        course_id = %chapter.course_id,
        order = chapter.order,
        "chapter created"
    );
    Ok((StatusCode::CREATED, Json(chapter)))
}

/// Uploads an audio file and creates a chapter pointing at it
///
/// Multipart fields: `name`, `description`, `content` and the file field
/// `audio`. The object is stored under
/// `courses/{course_id}/chapters/{millis}_{file_name}`. If the chapter cannot
/// be created afterwards, the uploaded object is deleted again.
///
/// # Response
///
/// - **201 Created** - Stored chapter with `audioFile` set
/// - **400 Bad Request** - Malformed multipart body or missing name
/// - **404 Not Found** - The course does not exist
/// - **502 Bad Gateway** - Object storage rejected the upload
pub async fn create_chapter_with_audio(
    Path(course_id): Path<String>,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Chapter>)> {
    let mut request = CreateChapterRequest::default();
    let mut audio: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "name" => request.name = field.text().await?,
            "description" => request.description = field.text().await?,
            "content" => request.content = field.text().await?,
            "audio" => {
                let file_name = field.file_name().unwrap_or("audio").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    audio = Some((file_name, content_type, bytes.to_vec()));
                }
            }
            other => tracing::debug!(field = other, "ignoring unknown multipart field"),
        }
    }
    request.validate()?;

    // Fail before touching object storage when the course is already gone
    if state
        .store
        .get_course(&course_id)
        .or_fail("Failed to create chapter")?
        .is_none()
    {
        return Err(ApiError::NotFound(COURSE_NOT_FOUND));
    }

    let uploaded_path = match audio {
        Some((file_name, content_type, bytes)) => {
            let path = chapter_audio_path(&course_id, &file_name, Utc::now().timestamp_millis());
            let url = state
                .uploads
                .put(&path, bytes, &content_type)
                .await
                .map_err(|err| ApiError::upload("Failed to upload audio file", err))?;
            request.audio_file = Some(url);
            Some(path)
        }
        None => None,
    };

    let created = state
        .store
        .insert_chapter(new_chapter(course_id, request))
        .or_fail("Failed to create chapter")
        .and_then(|chapter| chapter.ok_or(ApiError::NotFound(COURSE_NOT_FOUND)));

    match created {
        Ok(chapter) => {
            tracing::info!(
                chapter_id = %chapter.id,
                course_id = %chapter.course_id,
                audio = chapter.audio_file.is_some(),
                "chapter created with upload"
            );
            Ok((StatusCode::CREATED, Json(chapter)))
        }
        Err(err) => {
            if let Some(path) = uploaded_path {
                match state.uploads.remove(&path).await {
                    Ok(()) => tracing::warn!(path = %path, "removed upload of failed chapter create"),
                    Err(cleanup) => tracing::error!(
                        path = %path,
                        error = %cleanup,
                        "could not remove upload of failed chapter create"
                    ),
                }
            }
            Err(err)
        }
    }
}

pub async fn update_chapter(
    Path(id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<UpdateChapterRequest>, JsonRejection>,
) -> ApiResult<Json<Chapter>> {
    let Json(payload) = payload?;
    payload.validate()?;

    state
        .store
        .update_chapter(&id, payload)
        .or_fail("Failed to update chapter")?
        .map(Json)
        .ok_or(ApiError::NotFound(CHAPTER_NOT_FOUND))
}

/// Deletes one chapter; the remaining chapters of its course are renumbered
pub async fn delete_chapter(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let chapter = state
        .store
        .delete_chapter(&id)
        .or_fail("Failed to delete chapter")?
        .ok_or(ApiError::NotFound(CHAPTER_NOT_FOUND))?;

    tracing::info!(chapter_id = %chapter.id, course_id = %chapter.course_id, "chapter deleted");

    Ok(Json(json!({
        "message": "Chapter deleted successfully",
        "deletedId": chapter.id
    })))
}

/// Rewrites chapter positions from an explicit list of ids
///
/// # Request Body
///
/// ```json
/// { "chapterIds": ["c2", "c1", "c3"] }
/// ```
///
/// # Response
///
/// - **200 OK** - Chapters in their new order
/// - **400 Bad Request** - The ids are not exactly the course's chapters
/// - **404 Not Found** - The course does not exist
pub async fn reorder_chapters(
    Path(course_id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<ReorderRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<Chapter>>> {
    let Json(payload) = payload?;
    payload.validate()?;

    match state
        .store
        .reorder_chapters(&course_id, &payload.chapter_ids)
        .or_fail("Failed to reorder chapters")?
    {
        ReorderOutcome::Applied(chapters) => {
            tracing::info!(course_id = %course_id, count = chapters.len(), "chapters reordered");
            Ok(Json(chapters))
        }
        ReorderOutcome::CourseNotFound => Err(ApiError::NotFound(COURSE_NOT_FOUND)),
        ReorderOutcome::Mismatch { expected, received } => Err(ApiError::Validation(format!(
            "chapterIds must list each of the course's {} chapters exactly once (got {} ids)",
            expected, received
        ))),
    }
}
