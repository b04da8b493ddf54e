//! Course handlers
//!
//! Deleting a course cascades to its chapters inside one store transaction.

use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::AppState;
use crate::error::{ApiError, ApiResult, StoreResultExt};
use crate::model::{Course, CreateCourseRequest, UpdateCourseRequest, Validate};

const COURSE_NOT_FOUND: &str = "Course not found";

/// Lists every course, unfiltered and unpaginated
pub async fn list_courses(State(state): State<AppState>) -> ApiResult<Json<Vec<Course>>> {
    let courses = state.store.list_courses().or_fail("Failed to fetch courses")?;
    Ok(Json(courses))
}

/// Returns one course exactly as stored
///
/// # Response
///
/// - **200 OK** - The course document
/// - **404 Not Found** - `{"error": "Course not found"}`
pub async fn get_course(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Course>> {
    state
        .store
        .get_course(&id)
        .or_fail("Failed to fetch course")?
        .map(Json)
        .ok_or(ApiError::NotFound(COURSE_NOT_FOUND))
}

/// Creates a course
///
/// # Request Body
///
/// ```json
/// {
///   "title": "Spanish for Beginners",
///   "description": "Learn basic Spanish phrases and vocabulary",
///   "language": "Spanish",
///   "dialect": "Latin American"
/// }
/// ```
///
/// # Response
///
/// - **201 Created** - Stored course with fresh `id`, `createdAt` and `chaptersCount: 0`
/// - **400 Bad Request** - Missing title or language
pub async fn create_course(
    State(state): State<AppState>,
    payload: Result<Json<CreateCourseRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Course>)> {
    let Json(payload) = payload?;
    payload.validate()?;

    let course = Course {
        id: Uuid::new_v4().to_string(),
        title: payload.title,
        description: payload.description,
        language: payload.language,
        dialect: payload.dialect,
        status: payload.status.unwrap_or_default(),
        chapters_count: 0,
        created_at: Utc::now(),
    };

    state.store.insert_course(&course).or_fail("Failed to create course")?;
    tracing::info!(course_id = %course.id, title = %course.title, "course created");

    Ok((StatusCode::CREATED, Json(course)))
}

/// Applies a partial update to a course
pub async fn update_course(
    Path(id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<UpdateCourseRequest>, JsonRejection>,
) -> ApiResult<Json<Course>> {
    let Json(payload) = payload?;
    payload.validate()?;

    state
        .store
        .update_course(&id, payload)
        .or_fail("Failed to update course")?
        .map(Json)
        .ok_or(ApiError::NotFound(COURSE_NOT_FOUND))
}

/// Deletes a course together with all of its chapters
///
/// # Response
///
/// - **200 OK** - `{"message": "Course and its chapters deleted successfully", "chaptersDeleted": n}`
/// - **404 Not Found** - `{"error": "Course not found"}`
pub async fn delete_course(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let chapters_deleted = state
        .store
        .delete_course(&id)
        .or_fail("Failed to delete course")?
        .ok_or(ApiError::NotFound(COURSE_NOT_FOUND))?;

    tracing::info!(course_id = %id, chapters_deleted, "course deleted");

    Ok(Json(json!({
        "message": "Course and its chapters deleted successfully",
        "chaptersDeleted": chapters_deleted
    })))
}
