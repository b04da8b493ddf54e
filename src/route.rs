//! Route definitions for the course administration API
//!
//! This module maps every HTTP route to its handler and injects the
//! application state.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;

use crate::database::AppState;
use crate::handler::{
    create_admin, create_chapter, create_chapter_with_audio, create_course, delete_chapter,
    delete_course, get_chapter, get_course, list_admins, list_chapters, list_courses,
    reorder_chapters, sweep_orphans, update_chapter, update_course,
};

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `GET|POST /api/admins` - List admins / create an admin
/// - `GET|POST /api/courses` - List courses / create a course
/// - `GET|PATCH|DELETE /api/courses/{id}` - Read, update or cascade-delete a course
/// - `GET|POST /api/courses/{id}/chapters` - List / append chapters of a course
/// - `POST /api/courses/{id}/chapters/upload` - Upload audio and append a chapter (multipart)
/// - `PUT /api/courses/{id}/chapters/order` - Reorder a course's chapters
/// - `GET|PATCH|DELETE /api/chapters/{id}` - Read, update or delete a chapter
/// - `POST /api/maintenance/sweep` - Remove orphaned chapters now
///
/// # Example Usage
///
/// ```no_run
/// # use std::sync::Arc;
/// # use course_admin::database::{AppState, Store};
/// # use course_admin::route::create_app;
/// # use course_admin::upload::LocalObjectStore;
/// let state = AppState {
///     store: Store::open("data.db").unwrap(),
///     uploads: Arc::new(LocalObjectStore::new("uploads", "http://localhost:8080/files")),
///     max_upload_bytes: 25 * 1024 * 1024,
/// };
/// let app = create_app(state);
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    let api_routes = Router::new()
        .route("/admins", get(list_admins).post(create_admin))
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/{id}",
            get(get_course).patch(update_course).delete(delete_course),
        )
        .route(
            "/courses/{id}/chapters",
            get(list_chapters).post(create_chapter),
        )
        .route(
            "/courses/{id}/chapters/upload",
            post(create_chapter_with_audio).layer(upload_limit),
        )
        .route("/courses/{id}/chapters/order", put(reorder_chapters))
        .route(
            "/chapters/{id}",
            get(get_chapter).patch(update_chapter).delete(delete_chapter),
        )
        .route("/maintenance/sweep", post(sweep_orphans));

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
}
