//! Integration tests for the course endpoints, including the cascade delete

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{create_chapter, create_course, send, setup_test_app};

#[tokio::test]
async fn test_create_course_assigns_server_fields() {
    let app = setup_test_app();

    let body = create_course(&app.router, "Spanish for Beginners").await;

    assert!(uuid::Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());
    assert_eq!(body["title"], "Spanish for Beginners");
    assert_eq!(body["status"], "Draft");
    assert_eq!(body["chaptersCount"], 0);
    assert!(body["createdAt"].is_string());
}

#[tokio::test]
async fn test_get_course_returns_stored_document() {
    let app = setup_test_app();
    let created = create_course(&app.router, "Spanish for Beginners").await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = send(&app.router, "GET", &format!("/api/courses/{}", id), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, created);
}

#[tokio::test]
async fn test_get_course_not_found() {
    let app = setup_test_app();

    let (status, body) = send(&app.router, "GET", "/api/courses/abc", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Course not found");
}

#[tokio::test]
async fn test_list_courses() {
    let app = setup_test_app();
    for title in ["Spanish", "French", "Quechua"] {
        create_course(&app.router, title).await;
    }

    let (status, body) = send(&app.router, "GET", "/api/courses", None).await;

    assert_eq!(status, StatusCode::OK);
    let mut titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap())
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["French", "Quechua", "Spanish"]);
}

#[tokio::test]
async fn test_create_course_requires_title() {
    let app = setup_test_app();

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/courses",
        Some(json!({ "title": "  ", "language": "Spanish" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request: title must not be empty");
    assert!(app.store.list_courses().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_course_changes_only_given_fields() {
    let app = setup_test_app();
    let created = create_course(&app.router, "Spanish for Beginners").await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = send(
        &app.router,
        "PATCH",
        &format!("/api/courses/{}", id),
        Some(json!({ "status": "Published" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Published");
    assert_eq!(body["title"], created["title"]);
    assert_eq!(body["dialect"], created["dialect"]);
}

#[tokio::test]
async fn test_delete_course_cascades_to_chapters() {
    let app = setup_test_app();
    let course = create_course(&app.router, "Spanish for Beginners").await;
    let other = create_course(&app.router, "French").await;
    let course_id = course["id"].as_str().unwrap();
    let other_id = other["id"].as_str().unwrap();

    let mut chapter_ids = Vec::new();
    for name in ["Greetings", "Numbers", "Food"] {
        let chapter = create_chapter(&app.router, course_id, name).await;
        chapter_ids.push(chapter["id"].as_str().unwrap().to_string());
    }
    let survivor = create_chapter(&app.router, other_id, "Bonjour").await;

    let (status, body) = send(&app.router, "DELETE", &format!("/api/courses/{}", course_id), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Course and its chapters deleted successfully");
    assert_eq!(body["chaptersDeleted"], 3);

    // Course and chapters disappear together
    assert!(app.store.get_course(course_id).unwrap().is_none());
    for id in &chapter_ids {
        let (status, _) = send(&app.router, "GET", &format!("/api/chapters/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // Chapters of other courses are untouched
    let (status, body) = send(
        &app.router,
        "GET",
        &format!("/api/chapters/{}", survivor["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["courseId"], other_id);

    // Nothing is left for the sweep to clean up
    assert_eq!(app.store.sweep_orphans().unwrap().orphan_chapters, 0);
}

#[tokio::test]
async fn test_delete_course_twice_yields_200_then_404() {
    let app = setup_test_app();
    let course = create_course(&app.router, "Spanish for Beginners").await;
    let uri = format!("/api/courses/{}", course["id"].as_str().unwrap());

    let (first, _) = send(&app.router, "DELETE", &uri, None).await;
    let (second, body) = send(&app.router, "DELETE", &uri, None).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Course not found");
}

#[tokio::test]
async fn test_delete_course_not_found() {
    let app = setup_test_app();

    let (status, body) = send(&app.router, "DELETE", "/api/courses/xyz", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Course not found");
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_sweep_endpoint_reports_nothing_on_clean_store() {
    let app = setup_test_app();
    let course = create_course(&app.router, "Spanish").await;
    create_chapter(&app.router, course["id"].as_str().unwrap(), "Greetings").await;

    let (status, body) = send(&app.router, "POST", "/api/maintenance/sweep", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "orphanChapters": 0, "danglingIndexEntries": 0 }));
}
