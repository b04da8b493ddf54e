//! HTTP request handlers, one module per resource
//!
//! Handlers validate the payload, call the [`Store`](crate::database::Store)
//! and shape the response. Failures surface as [`ApiError`](crate::error::ApiError).

pub mod admin;
pub mod chapter;
pub mod course;
pub mod maintenance;

pub use admin::{create_admin, list_admins};
pub use chapter::{
    create_chapter, create_chapter_with_audio, delete_chapter, get_chapter, list_chapters,
    reorder_chapters, update_chapter,
};
pub use course::{create_course, delete_course, get_course, list_courses, update_course};
pub use maintenance::sweep_orphans;
