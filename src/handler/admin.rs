//! Admin account handlers
//!
//! There is no update or delete path for admins. Passwords are stored as
//! received; only the create response strips them.

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use chrono::Utc;
use uuid::Uuid;

use crate::database::AppState;
use crate::error::{ApiResult, StoreResultExt};
use crate::model::{Admin, AdminResponse, CreateAdminRequest, Validate};

/// Lists every stored admin record
///
/// # Response
///
/// - **200 OK** - Array of admin records, `password` included
/// - **500 Internal Server Error** - `{"error": "Failed to fetch admins"}`
pub async fn list_admins(State(state): State<AppState>) -> ApiResult<Json<Vec<Admin>>> {
    let admins = state.store.list_admins().or_fail("Failed to fetch admins")?;
    Ok(Json(admins))
}

/// Creates an admin account
///
/// # Request Body
///
/// ```json
/// { "name": "A", "email": "a@x.com", "password": "p", "role": "editor" }
/// ```
///
/// # Response
///
/// - **201 Created** - The stored record without `password`
/// - **400 Bad Request** - Missing or malformed fields
/// - **500 Internal Server Error** - `{"error": "Failed to create admin"}`
pub async fn create_admin(
    State(state): State<AppState>,
    payload: Result<Json<CreateAdminRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AdminResponse>)> {
    let Json(payload) = payload?;
    payload.validate()?;

    let admin = Admin {
        id: Uuid::new_v4().to_string(),
        name: payload.name,
        email: payload.email,
        password: payload.password,
        role: payload.role,
        created_at: Utc::now().date_naive(),
    };

    state.store.insert_admin(&admin).or_fail("Failed to create admin")?;
    tracing::info!(admin_id = %admin.id, role = %admin.role, "admin created");

    Ok((StatusCode::CREATED, Json(AdminResponse::from(admin))))
}
