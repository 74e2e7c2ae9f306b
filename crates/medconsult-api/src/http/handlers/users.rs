//! User handlers for the REST API.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use medconsult_types::user::{CreateUserRequest, User};

use crate::http::error::AppError;
use crate::http::handlers::parse_id;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/users - Register a patient.
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let start = Instant::now();
    let user = state.records.create_user(body).await?;
    let id = user.id;

    Ok(Json(with_user_links(ApiResponse::timed(user, start), id)))
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let start = Instant::now();
    let id = parse_id(&id, "user")?;
    let user = state.records.get_user(&id).await?;

    Ok(Json(with_user_links(ApiResponse::timed(user, start), id)))
}

fn with_user_links(resp: ApiResponse<User>, id: Uuid) -> ApiResponse<User> {
    let base = format!("/api/v1/users/{id}");
    resp.with_link("self", &base)
        .with_link("consultations", &format!("{base}/consultations"))
        .with_link("conditions", &format!("{base}/conditions"))
        .with_link("vitals", &format!("{base}/vitals"))
}
