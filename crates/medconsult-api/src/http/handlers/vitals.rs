//! Vitals handlers for the REST API.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};

use medconsult_types::vitals::{RecordVitalRequest, VitalsEntry};

use crate::http::error::AppError;
use crate::http::extractors::query::VitalsListQuery;
use crate::http::handlers::parse_id;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/users/{id}/vitals
pub async fn record_vital(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<RecordVitalRequest>,
) -> Result<Json<ApiResponse<VitalsEntry>>, AppError> {
    let start = Instant::now();
    let user_id = parse_id(&user_id, "user")?;
    let entry = state.records.record_vital(&user_id, body).await?;

    Ok(Json(ApiResponse::timed(entry, start)))
}

/// GET /api/v1/users/{id}/vitals?metric=&from=&to=
pub async fn query_vitals(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<VitalsListQuery>,
) -> Result<Json<ApiResponse<Vec<VitalsEntry>>>, AppError> {
    let start = Instant::now();
    let user_id = parse_id(&user_id, "user")?;
    let entries = state.records.query_vitals(&user_id, &query.into()).await?;

    Ok(Json(
        ApiResponse::timed(entries, start)
            .with_link("self", &format!("/api/v1/users/{user_id}/vitals")),
    ))
}
