//! Condition handlers for the REST API.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};

use medconsult_types::condition::Condition;

use crate::http::error::AppError;
use crate::http::extractors::query::ConditionListQuery;
use crate::http::handlers::parse_id;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/users/{id}/conditions?active=
pub async fn list_conditions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ConditionListQuery>,
) -> Result<Json<ApiResponse<Vec<Condition>>>, AppError> {
    let start = Instant::now();
    let user_id = parse_id(&user_id, "user")?;
    let conditions = state.records.list_conditions(&user_id, query.active).await?;

    Ok(Json(
        ApiResponse::timed(conditions, start)
            .with_link("self", &format!("/api/v1/users/{user_id}/conditions")),
    ))
}
