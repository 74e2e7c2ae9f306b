//! Consultation handlers for the REST API: sessions, timeline, turns, and
//! the manual memory triggers.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use medconsult_types::consultation::{Consultation, CreateConsultationRequest, TimelineEntry};
use medconsult_types::memory::{ConsolidationOutcome, ReconciliationOutcome};
use medconsult_types::turn::TurnOutcome;

use crate::http::error::AppError;
use crate::http::extractors::query::ConsultationListQuery;
use crate::http::handlers::parse_id;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Body of `POST /consultations/{id}/turns`.
#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub query: String,
}

/// POST /api/v1/users/{id}/consultations
pub async fn create_consultation(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<CreateConsultationRequest>,
) -> Result<Json<ApiResponse<Consultation>>, AppError> {
    let start = Instant::now();
    let user_id = parse_id(&user_id, "user")?;
    let consultation = state.records.create_consultation(&user_id, body).await?;
    let base = format!("/api/v1/consultations/{}", consultation.id);

    Ok(Json(
        ApiResponse::timed(consultation, start)
            .with_link("self", &base)
            .with_link("timeline", &format!("{base}/timeline"))
            .with_link("turns", &format!("{base}/turns")),
    ))
}

/// GET /api/v1/users/{id}/consultations?limit=
pub async fn list_consultations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ConsultationListQuery>,
) -> Result<Json<ApiResponse<Vec<Consultation>>>, AppError> {
    let start = Instant::now();
    let user_id = parse_id(&user_id, "user")?;
    let consultations = state.records.list_consultations(&user_id, query.limit).await?;

    Ok(Json(
        ApiResponse::timed(consultations, start)
            .with_link("self", &format!("/api/v1/users/{user_id}/consultations")),
    ))
}

/// GET /api/v1/consultations/{id}
pub async fn get_consultation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Consultation>>, AppError> {
    let start = Instant::now();
    let id = parse_id(&id, "consultation")?;
    let consultation = state.records.get_consultation(&id).await?;
    let user = format!("/api/v1/users/{}", consultation.user_id);

    Ok(Json(
        ApiResponse::timed(consultation, start)
            .with_link("self", &format!("/api/v1/consultations/{id}"))
            .with_link("user", &user),
    ))
}

/// GET /api/v1/consultations/{id}/timeline - Chronological turns.
pub async fn get_timeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<TimelineEntry>>>, AppError> {
    let start = Instant::now();
    let id = parse_id(&id, "consultation")?;
    let entries = state.records.timeline(&id).await?;

    Ok(Json(ApiResponse::timed(entries, start)))
}

/// POST /api/v1/consultations/{id}/turns - Run one consultation turn.
///
/// Once a reply is generated the request succeeds; side-effect failures are
/// reported in `data.side_effects.errors`.
pub async fn create_turn(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<TurnRequest>,
) -> Result<Json<ApiResponse<TurnOutcome>>, AppError> {
    let start = Instant::now();
    let id = parse_id(&id, "consultation")?;
    let outcome = state.consultations.handle_turn(None, &id, &body.query).await?;

    if !outcome.side_effects.errors.is_empty() {
        tracing::warn!(
            consultation_id = %id,
            failures = outcome.side_effects.errors.len(),
            "turn completed with side-effect failures"
        );
    }
    Ok(Json(
        ApiResponse::timed(outcome, start)
            .with_link("timeline", &format!("/api/v1/consultations/{id}/timeline")),
    ))
}

/// POST /api/v1/consultations/{id}/consolidate
pub async fn consolidate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ConsolidationOutcome>>, AppError> {
    let start = Instant::now();
    let id = parse_id(&id, "consultation")?;
    let outcome = state.consultations.consolidate(&id).await?;

    Ok(Json(ApiResponse::timed(outcome, start)))
}

/// POST /api/v1/consultations/{id}/reconcile
pub async fn reconcile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ReconciliationOutcome>>, AppError> {
    let start = Instant::now();
    let id = parse_id(&id, "consultation")?;
    let outcome = state.consultations.reconcile(&id).await?;

    Ok(Json(ApiResponse::timed(outcome, start)))
}
