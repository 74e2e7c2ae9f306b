//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/` except `/health`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Users
        .route("/users", post(handlers::users::create_user))
        .route("/users/{id}", get(handlers::users::get_user))
        // Consultations (user-scoped)
        .route(
            "/users/{id}/consultations",
            post(handlers::consultations::create_consultation)
                .get(handlers::consultations::list_consultations),
        )
        // Conditions and vitals (user-scoped)
        .route(
            "/users/{id}/conditions",
            get(handlers::conditions::list_conditions),
        )
        .route(
            "/users/{id}/vitals",
            post(handlers::vitals::record_vital).get(handlers::vitals::query_vitals),
        )
        // Consultations (top-level)
        .route(
            "/consultations/{id}",
            get(handlers::consultations::get_consultation),
        )
        .route(
            "/consultations/{id}/timeline",
            get(handlers::consultations::get_timeline),
        )
        .route(
            "/consultations/{id}/turns",
            post(handlers::consultations::create_turn),
        )
        .route(
            "/consultations/{id}/consolidate",
            post(handlers::consultations::consolidate),
        )
        .route(
            "/consultations/{id}/reconcile",
            post(handlers::consultations::reconcile),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
