use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use nal2::fixtures::load_fixtures;
use serde_json::json;
use tracing::error;

use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/test/run-all", get(run_all))
}

/// Every recorded call fixture, in file name order
#[utoipa::path(
    get,
    path = "/api/test/run-all",
    responses(
        (status = 200, description = "Parsed fixture files"),
        (status = 500, description = "Fixture directory unreadable")
    ),
    tag = "fixtures"
)]
pub async fn run_all(State(state): State<AppState>) -> Response {
    let Some(storage) = state.fixtures.as_ref() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "test data directory not configured"})),
        )
            .into_response();
    };

    match load_fixtures(storage.as_ref()).await {
        Ok(fixtures) => Json(fixtures).into_response(),
        Err(e) => {
            error!("Failed to read test data: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}
