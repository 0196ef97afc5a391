use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use nal2_core::{CallRequest, CallResponse};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::AppState;

/// A remote calculation call
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProcessRequest {
    pub sequence_num: i64,
    pub function: String,
    #[schema(value_type = Object)]
    pub input_parameters: Map<String, Value>,
}

/// Result of a call; `return` is -1 when `output_parameters.error` is set
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProcessResponse {
    pub sequence_num: i64,
    pub function: String,
    #[serde(rename = "return")]
    pub return_code: i32,
    #[schema(value_type = Object)]
    pub output_parameters: Map<String, Value>,
}

/// Body of transport-level failures
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    #[serde(rename = "return")]
    pub return_code: i32,
    pub output_parameters: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub error: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            return_code: -1,
            output_parameters: ErrorDetail {
                error: message.into(),
            },
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/nal2/process", post(process))
}

fn internal_error(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorEnvelope::new(message)),
    )
        .into_response()
}

/// Run one named calculation
#[utoipa::path(
    post,
    path = "/api/nal2/process",
    request_body = ProcessRequest,
    responses(
        (status = 200, description = "Call completed or failed at application level", body = ProcessResponse),
        (status = 500, description = "Malformed body or internal fault", body = ErrorEnvelope),
        (status = 503, description = "No engine connected (relay)", body = ProcessResponse)
    ),
    tag = "nal2"
)]
pub async fn process(State(state): State<AppState>, body: Bytes) -> Response {
    let request: CallRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejecting malformed call body: {}", e);
            return internal_error(e.to_string());
        }
    };

    let sequence_num = request.sequence_num;
    let function = request.function.clone();
    match state.gateway.handle(request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) if e.is_unavailable() => {
            warn!("{} (sequence {}) rejected: {}", function, sequence_num, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(CallResponse::error(sequence_num, function, e.to_string())),
            )
                .into_response()
        }
        Err(e) => {
            error!("{} (sequence {}) failed: {}", function, sequence_num, e);
            internal_error(e.to_string())
        }
    }
}
