use crate::AppState;
use axum::{Json, Router, extract::rejection::JsonRejection, http::StatusCode};
use nal2::history::{HistoryError, HistoryId};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

pub mod derived_state;
pub mod fixtures;
pub mod health;
pub mod history;
pub mod index;
pub mod calls;
pub mod params;
pub mod ws;

/// Routes served in every topology
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(index::routes())
        .merge(health::routes())
        .merge(calls::routes())
        .merge(derived_state::routes())
}

/// Routes that only exist when the engine is remote
pub fn relay_routes() -> Router<AppState> {
    Router::new()
        .merge(ws::routes())
        .merge(params::routes())
        .merge(history::routes())
        .merge(fixtures::routes())
}

/// Reply shape of the store endpoints
#[derive(Debug, Serialize, ToSchema)]
pub struct StoreReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StoreReply {
    pub fn data(data: impl Serialize) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            updated: None,
            message: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            updated: None,
            message: Some(message.into()),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            updated: None,
            message: Some(message.into()),
        }
    }
}

pub type StoreRejection = (StatusCode, Json<StoreReply>);

pub type StoreResult = Result<Json<StoreReply>, StoreRejection>;

fn store_error(error: HistoryError) -> StoreRejection {
    let status = match &error {
        HistoryError::NotFound(_) => StatusCode::NOT_FOUND,
        HistoryError::Persistence(_) | HistoryError::Serialization(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(StoreReply::failure(error.to_string())))
}

fn store_unavailable() -> StoreRejection {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(StoreReply::failure("history store not configured")),
    )
}

/// Unwrap a store request body, answering a bad body in the store reply shape.
fn store_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, StoreRejection> {
    body.map(|Json(body)| body)
        .map_err(|e| (e.status(), Json(StoreReply::failure(e.body_text()))))
}

/// A path id that is not a number names no record.
fn history_id(raw: &str) -> Result<HistoryId, StoreRejection> {
    raw.parse().map(HistoryId::new).map_err(|_| {
        (
            StatusCode::NOT_FOUND,
            Json(StoreReply::failure(format!("History record not found: {}", raw))),
        )
    })
}
