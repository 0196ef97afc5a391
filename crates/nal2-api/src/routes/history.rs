use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::{get, put},
};
use nal2::history::{HistoryPatch, HistoryRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::params::ParamsBody;
use super::{
    StoreRejection, StoreReply, StoreResult, history_id, store_body, store_error,
    store_unavailable,
};
use crate::AppState;

/// Fields of a history record to replace
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct HistoryPatchBody {
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub input: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub output: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<HistoryPatchBody> for HistoryPatch {
    fn from(body: HistoryPatchBody) -> Self {
        HistoryPatch {
            input: body.input,
            output: body.output,
            name: body.name,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/history", get(list_history).post(save_history))
        .route("/api/history/{id}", put(update_history).delete(delete_history))
}

/// Saved calls, most recent first
#[utoipa::path(
    get,
    path = "/api/history",
    responses(
        (status = 200, description = "History records, most recent first")
    ),
    tag = "history"
)]
pub async fn list_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryRecord>>, StoreRejection> {
    let history = state.history.as_ref().ok_or_else(store_unavailable)?;
    Ok(Json(history.list().await))
}

/// Save a call, replacing an earlier record of the same function
#[utoipa::path(
    post,
    path = "/api/history",
    request_body = ParamsBody,
    responses(
        (status = 200, description = "Record saved; `updated` tells whether one was replaced", body = StoreReply),
        (status = 400, description = "Body is not valid JSON", body = StoreReply),
        (status = 500, description = "Store write failed", body = StoreReply)
    ),
    tag = "history"
)]
pub async fn save_history(
    State(state): State<AppState>,
    body: Result<Json<ParamsBody>, JsonRejection>,
) -> StoreResult {
    let history = state.history.as_ref().ok_or_else(store_unavailable)?;
    let body = store_body(body)?;
    let saved = history
        .save(body.input, body.output)
        .await
        .map_err(store_error)?;

    let mut reply = StoreReply::data(saved.record);
    reply.updated = Some(saved.updated);
    Ok(Json(reply))
}

#[utoipa::path(
    put,
    path = "/api/history/{id}",
    params(
        ("id" = String, Path, description = "Record id")
    ),
    request_body = HistoryPatchBody,
    responses(
        (status = 200, description = "Record updated", body = StoreReply),
        (status = 400, description = "Body is not valid JSON", body = StoreReply),
        (status = 404, description = "No such record", body = StoreReply)
    ),
    tag = "history"
)]
pub async fn update_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<HistoryPatchBody>, JsonRejection>,
) -> StoreResult {
    let history = state.history.as_ref().ok_or_else(store_unavailable)?;
    let id = history_id(&id)?;
    let patch = store_body(body)?;
    let record = history
        .update(id, patch.into())
        .await
        .map_err(store_error)?;
    Ok(Json(StoreReply::data(record)))
}

#[utoipa::path(
    delete,
    path = "/api/history/{id}",
    params(
        ("id" = String, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "Record deleted", body = StoreReply),
        (status = 404, description = "No such record", body = StoreReply)
    ),
    tag = "history"
)]
pub async fn delete_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> StoreResult {
    let history = state.history.as_ref().ok_or_else(store_unavailable)?;
    history
        .delete(history_id(&id)?)
        .await
        .map_err(store_error)?;
    Ok(Json(StoreReply::message("record deleted")))
}
