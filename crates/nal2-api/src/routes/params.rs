use axum::{Json, Router, extract::State, extract::rejection::JsonRejection, routing::get};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use nal2::history::CurrentParams;

use super::{
    StoreRejection, StoreReply, StoreResult, store_body, store_error, store_unavailable,
};
use crate::AppState;

/// Input and output of a staged or saved call
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ParamsBody {
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub input: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub output: Option<Value>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/api/current-params",
        get(get_current_params).post(set_current_params),
    )
}

#[utoipa::path(
    get,
    path = "/api/current-params",
    responses(
        (status = 200, description = "Current parameters", body = ParamsBody)
    ),
    tag = "history"
)]
pub async fn get_current_params(
    State(state): State<AppState>,
) -> Result<Json<CurrentParams>, StoreRejection> {
    let history = state.history.as_ref().ok_or_else(store_unavailable)?;
    Ok(Json(history.current_params().await))
}

#[utoipa::path(
    post,
    path = "/api/current-params",
    request_body = ParamsBody,
    responses(
        (status = 200, description = "Current parameters replaced", body = StoreReply),
        (status = 400, description = "Body is not valid JSON", body = StoreReply),
        (status = 500, description = "Store write failed", body = StoreReply)
    ),
    tag = "history"
)]
pub async fn set_current_params(
    State(state): State<AppState>,
    body: Result<Json<ParamsBody>, JsonRejection>,
) -> StoreResult {
    let history = state.history.as_ref().ok_or_else(store_unavailable)?;
    let body = store_body(body)?;
    let params = history
        .set_current_params(body.input, body.output)
        .await
        .map_err(store_error)?;
    Ok(Json(StoreReply::data(params)))
}
