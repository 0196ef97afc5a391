use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use nal2_core::{DerivedSlot, DerivedSnapshot, DerivedStats};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use super::StoreReply;
use crate::AppState;

/// Current derived slots
#[derive(Debug, Serialize, ToSchema)]
pub struct SnapshotResponse {
    #[serde(rename = "CFArray")]
    pub cf_array: Vec<f64>,
    #[serde(rename = "FreqInCh")]
    pub freq_in_ch: Vec<i32>,
    #[serde(rename = "CT")]
    pub ct: Vec<f64>,
}

impl From<DerivedSnapshot> for SnapshotResponse {
    fn from(snapshot: DerivedSnapshot) -> Self {
        Self {
            cf_array: snapshot.cf_array,
            freq_in_ch: snapshot.freq_in_ch,
            ct: snapshot.ct,
        }
    }
}

/// Per-slot lengths
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub cf_array_length: usize,
    pub cf_array_is_empty: bool,
    pub freq_in_ch_length: usize,
    pub freq_in_ch_is_empty: bool,
    pub ct_length: usize,
    pub ct_is_empty: bool,
}

impl From<DerivedStats> for StatsResponse {
    fn from(stats: DerivedStats) -> Self {
        Self {
            cf_array_length: stats.cf_array_length,
            cf_array_is_empty: stats.cf_array_is_empty,
            freq_in_ch_length: stats.freq_in_ch_length,
            freq_in_ch_is_empty: stats.freq_in_ch_is_empty,
            ct_length: stats.ct_length,
            ct_is_empty: stats.ct_is_empty,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/derived-state", get(get_snapshot).delete(clear_all))
        .route("/api/derived-state/stats", get(get_stats))
        .route("/api/derived-state/{slot}", delete(clear_slot))
}

#[utoipa::path(
    get,
    path = "/api/derived-state",
    responses(
        (status = 200, description = "All derived slots", body = SnapshotResponse)
    ),
    tag = "derived-state"
)]
pub async fn get_snapshot(State(state): State<AppState>) -> Json<SnapshotResponse> {
    Json(state.gateway.cache().snapshot().into())
}

#[utoipa::path(
    get,
    path = "/api/derived-state/stats",
    responses(
        (status = 200, description = "Slot lengths", body = StatsResponse)
    ),
    tag = "derived-state"
)]
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.gateway.cache().stats().into())
}

#[utoipa::path(
    delete,
    path = "/api/derived-state/{slot}",
    params(
        ("slot" = String, Path, description = "CFArray, FreqInCh or CT")
    ),
    responses(
        (status = 200, description = "Slot cleared", body = StoreReply),
        (status = 404, description = "Unknown slot", body = StoreReply)
    ),
    tag = "derived-state"
)]
pub async fn clear_slot(
    State(state): State<AppState>,
    Path(slot): Path<String>,
) -> Result<Json<StoreReply>, (StatusCode, Json<StoreReply>)> {
    let slot = DerivedSlot::from_str(&slot).map_err(|_| {
        (
            StatusCode::NOT_FOUND,
            Json(StoreReply::failure(format!("unknown derived slot: {}", slot))),
        )
    })?;
    state.gateway.cache().delete(slot);
    info!("Derived slot {} cleared over HTTP", slot);
    Ok(Json(StoreReply::message(format!("{} cleared", slot))))
}

#[utoipa::path(
    delete,
    path = "/api/derived-state",
    responses(
        (status = 200, description = "All slots cleared", body = StoreReply)
    ),
    tag = "derived-state"
)]
pub async fn clear_all(State(state): State<AppState>) -> Json<StoreReply> {
    state.gateway.cache().clear_all();
    info!("All derived slots cleared over HTTP");
    Json(StoreReply::message("derived state cleared"))
}
