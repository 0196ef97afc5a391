use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use crate::AppState;
use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub server: String,
    pub port: u16,
    pub api_endpoint: String,
    pub topology: String,
    pub version: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Address of the interface that routes outward. Nothing is sent.
fn local_ip() -> IpAddr {
    UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| {
            socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let server = local_ip().to_string();
    let port = state.config.effective_port();
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
        api_endpoint: format!("http://{}:{}/api/nal2/process", server, port),
        server,
        port,
        topology: state.gateway.metadata().topology.to_string(),
        version: state.gateway.metadata().version.clone(),
    })
}
