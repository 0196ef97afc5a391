use axum::{
    Router,
    extract::{
        State,
        ws::{WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
    routing::get,
};
use nal2::Topology;

use super::ws;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(index))
}

/// Peers may upgrade at `/` as well as `/ws`; plain requests get the listing.
async fn index(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
) -> Response {
    match upgrade.ok().and_then(|upgrade| ws::accept(upgrade, &state)) {
        Some(response) => response,
        None => listing(&state).into_response(),
    }
}

fn listing(state: &AppState) -> String {
    let metadata = state.gateway.metadata();
    let mut lines = vec![
        format!("{} {} ({})", metadata.name, metadata.version, metadata.topology),
        String::new(),
        "Endpoints:".to_string(),
        "  GET    /health".to_string(),
        "  POST   /api/nal2/process".to_string(),
        "  GET    /api/derived-state".to_string(),
        "  GET    /api/derived-state/stats".to_string(),
        "  DELETE /api/derived-state[/{slot}]".to_string(),
    ];
    if metadata.topology == Topology::Relay {
        lines.extend(
            [
                "  GET    /ws (also /)",
                "  GET    /api/current-params",
                "  POST   /api/current-params",
                "  GET    /api/history",
                "  POST   /api/history",
                "  PUT    /api/history/{id}",
                "  DELETE /api/history/{id}",
                "  GET    /api/test/run-all",
            ]
            .map(String::from),
        );
    }
    if state.config.enable_swagger {
        lines.push("  GET    /swagger-ui".to_string());
    }
    lines.push(String::new());
    lines.join("\n")
}
