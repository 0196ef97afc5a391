use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use nal2::Gateway;
use nal2::history::HistoryService;
use nal2::storage::Storage;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod routes;

pub use config::{ApiConfig, CorsConfig};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    /// Current-params and history store, relay topology only
    pub history: Option<Arc<HistoryService>>,
    /// Directory of recorded call fixtures
    pub fixtures: Option<Arc<dyn Storage>>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(gateway: Gateway, config: ApiConfig) -> Self {
        Self {
            gateway,
            history: None,
            fixtures: None,
            config: Arc::new(config),
        }
    }

    pub fn with_history(mut self, history: Arc<HistoryService>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_fixtures(mut self, fixtures: Arc<dyn Storage>) -> Self {
        self.fixtures = Some(fixtures);
        self
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::calls::process,
        crate::routes::derived_state::get_snapshot,
        crate::routes::derived_state::get_stats,
        crate::routes::derived_state::clear_slot,
        crate::routes::derived_state::clear_all,
        crate::routes::params::get_current_params,
        crate::routes::params::set_current_params,
        crate::routes::history::list_history,
        crate::routes::history::save_history,
        crate::routes::history::update_history,
        crate::routes::history::delete_history,
        crate::routes::fixtures::run_all,
    ),
    components(
        schemas(
            crate::routes::health::HealthResponse,
            crate::routes::calls::ProcessRequest,
            crate::routes::calls::ProcessResponse,
            crate::routes::calls::ErrorEnvelope,
            crate::routes::calls::ErrorDetail,
            crate::routes::derived_state::SnapshotResponse,
            crate::routes::derived_state::StatsResponse,
            crate::routes::params::ParamsBody,
            crate::routes::history::HistoryPatchBody,
            crate::routes::StoreReply,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "nal2", description = "Remote calculation calls"),
        (name = "derived-state", description = "Cached engine outputs reused as defaults"),
        (name = "history", description = "Saved calls and current parameters (relay)"),
        (name = "fixtures", description = "Recorded call fixtures (relay)")
    )
)]
pub struct ApiDoc;

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = if config.allow_any_origin {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(config.max_age_secs))
}

/// Build API application
pub fn build_app(state: AppState) -> Router {
    let mut router = Router::new().merge(routes::routes());
    if state.gateway.relay().is_some() {
        router = router.merge(routes::relay_routes());
    }
    if state.config.enable_swagger {
        router = router
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    router
        .layer(cors_layer(&state.config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
