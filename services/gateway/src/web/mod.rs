pub mod rest;
pub mod state;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use rest::{
    get_result_handler, health_handler, list_results_handler, process_ocr_handler,
    update_result_handler, ApiDoc,
};
use state::AppState;

/// Headroom over the upload limit for the multipart envelope, so oversized
/// files still reach the upload policy and get its error message.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Builds the complete application: the REST API under `/api` plus Swagger UI.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let body_limit = app_state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);
    let cors = cors_layer(&app_state.config);

    let api_router = Router::new()
        .route("/health", get(health_handler))
        .route("/ocr/results", get(list_results_handler))
        .route("/ocr/result/{filename}", get(get_result_handler))
        .route("/ocr/process", post(process_ocr_handler))
        .route("/ocr/update/{filename}", put(update_result_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state);

    Router::new()
        .nest("/api", api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Restricts cross-origin access to `CORS_ORIGIN` when set; any origin otherwise.
fn cors_layer(config: &Config) -> CorsLayer {
    let Some(origin) = &config.cors_origin else {
        return CorsLayer::permissive();
    };
    match origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE, ACCEPT]),
        Err(e) => {
            warn!("Ignoring invalid CORS_ORIGIN '{}': {}", origin, e);
            CorsLayer::new()
        }
    }
}
