//! Route configuration and setup.
//!
//! Upload, download and file routes are registered here; health checks live
//! in [health](health).

mod health;

use crate::error::is_production_mode;
use crate::handlers::{download, files, upload};
use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use imenu_core::Config;
use imenu_infra::{
    get_request_id, request_id_middleware, security_headers_middleware, ErrorResponse,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub async fn setup_routes(
    config: &Config,
    state: Arc<AppState>,
) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let body_limit = config.max_request_body_bytes();
    tracing::info!(
        max_upload_bytes = config.max_upload_bytes(),
        body_limit_bytes = body_limit,
        "Request body limit enabled"
    );

    let app = public_routes(state.clone())
        .merge(upload_routes())
        .merge(download_routes())
        .merge(file_routes())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods(methods)
            .allow_headers(cors::Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(cors::Any)
    };
    Ok(cors)
}

/// Request span carrying the id set by `request_id_middleware`, which runs first.
fn request_span(request: &Request) -> tracing::Span {
    let request_id = get_request_id(request).unwrap_or_default();
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

/// Turn a handler panic into the regular JSON error envelope.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");

    let mut body = ErrorResponse::new("Internal server error", "INTERNAL_ERROR");
    if !is_production_mode() {
        body.details = Some(detail);
    }

    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );
    response
}

fn public_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/health",
            get({
                let state = state.clone();
                move || {
                    let state = state.clone();
                    async { health::health_check(state).await }
                }
            }),
        )
        .route(
            "/live",
            get({
                let state = state.clone();
                move || async { health::liveness_check(state).await }
            }),
        )
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
}

fn upload_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/upload", post(upload::upload_file))
        .route("/api/cardapio", post(upload::upload_menu))
        .route("/upload-profile-pic", post(upload::upload_profile_picture))
}

fn download_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/download", get(download::download_by_public_id))
        .route("/download/{file_id}", get(download::download_by_id))
}

fn file_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/uploads/{*key}", get(files::serve_public_file))
        .route("/files/{*key}", get(files::serve_signed_file))
}
