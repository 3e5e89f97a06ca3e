pub mod cache;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod flight;
pub mod rest;
pub mod service;

use std::any::Any;
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use python_runner::{InterpreterLocator, ProcessRunner};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use fourlife_common::Config;

pub use cache::ArtifactCache;
pub use descriptor::{ArtifactDescriptor, OutputMode};
pub use engine::{PythonEngine, SimulationEngine};
pub use error::{LabError, Result};
pub use flight::{Flight, FlightGroup};
pub use service::LabService;

pub struct AppState {
    pub lab: LabService,
}

impl AppState {
    pub fn new(lab: LabService) -> Self {
        Self { lab }
    }

    /// Wire the real Python engine and on-disk cache from config.
    pub fn from_config(config: &Config) -> Self {
        let locator = Arc::new(InterpreterLocator::new(config.python_candidates.clone()));
        let engine = PythonEngine::new(
            config.engine_dir.clone(),
            locator,
            ProcessRunner::new(config.stderr_excerpt_chars),
        );
        Self::new(LabService::new(
            ArtifactCache::new(config.public_dir.clone()),
            Arc::new(engine),
        ))
    }
}

/// Full HTTP app: routes plus CORS, no-store, request tracing and panic capture.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Lab runs
        .route("/api/lab-run", get(rest::api_lab_run))
        .route("/api/lab-run/kinds", get(rest::api_lab_kinds))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // No caching by intermediaries
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                }),
        )
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}

/// Last-resort 500 for a panic in a handler itself. The request never got as
/// far as a parsed kind, so no kind header or field is set here.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = panic_message(&*panic);
    tracing::error!(details = details.as_str(), "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": "Lab run failed",
            "details": details,
        })),
    )
        .into_response()
}
