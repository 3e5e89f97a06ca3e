use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{error, warn};

use fourlife_common::{LabAction, LabRunQuery, RunRequest, SimulationKind};

use crate::descriptor::ArtifactDescriptor;
use crate::AppState;

pub const KIND_HEADER: HeaderName = HeaderName::from_static("x-web4-lab-kind");
pub const SOURCE_HEADER: HeaderName = HeaderName::from_static("x-web4-lab-source");
pub const JOINED_HEADER: HeaderName = HeaderName::from_static("x-web4-lab-joined");

/// Which path produced the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabSource {
    Cache,
    FreshRun,
}

impl LabSource {
    pub const fn header_value(self) -> &'static str {
        match self {
            LabSource::Cache => "public-cache",
            LabSource::FreshRun => "ran-python",
        }
    }
}

fn kind_header(kind: SimulationKind) -> [(HeaderName, HeaderValue); 1] {
    [(KIND_HEADER, HeaderValue::from_static(kind.as_str()))]
}

fn artifact_response(kind: SimulationKind, source: LabSource, joined: bool, body: Bytes) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (KIND_HEADER, HeaderValue::from_static(kind.as_str())),
            (SOURCE_HEADER, HeaderValue::from_static(source.header_value())),
            (JOINED_HEADER, HeaderValue::from_static(if joined { "true" } else { "false" })),
        ],
        body,
    )
        .into_response()
}

// --- Handlers ---

/// `GET /api/lab-run`
pub async fn api_lab_run(
    State(state): State<Arc<AppState>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    // Repeated keys: first value wins.
    let pairs = match query {
        Ok(Query(pairs)) => pairs,
        Err(e) => {
            warn!(error = %e.body_text(), "Unreadable lab-run query string");
            Vec::new()
        }
    };
    let query = LabRunQuery::from_pairs(pairs);

    let request = match RunRequest::from_query(&query) {
        Ok(r) => r,
        Err(e) => {
            warn!(kind = ?e.given, "Rejected lab run for unknown kind");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Invalid kind",
                    "kind": e.given,
                    "allowed": SimulationKind::allowed(),
                })),
            )
                .into_response();
        }
    };

    let kind = request.kind;
    let descriptor = ArtifactDescriptor::for_request(kind, &request.params);

    match request.action {
        LabAction::Read => match state.lab.read(&descriptor).await {
            Some(body) => artifact_response(kind, LabSource::Cache, false, body),
            None => (
                StatusCode::NOT_FOUND,
                kind_header(kind),
                Json(json!({
                    "error": "No cached artifact",
                    "kind": kind,
                    "file": descriptor.file_name,
                    "hint": format!("Retry with action=run to generate it: /api/lab-run?kind={kind}&action=run"),
                })),
            )
                .into_response(),
        },
        LabAction::Run => {
            let flight = state.lab.run(&descriptor, request.params.timeout).await;
            match flight.result {
                Ok(body) => artifact_response(kind, LabSource::FreshRun, flight.joined, body),
                Err(e) => {
                    error!(kind = %kind, error = %e, "Lab run request failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        kind_header(kind),
                        Json(json!({
                            "error": "Lab run failed",
                            "kind": kind,
                            "details": e.to_string(),
                        })),
                    )
                        .into_response()
                }
            }
        }
    }
}

/// `GET /api/lab-run/kinds`: the descriptor table and what is cached.
pub async fn api_lab_kinds(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut kinds = Vec::new();
    for (pattern_source, descriptor) in ArtifactDescriptor::catalog() {
        let cached = state.lab.cache().contains(&descriptor.file_name).await;
        kinds.push(json!({
            "kind": descriptor.kind,
            "pattern_source": pattern_source,
            "file": descriptor.file_name,
            "script": descriptor.script,
            "output": descriptor.output,
            "cached": cached,
        }));
    }
    Json(json!({ "kinds": kinds }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_header_values_are_stable() {
        assert_eq!(LabSource::Cache.header_value(), "public-cache");
        assert_eq!(LabSource::FreshRun.header_value(), "ran-python");
    }

    #[test]
    fn artifact_response_sets_json_and_lab_headers() {
        let resp = artifact_response(
            SimulationKind::EpFiveDomain,
            LabSource::FreshRun,
            false,
            Bytes::from_static(b"{}"),
        );
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(resp.headers()[KIND_HEADER], "ep_five_domain");
        assert_eq!(resp.headers()[SOURCE_HEADER], "ran-python");
    }
}
