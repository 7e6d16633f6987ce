//! HTTP surface. Thin handlers that parse the request, delegate to
//! [`crate::service`], and wrap the result in a JSON envelope.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use serde_json::{Map, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app::{AppError, AppState};
use crate::service;

/// Builds the full HTTP router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/x", get(list_features))
        .route("/api/v1/x/{name}", get(describe))
        .route("/api/v1/x/{name}/checksum", get(checksum))
        .route("/api/v1/x/{name}/backend", get(backend))
        .route("/api/v1/x/{name}/frontend", get(frontend))
        .route("/api/v1/x/{name}/mappings", get(mappings))
        .route("/api/v1/x/{name}/query/{query_id}", get(run_query).post(run_query))
        .route("/api/v1/x/{name}/queries/{query_id}", post(run_query))
        .route("/api/v1/x/{name}/actions/{action_id}", post(run_action))
        .route("/api/v1/checksums", get(checksums_all))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parses a request body as a JSON parameter map. An empty body is
/// treated as an empty map.
fn parse_params(body: &Bytes) -> Result<Map<String, Value>, AppError> {
    if body.is_empty() {
        return Ok(Map::new());
    }
    serde_json::from_slice(body).map_err(|err| AppError::InvalidRequestBody(err.to_string()))
}

async fn list_features(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(service::list_features(&state.feature_root))
}

async fn describe(State(state): State<AppState>, Path(name): Path<String>) -> Result<Response, AppError> {
    Ok(Json(service::describe(&state.feature_root, &name)?).into_response())
}

async fn checksum(State(state): State<AppState>, Path(name): Path<String>) -> Result<Response, AppError> {
    Ok(Json(service::checksum(&state.feature_root, &name)?).into_response())
}

async fn backend(State(state): State<AppState>, Path(name): Path<String>) -> Result<Response, AppError> {
    Ok(Json(service::backend(&state.feature_root, &name)?).into_response())
}

async fn frontend(State(state): State<AppState>, Path(name): Path<String>) -> Result<Response, AppError> {
    Ok(Json(service::frontend(&state.feature_root, &name)?).into_response())
}

async fn mappings(State(state): State<AppState>, Path(name): Path<String>) -> Result<Response, AppError> {
    let cancel = state.shutdown.child_token();
    Ok(Json(service::resolve_mappings(&state, &name, &cancel).await?).into_response())
}

async fn run_query(
    State(state): State<AppState>,
    Path((name, query_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Response, AppError> {
    let params = parse_params(&body)?;
    let cancel = state.shutdown.child_token();
    Ok(Json(service::execute_query(&state, &name, &query_id, &params, &cancel).await?).into_response())
}

async fn run_action(
    State(state): State<AppState>,
    Path((name, action_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Response, AppError> {
    let params = parse_params(&body)?;
    let cancel = state.shutdown.child_token();
    Ok(Json(service::execute_action(&state, &name, &action_id, &params, &cancel).await?).into_response())
}

async fn checksums_all(State(state): State<AppState>) -> Json<std::collections::BTreeMap<String, String>> {
    Json(service::checksums_all(&state.feature_root))
}

#[derive(Serialize)]
struct StatusBody {
    status: &'static str,
}

async fn health(State(state): State<AppState>) -> Response {
    match state.db.ping().await {
        Ok(()) => Json(StatusBody { status: "healthy" }).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(StatusBody { status: "unhealthy" })).into_response()
        }
    }
}

async fn ready() -> Json<StatusBody> {
    Json(StatusBody { status: "ready" })
}
