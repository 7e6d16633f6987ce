//! Top-level application state, configuration, and error types.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use clap::Parser;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::db::DbPool;
use crate::feature::Dialect;
use crate::mock::MockStore;

/// Process-level configuration. Always built once at startup and
/// threaded explicitly into every constructor; there is no module-level
/// global state.
#[derive(Clone, Debug, Parser)]
#[command(name = "xfeature-server", about = "XFeature declarative data-access engine")]
pub struct Config {
    /// Directory of XML feature files.
    #[arg(long, env = "XFEATURE_FEATURE_ROOT", default_value = "specs/xfeature/")]
    pub feature_root: PathBuf,

    /// Directory of mock fixture files.
    #[arg(long, env = "XFEATURE_MOCK_ROOT", default_value = "specs/mock/")]
    pub mock_root: PathBuf,

    /// When true, write a fixture on every successful non-empty query.
    #[arg(long, env = "XFEATURE_CAPTURE_MOCK", default_value_t = false)]
    pub capture_mock: bool,

    /// Database dialect: `sqlite`, `sqlserver`, or `generic`.
    #[arg(long, env = "XFEATURE_DB_DIALECT", default_value = "sqlite")]
    pub db_dialect: String,

    /// Database connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Port for the HTTP server.
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,
}

impl Config {
    /// Parses the dialect string into a [`Dialect`], defaulting to
    /// [`Dialect::Sqlite`] on any parse failure.
    pub fn dialect(&self) -> Dialect {
        self.db_dialect.parse().unwrap_or(Dialect::Sqlite)
    }
}

/// Application state shared across requests. Cheaply cloneable and moved
/// into every axum handler, the same way the teacher's `AppState` is
/// moved into every RPC procedure.
#[derive(Clone)]
pub struct AppState {
    /// Connection to the configured database.
    pub db: DbPool,

    /// Mock fixture store.
    pub mock: MockStore,

    /// Directory of XML feature files.
    pub feature_root: PathBuf,

    /// Root cancellation token for the server process. Every request
    /// derives a child token from this one via
    /// [`CancellationToken::child_token`], so a process-wide shutdown
    /// cancels every in-flight request without the reverse holding true.
    pub shutdown: CancellationToken,
}

/// Top-level application error. Failures that are recoverable (mock
/// read/write failure, mapping resolution failure) never reach this
/// type; they are logged and swallowed at their point of occurrence.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// No feature document with this name could be loaded.
    #[error("Feature not found")]
    FeatureNotFound,

    /// The feature has no query with this id.
    #[error("Query not found: {0}")]
    QueryNotFound(String),

    /// The feature has no action with this id.
    #[error("Action not found: {0}")]
    ActionNotFound(String),

    /// A placeholder in the SQL had no corresponding entry in the
    /// caller-supplied parameter map.
    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    /// The request body could not be parsed as a JSON parameter map.
    #[error("invalid request body: {0}")]
    InvalidRequestBody(String),

    /// The database returned an error executing a query or action.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The request was cancelled by the caller before it completed.
    #[error("request cancelled")]
    Cancelled,
}

/// The `{ "error": "<message>" }` envelope every error response carries.
/// No stack traces, SQL text, or parameter values are ever included.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    /// Maps this error to its HTTP status code.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::FeatureNotFound | AppError::QueryNotFound(_) | AppError::ActionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::MissingParameter(_) | AppError::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            AppError::Cancelled | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
