//! Query Executor.

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::app::{AppError, AppState};
use crate::feature::{params, Query, Record};

/// Outcome of executing a query: the ordered records and the mock
/// fixture path actually used (empty if the database was hit).
pub struct QueryOutcome {
    /// The result rows.
    pub records: Vec<Record>,
    /// The resolved mock fixture path, or empty when the database was
    /// used.
    pub mock_data_set: String,
}

/// Executes `query` against `state`: tries a mock fixture first,
/// validates parameters, then runs the query. The database call honours
/// `cancel`; a cancellation wins the race without attempting mock
/// capture.
pub async fn execute(
    state: &AppState,
    query: &Query,
    params: &Map<String, Value>,
    cancel: &CancellationToken,
) -> Result<QueryOutcome, AppError> {
    if let Some(mock_data_set) = &query.mock_data_set {
        let path = state.mock.resolve(mock_data_set);
        match state.mock.load_query_fixture(&path) {
            Ok(records) => {
                return Ok(QueryOutcome {
                    records,
                    mock_data_set: path.to_string_lossy().into_owned(),
                });
            }
            Err(err) => {
                tracing::warn!(query_id = %query.id, path = %path.display(), error = %err, "mock fixture unavailable, falling through to database");
            }
        }
    }

    let expected = params::extract(&query.sql);
    for name in &expected {
        if !params.contains_key(name) {
            return Err(AppError::MissingParameter(name.clone()));
        }
    }

    let dialect = state.db.dialect();
    let adapted = params::rewrite(&query.sql, dialect);
    let bound = params::bind_args_per_occurrence(&adapted, dialect, params);

    let records = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(AppError::Cancelled),
        result = state.db.fetch_all_records(&bound.sql, &bound.args) => result?,
    };

    if state.mock.capture_enabled() && !records.is_empty() {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        state.mock.capture_query(&query.id, &records, &timestamp);
    }

    Ok(QueryOutcome {
        records,
        mock_data_set: String::new(),
    })
}
