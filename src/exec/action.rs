//! Action Executor.

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::app::{AppError, AppState};
use crate::feature::{params, Action};

/// Outcome of executing an action.
pub struct ActionOutcome {
    /// Rows affected, or `-1` if the driver didn't report a count.
    pub rows_affected: i64,
    /// Last inserted id, or `-1` if the driver didn't report one.
    pub last_insert_id: i64,
}

/// Substrings that mark a parameter key as secret-bearing, matched
/// case-insensitively.
const SECRET_MARKERS: &[&str] = &["password", "token", "secret", "api_key", "password_hash"];

/// Redacts any parameter whose key contains one of [`SECRET_MARKERS`],
/// for use in log lines. Never called on data that reaches a client.
pub fn redact_for_logging(params: &Map<String, Value>) -> Map<String, Value> {
    params
        .iter()
        .map(|(key, value)| {
            let lower = key.to_ascii_lowercase();
            if SECRET_MARKERS.iter().any(|marker| lower.contains(marker)) {
                (key.clone(), Value::String("***REDACTED***".to_string()))
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}

/// Executes `action` against `state`: tries a mock fixture first,
/// validates parameters, then runs the mutation. The database call
/// honours `cancel`, the same as the query executor.
pub async fn execute(
    state: &AppState,
    action: &Action,
    params: &Map<String, Value>,
    cancel: &CancellationToken,
) -> Result<ActionOutcome, AppError> {
    if let Some(mock_data_set) = &action.mock_data_set {
        let path = state.mock.resolve(mock_data_set);
        match state.mock.load_action_fixture(&path) {
            Ok(fixture) => {
                return Ok(ActionOutcome {
                    rows_affected: fixture.rows_affected,
                    last_insert_id: fixture.last_insert_id,
                });
            }
            Err(err) => {
                tracing::warn!(action_id = %action.id, path = %path.display(), error = %err, "mock fixture unavailable, falling through to database");
            }
        }
    }

    let expected = params::extract(&action.sql);
    for name in &expected {
        if !params.contains_key(name) {
            return Err(AppError::MissingParameter(name.clone()));
        }
    }

    tracing::info!(
        action_id = %action.id,
        params = ?redact_for_logging(params),
        "executing action"
    );

    let dialect = state.db.dialect();
    let adapted = params::rewrite(&action.sql, dialect);
    let bound = params::bind_args_per_occurrence(&adapted, dialect, params);

    let (rows_affected, last_insert_id) = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(AppError::Cancelled),
        result = state.db.execute_mutation(&bound.sql, &bound.args) => result?,
    };

    Ok(ActionOutcome {
        rows_affected,
        last_insert_id,
    })
}
