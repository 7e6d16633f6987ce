//! Mock fixture resolution, loading, and capture.
//!
//! A missing or unreadable fixture is never a hard failure here. The
//! executors decide to fall through to the database and log a warning;
//! this module only classifies why a load failed so the executor's log
//! line can say something useful.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::feature::Record;

/// Why a mock fixture failed to load. Both variants are recoverable:
/// callers fall through to the database rather than failing the request.
#[derive(Debug, thiserror::Error)]
pub enum MockLoadError {
    /// The resolved path does not exist.
    #[error("mock fixture not found at {0}")]
    NotFound(PathBuf),

    /// The file exists but could not be read or parsed as JSON.
    #[error("mock fixture at {path} is unreadable or malformed: {source}")]
    Invalid {
        /// The resolved path.
        path: PathBuf,
        /// The underlying I/O or parse error, stringified.
        source: String,
    },
}

/// The fixture format for an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionFixture {
    /// Rows the mocked action claims to have affected.
    #[serde(rename = "rowsAffected")]
    pub rows_affected: i64,
    /// Last-inserted id the mocked action claims to have produced.
    #[serde(rename = "lastInsertId")]
    pub last_insert_id: i64,
}

/// Loads, resolves, and optionally captures mock fixtures under a
/// configured root directory.
#[derive(Clone, Debug)]
pub struct MockStore {
    mock_root: PathBuf,
    capture: bool,
}

impl MockStore {
    /// Builds a store rooted at `mock_root`. When `capture` is true, a
    /// successful non-empty database query also writes a fixture.
    pub fn new(mock_root: impl Into<PathBuf>, capture: bool) -> Self {
        Self {
            mock_root: mock_root.into(),
            capture,
        }
    }

    /// Whether capture mode is enabled.
    pub fn capture_enabled(&self) -> bool {
        self.capture
    }

    /// Resolves a `mockDataSet` hint to a concrete path: no path
    /// separator means "relative to the mock root", otherwise the hint
    /// is used verbatim.
    pub fn resolve(&self, mock_data_set: &str) -> PathBuf {
        if mock_data_set.contains('/') || mock_data_set.contains('\\') {
            PathBuf::from(mock_data_set)
        } else {
            self.mock_root.join(mock_data_set)
        }
    }

    /// Loads a query fixture: a JSON array of records.
    pub fn load_query_fixture(&self, path: &Path) -> Result<Vec<Record>, MockLoadError> {
        if !path.exists() {
            return Err(MockLoadError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|e| MockLoadError::Invalid {
            path: path.to_path_buf(),
            source: e.to_string(),
        })?;
        let records: Vec<Record> = serde_json::from_str(&text).map_err(|e| MockLoadError::Invalid {
            path: path.to_path_buf(),
            source: e.to_string(),
        })?;
        Ok(records.into_iter().map(coerce_bytes).collect())
    }

    /// Loads an action fixture: `{rowsAffected, lastInsertId}`.
    pub fn load_action_fixture(&self, path: &Path) -> Result<ActionFixture, MockLoadError> {
        if !path.exists() {
            return Err(MockLoadError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|e| MockLoadError::Invalid {
            path: path.to_path_buf(),
            source: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| MockLoadError::Invalid {
            path: path.to_path_buf(),
            source: e.to_string(),
        })
    }

    /// Writes `records` as a fixture for `query_id` if capture mode is
    /// enabled and `records` is non-empty. Capture failures are logged
    /// at `WARN` and never propagated.
    pub fn capture_query(&self, query_id: &str, records: &[Record], timestamp: &str) -> Option<PathBuf> {
        if !self.capture || records.is_empty() {
            return None;
        }
        let file_name = format!("{query_id}_{timestamp}.json");
        let path = self.mock_root.join(file_name);
        match serde_json::to_string_pretty(records) {
            Ok(body) => match std::fs::create_dir_all(&self.mock_root).and_then(|_| std::fs::write(&path, body)) {
                Ok(()) => Some(path),
                Err(err) => {
                    tracing::warn!(query_id, error = %err, "failed to write mock capture fixture");
                    None
                }
            },
            Err(err) => {
                tracing::warn!(query_id, error = %err, "failed to serialize mock capture fixture");
                None
            }
        }
    }
}

/// Coerces array-of-bytes-shaped fields to UTF-8 strings, matching the
/// coercion the live database path performs on raw byte columns, so
/// mock and live results present the same shape to callers.
fn coerce_bytes(mut record: Record) -> Record {
    for value in record.values_mut() {
        if let Value::Array(items) = value {
            let as_bytes: Option<Vec<u8>> = items
                .iter()
                .map(|v| v.as_u64().filter(|n| *n <= 255).map(|n| n as u8))
                .collect();
            if let Some(bytes) = as_bytes {
                *value = Value::String(String::from_utf8_lossy(&bytes).into_owned());
            }
        }
    }
    record
}
