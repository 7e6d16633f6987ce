//! Feature Service façade.
//!
//! Every operation loads the feature fresh from disk: because every
//! request re-parses the XML, feature documents need not be
//! thread-safe, and there is no cross-request cache.

use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::app::{AppError, AppState};
use crate::exec::{action, query};
use crate::feature::{self, Action, Feature, FeatureSummary, Form, Mapping, Query, Table};
use crate::grid::{self, GridColDef};

/// Resolves a feature name to the path of its XML document.
fn feature_path(feature_root: &Path, name: &str) -> PathBuf {
    feature_root.join(format!("{name}.xml"))
}

/// Loads a feature by name, mapping any failure to
/// [`AppError::FeatureNotFound`].
pub fn load_feature(feature_root: &Path, name: &str) -> Result<Feature, AppError> {
    feature::load(&feature_path(feature_root, name)).map_err(|err| {
        tracing::warn!(feature = name, error = %err, "failed to load feature document");
        AppError::FeatureNotFound
    })
}

/// `describe(name)`: counts of queries/actions/forms/tables plus
/// `name`/`version`.
pub fn describe(feature_root: &Path, name: &str) -> Result<FeatureSummary, AppError> {
    Ok(load_feature(feature_root, name)?.describe())
}

/// The response body of `backend(name)`.
#[derive(Serialize)]
pub struct BackendView {
    /// Feature name.
    pub feature: String,
    /// Every declared query, SQL included.
    pub queries: Vec<Query>,
    /// Every declared action, SQL included.
    pub actions: Vec<Action>,
}

/// `backend(name)`: full list of queries and actions, SQL included.
pub fn backend(feature_root: &Path, name: &str) -> Result<BackendView, AppError> {
    let feature = load_feature(feature_root, name)?;
    Ok(BackendView {
        feature: feature.name,
        queries: feature.queries,
        actions: feature.actions,
    })
}

/// The response body of `frontend(name)`.
#[derive(Serialize)]
pub struct FrontendView {
    /// Feature name.
    pub feature: String,
    /// Every declared table.
    pub tables: Vec<Table>,
    /// Every declared form.
    pub forms: Vec<Form>,
}

/// `frontend(name)`: tables and forms.
pub fn frontend(feature_root: &Path, name: &str) -> Result<FrontendView, AppError> {
    let feature = load_feature(feature_root, name)?;
    Ok(FrontendView {
        feature: feature.name,
        tables: feature.tables,
        forms: feature.forms,
    })
}

/// The response body of `executeQuery`.
#[derive(Serialize)]
pub struct QueryResponse {
    /// Feature name.
    pub feature: String,
    /// Query id.
    pub query: String,
    #[serde(rename = "resultCount")]
    /// Number of rows returned.
    pub result_count: usize,
    /// Result rows, in driver order.
    pub results: Vec<feature::Record>,
    #[serde(rename = "mockDataSet")]
    /// The mock fixture path used, or empty if the database was hit.
    pub mock_data_set: String,
    #[serde(rename = "gridColDefs")]
    /// Column descriptors for a grid view of the results.
    pub grid_col_defs: Vec<GridColDef>,
}

/// `executeQuery(name, queryId, params)`.
pub async fn execute_query(
    state: &AppState,
    name: &str,
    query_id: &str,
    params: &Map<String, Value>,
    cancel: &CancellationToken,
) -> Result<QueryResponse, AppError> {
    let feature = load_feature(&state.feature_root, name)?;
    let query = feature
        .query(query_id)
        .ok_or_else(|| AppError::QueryNotFound(query_id.to_string()))?;

    let outcome = query::execute(state, query, params, cancel).await?;

    let observed = grid::observed_columns(&outcome.records);
    let table = feature.table_for_query(query_id);
    let grid_col_defs = grid::project(&feature, table, &observed);

    Ok(QueryResponse {
        feature: feature.name,
        query: query_id.to_string(),
        result_count: outcome.records.len(),
        results: outcome.records,
        mock_data_set: outcome.mock_data_set,
        grid_col_defs,
    })
}

/// The response body of `executeAction`.
#[derive(Serialize)]
pub struct ActionResponse {
    /// Feature name.
    pub feature: String,
    /// Action id.
    pub action: String,
    #[serde(rename = "rowsAffected")]
    /// Rows affected, or `-1` if unsupported by the driver.
    pub rows_affected: i64,
    #[serde(rename = "lastInsertId")]
    /// Last inserted id, or `-1` if unsupported by the driver.
    pub last_insert_id: i64,
    /// Always `true`; an error response is returned instead on failure.
    pub success: bool,
}

/// `executeAction(name, actionId, params)`.
pub async fn execute_action(
    state: &AppState,
    name: &str,
    action_id: &str,
    params: &Map<String, Value>,
    cancel: &CancellationToken,
) -> Result<ActionResponse, AppError> {
    let feature = load_feature(&state.feature_root, name)?;
    let action_def = feature
        .action(action_id)
        .ok_or_else(|| AppError::ActionNotFound(action_id.to_string()))?;

    let outcome = action::execute(state, action_def, params, cancel).await?;

    Ok(ActionResponse {
        feature: feature.name,
        action: action_id.to_string(),
        rows_affected: outcome.rows_affected,
        last_insert_id: outcome.last_insert_id,
        success: true,
    })
}

/// The response body of `resolveMappings`.
#[derive(Serialize)]
pub struct MappingsResponse {
    /// Feature name.
    pub feature: String,
    /// Resolved mapping list.
    pub mappings: Vec<Mapping>,
    /// Number of mappings returned.
    pub count: usize,
}

/// `resolveMappings(name)`: resolved mapping list plus count.
pub async fn resolve_mappings(state: &AppState, name: &str, cancel: &CancellationToken) -> Result<MappingsResponse, AppError> {
    let feature = load_feature(&state.feature_root, name)?;
    let mappings = crate::exec::resolve_all(&feature, state, cancel).await;
    Ok(MappingsResponse {
        feature: feature.name,
        count: mappings.len(),
        mappings,
    })
}

/// The response body of `checksum`.
#[derive(Serialize)]
pub struct ChecksumResponse {
    /// Feature name.
    pub feature: String,
    /// MD5 hex digest of the feature's XML bytes.
    pub checksum: String,
    /// Always `"md5"`.
    pub algorithm: &'static str,
}

/// `checksum(name) → MD5 hex of the underlying XML bytes`.
pub fn checksum(feature_root: &Path, name: &str) -> Result<ChecksumResponse, AppError> {
    let path = feature_path(feature_root, name);
    let bytes = std::fs::read(&path).map_err(|err| {
        tracing::warn!(feature = name, error = %err, "failed to read feature file for checksum");
        AppError::FeatureNotFound
    })?;
    Ok(ChecksumResponse {
        feature: name.to_string(),
        checksum: hex_md5(&bytes),
        algorithm: "md5",
    })
}

/// Computes the MD5 hex digest of `bytes`.
pub fn hex_md5(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Advisory listing of known feature names (`GET /api/v1/x`): walks
/// `feature_root` for `*.xml` files and returns their stems, performing
/// no parsing. Best-effort: not a guarantee every listed name loads
/// cleanly.
pub fn list_features(feature_root: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(feature_root) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some("xml"))
        .filter_map(|entry| entry.path().file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}

/// Walks `feature_root` for `*.xml` files, returning each path (relative
/// to `feature_root`) paired with its MD5 hex digest. Backs
/// `GET /api/v1/checksums`.
pub fn checksums_all(feature_root: &Path) -> std::collections::BTreeMap<String, String> {
    let mut out = std::collections::BTreeMap::new();
    walk_xml_files(feature_root, feature_root, &mut out);
    out
}

fn walk_xml_files(root: &Path, dir: &Path, out: &mut std::collections::BTreeMap<String, String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            walk_xml_files(root, &path, out);
        } else if path.extension().and_then(|e| e.to_str()) == Some("xml") {
            if let Ok(bytes) = std::fs::read(&path) {
                let relative = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().into_owned();
                out.insert(relative, hex_md5(&bytes));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_stable_for_identical_bytes() {
        let bytes = b"<Feature name=\"demo\" version=\"1\"></Feature>";
        assert_eq!(hex_md5(bytes), hex_md5(bytes));
    }

    #[test]
    fn feature_path_appends_xml_extension() {
        let path = feature_path(Path::new("specs/xfeature"), "users");
        assert_eq!(path, PathBuf::from("specs/xfeature/users.xml"));
    }

    #[test]
    fn list_features_is_empty_for_missing_directory() {
        assert!(list_features(Path::new("does/not/exist")).is_empty());
    }

    #[test]
    fn list_features_and_checksums_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("users.xml"), "<Feature name=\"users\" version=\"1\"></Feature>").unwrap();
        std::fs::write(dir.path().join("orders.xml"), "<Feature name=\"orders\" version=\"1\"></Feature>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not xml").unwrap();

        let names = list_features(dir.path());
        assert_eq!(names, vec!["orders".to_string(), "users".to_string()]);

        let sums = checksums_all(dir.path());
        assert_eq!(sums.len(), 2);
        assert!(sums.contains_key("users.xml"));
    }
}
