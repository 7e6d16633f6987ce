//! Mapping Resolver.

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::app::AppState;
use crate::feature::{params, Feature, Mapping, MappingOption, Query};

/// Why a mapping's lookup query did not produce options.
#[derive(Debug, thiserror::Error)]
enum ResolveError {
    #[error("cancelled")]
    Cancelled,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Resolves every mapping in `feature` against `state`'s database,
/// replacing each `listQuery` with the option list it produces.
///
/// A single mapping's resolution failure never aborts the batch: it is
/// logged at `WARN` and that mapping is returned unchanged. A cancelled
/// `cancel` token is treated the same way.
pub async fn resolve_all(feature: &Feature, state: &AppState, cancel: &CancellationToken) -> Vec<Mapping> {
    let mut resolved = Vec::with_capacity(feature.mappings.len());
    for mapping in &feature.mappings {
        resolved.push(resolve_one(mapping, state, cancel).await);
    }
    resolved
}

async fn resolve_one(mapping: &Mapping, state: &AppState, cancel: &CancellationToken) -> Mapping {
    let Some(list_query) = &mapping.list_query else {
        return mapping.clone();
    };

    match run_list_query(state, list_query, cancel).await {
        Ok(options) => Mapping {
            options: Some(options),
            list_query: None,
            ..mapping.clone()
        },
        Err(err) => {
            tracing::warn!(mapping = %mapping.name, error = %err, "failed to resolve mapping options, leaving mapping unresolved");
            mapping.clone()
        }
    }
}

async fn run_list_query(
    state: &AppState,
    list_query: &Query,
    cancel: &CancellationToken,
) -> Result<Vec<MappingOption>, ResolveError> {
    let dialect = state.db.dialect();
    let adapted = params::rewrite(&list_query.sql, dialect);
    let records = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(ResolveError::Cancelled),
        result = state.db.fetch_all_records(&adapted, &[]) => result?,
    };

    Ok(records
        .into_iter()
        .filter_map(|record| {
            record.values().find(|v| !v.is_null()).map(|value| {
                let text = scalar_to_string(value);
                MappingOption {
                    label: text.clone(),
                    value: text,
                }
            })
        })
        .collect())
}

/// Renders a JSON scalar as a plain string, without the surrounding
/// quotes `Value::to_string()` would add for strings.
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppState;
    use crate::db::DbPool;
    use crate::feature::{Dialect, Feature};
    use crate::mock::MockStore;
    use std::path::PathBuf;

    async fn sqlite_state_with_roles() -> AppState {
        let db = DbPool::connect(Dialect::Sqlite, "sqlite::memory:").await.unwrap();
        let DbPool::Sqlite(pool) = &db else { unreachable!() };
        sqlx::query("CREATE TABLE users (role TEXT)").execute(pool).await.unwrap();
        sqlx::query("INSERT INTO users(role) VALUES ('admin'), ('user')")
            .execute(pool)
            .await
            .unwrap();
        AppState {
            db,
            mock: MockStore::new(PathBuf::from("specs/mock"), false),
            feature_root: PathBuf::from("specs/xfeature"),
            shutdown: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn resolves_options_from_distinct_role_query() {
        let state = sqlite_state_with_roles().await;
        let feature = Feature {
            name: "users".into(),
            version: "1".into(),
            queries: vec![],
            actions: vec![],
            mappings: vec![Mapping {
                name: "role".into(),
                data_type: "String".into(),
                label: "Role".into(),
                list_query: Some(Query {
                    id: "role.ListQuery".into(),
                    query_type: "Select".into(),
                    description: None,
                    mock_data_set: None,
                    sql: "SELECT DISTINCT role FROM users ORDER BY role".into(),
                }),
                options: None,
            }],
            tables: vec![],
            forms: vec![],
        };

        let resolved = resolve_all(&feature, &state, &CancellationToken::new()).await;
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].list_query.is_none());
        let options = resolved[0].options.as_ref().unwrap();
        assert_eq!(
            options,
            &vec![
                MappingOption { label: "admin".into(), value: "admin".into() },
                MappingOption { label: "user".into(), value: "user".into() },
            ]
        );
    }

    #[tokio::test]
    async fn leaves_mapping_untouched_when_no_list_query() {
        let state = sqlite_state_with_roles().await;
        let mapping = Mapping {
            name: "plain".into(),
            data_type: "String".into(),
            label: "Plain".into(),
            list_query: None,
            options: None,
        };
        let resolved = resolve_one(&mapping, &state, &CancellationToken::new()).await;
        assert!(resolved.options.is_none());
    }

    #[tokio::test]
    async fn cancelled_token_leaves_mapping_unresolved_rather_than_failing() {
        let state = sqlite_state_with_roles().await;
        let mapping = Mapping {
            name: "role".into(),
            data_type: "String".into(),
            label: "Role".into(),
            list_query: Some(Query {
                id: "role.ListQuery".into(),
                query_type: "Select".into(),
                description: None,
                mock_data_set: None,
                sql: "SELECT DISTINCT role FROM users ORDER BY role".into(),
            }),
            options: None,
        };
        let token = CancellationToken::new();
        token.cancel();
        let resolved = resolve_one(&mapping, &state, &token).await;
        assert!(resolved.options.is_none());
        assert!(resolved.list_query.is_some());
    }
}
