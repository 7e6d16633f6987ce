//! End-to-end tests driven through the full axum router against an
//! in-memory SQLite database.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use xfeature::app::AppState;
use xfeature::db::DbPool;
use xfeature::feature::Dialect;
use xfeature::mock::MockStore;
use xfeature::routes;

async fn test_state(feature_root: &std::path::Path, mock_root: &std::path::Path) -> AppState {
    let db = DbPool::connect(Dialect::Sqlite, "sqlite::memory:").await.unwrap();
    let DbPool::Sqlite(pool) = &db else { unreachable!() };
    sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, username TEXT NOT NULL)")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO users(id, username) VALUES (7, 'jane')")
        .execute(pool)
        .await
        .unwrap();

    AppState {
        db,
        mock: MockStore::new(mock_root.to_path_buf(), false),
        feature_root: feature_root.to_path_buf(),
        shutdown: CancellationToken::new(),
    }
}

fn write_feature(dir: &std::path::Path, name: &str, xml: &str) {
    std::fs::write(dir.join(format!("{name}.xml")), xml).unwrap();
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

const USERS_FEATURE: &str = r#"
    <Feature name="users" version="1.0">
        <Query id="GetByName" type="Select">
            <Sql>SELECT id, username FROM users WHERE username=:u</Sql>
        </Query>
        <Action id="Create" type="Insert">
            <Sql>INSERT INTO users(username) VALUES(:name)</Sql>
        </Action>
        <Mapping name="role" dataType="String" label="Role">
            <ListQuery>SELECT DISTINCT role FROM users ORDER BY role</ListQuery>
        </Mapping>
    </Feature>
"#;

#[tokio::test]
async fn query_returns_matching_row_with_grid_columns() {
    let feature_dir = tempfile::tempdir().unwrap();
    let mock_dir = tempfile::tempdir().unwrap();
    write_feature(feature_dir.path(), "users", USERS_FEATURE);

    let state = test_state(feature_dir.path(), mock_dir.path()).await;
    let app = routes::router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/x/users/queries/GetByName")
        .header("content-type", "application/json")
        .body(Body::from(json!({"u": "jane"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["resultCount"], 1);
    assert_eq!(body["results"][0]["id"], 7);
    assert_eq!(body["results"][0]["username"], "jane");
    let fields: Vec<&str> = body["gridColDefs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["id", "username"]);
}

#[tokio::test]
async fn empty_body_fails_with_missing_parameter() {
    let feature_dir = tempfile::tempdir().unwrap();
    let mock_dir = tempfile::tempdir().unwrap();
    write_feature(feature_dir.path(), "users", USERS_FEATURE);

    let state = test_state(feature_dir.path(), mock_dir.path()).await;
    let app = routes::router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/x/users/queries/GetByName")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "missing required parameter: u");
}

#[tokio::test]
async fn action_inserts_a_row() {
    let feature_dir = tempfile::tempdir().unwrap();
    let mock_dir = tempfile::tempdir().unwrap();
    write_feature(feature_dir.path(), "users", USERS_FEATURE);

    let state = test_state(feature_dir.path(), mock_dir.path()).await;
    let app = routes::router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/x/users/actions/Create")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "alice"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["rowsAffected"], 1);
    assert!(body["lastInsertId"].as_i64().unwrap() >= 1);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn mock_dataset_short_circuits_the_database() {
    let feature_dir = tempfile::tempdir().unwrap();
    let mock_dir = tempfile::tempdir().unwrap();
    let xml = r#"
        <Feature name="users" version="1.0">
            <Query id="GetByName" type="Select">
                <MockDataSet>users_jane.json</MockDataSet>
                <Sql>SELECT id, username FROM users WHERE username=:u</Sql>
            </Query>
        </Feature>
    "#;
    write_feature(feature_dir.path(), "users", xml);
    std::fs::write(
        mock_dir.path().join("users_jane.json"),
        json!([{"id": 7, "username": "jane"}]).to_string(),
    )
    .unwrap();

    let state = test_state(feature_dir.path(), mock_dir.path()).await;
    let expected_path = state.mock.resolve("users_jane.json").to_string_lossy().into_owned();
    let app = routes::router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/x/users/queries/GetByName")
        .header("content-type", "application/json")
        .body(Body::from(json!({"u": "jane"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["mockDataSet"], expected_path);
    assert_eq!(body["results"][0]["username"], "jane");
}

#[tokio::test]
async fn missing_feature_is_404() {
    let feature_dir = tempfile::tempdir().unwrap();
    let mock_dir = tempfile::tempdir().unwrap();

    let state = test_state(feature_dir.path(), mock_dir.path()).await;
    let app = routes::router(state);

    let request = Request::builder().uri("/api/v1/x/ghost").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Feature not found");
}

#[tokio::test]
async fn mapping_resolves_distinct_roles() {
    let feature_dir = tempfile::tempdir().unwrap();
    let mock_dir = tempfile::tempdir().unwrap();
    write_feature(feature_dir.path(), "users", USERS_FEATURE);

    let state = test_state(feature_dir.path(), mock_dir.path()).await;
    let DbPool::Sqlite(pool) = &state.db else { unreachable!() };
    sqlx::query("ALTER TABLE users ADD COLUMN role TEXT").execute(pool).await.unwrap();
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = 7").execute(pool).await.unwrap();
    sqlx::query("INSERT INTO users(username, role) VALUES ('bob', 'user')")
        .execute(pool)
        .await
        .unwrap();

    let app = routes::router(state);
    let request = Request::builder().uri("/api/v1/x/users/mappings").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let options = body["mappings"][0]["options"].as_array().unwrap();
    assert_eq!(options[0]["label"], "admin");
    assert_eq!(options[0]["value"], "admin");
    assert_eq!(options[1]["label"], "user");
}
