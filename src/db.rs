//! A dialect-tagged database handle, generalising the teacher's single
//! `PgPool` field in `AppState` to the handful of drivers this engine
//! speaks. The pool is treated as opaque; connection fairness and reuse
//! are left to the driver.

use serde_json::{Map, Value};
use sqlx::{Column, Row, TypeInfo};
use sqlx::{PgPool, SqlitePool};

use crate::feature::{Dialect, Record};

/// A connected database pool together with the dialect it was opened
/// with. Cheaply cloneable, like the teacher's `AppState`.
#[derive(Clone)]
pub enum DbPool {
    /// SQLite backend.
    Sqlite(SqlitePool),
    /// Postgres backend, also used for the `Generic` dialect.
    Postgres(PgPool),
}

impl DbPool {
    /// Connects to `database_url` using the driver implied by `dialect`.
    ///
    /// `Dialect::SqlServer` has no execution backend in this crate and is
    /// rejected here with a clear message rather than attempting a
    /// connection that would never succeed.
    pub async fn connect(dialect: Dialect, database_url: &str) -> Result<Self, sqlx::Error> {
        match dialect {
            Dialect::Sqlite => Ok(DbPool::Sqlite(SqlitePool::connect(database_url).await?)),
            Dialect::Generic => Ok(DbPool::Postgres(PgPool::connect(database_url).await?)),
            Dialect::SqlServer => Err(sqlx::Error::Configuration(
                "sqlserver dialect has no execution backend in this build; only rewrite/bindArgs are implemented".into(),
            )),
        }
    }

    /// The dialect this pool was opened with.
    pub fn dialect(&self) -> Dialect {
        match self {
            DbPool::Sqlite(_) => Dialect::Sqlite,
            DbPool::Postgres(_) => Dialect::Generic,
        }
    }

    /// Pings the database, used by the `/health` endpoint.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        match self {
            DbPool::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
            DbPool::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
        }
        Ok(())
    }

    /// Executes a SELECT and materialises every row as an ordered record.
    /// Column order within each record follows the driver's reported
    /// column order, which is what makes the *first observed* order
    /// authoritative for projection.
    pub async fn fetch_all_records(&self, sql: &str, args: &[Value]) -> Result<Vec<Record>, sqlx::Error> {
        match self {
            DbPool::Sqlite(pool) => {
                let mut q = sqlx::query(sql);
                for arg in args {
                    q = bind_sqlite(q, arg);
                }
                let rows = q.fetch_all(pool).await?;
                Ok(rows.iter().map(sqlite_row_to_record).collect())
            }
            DbPool::Postgres(pool) => {
                let mut q = sqlx::query(sql);
                for arg in args {
                    q = bind_postgres(q, arg);
                }
                let rows = q.fetch_all(pool).await?;
                Ok(rows.iter().map(postgres_row_to_record).collect())
            }
        }
    }

    /// Executes an INSERT/UPDATE/DELETE. Either count may be `-1` when
    /// the driver doesn't supply it.
    pub async fn execute_mutation(&self, sql: &str, args: &[Value]) -> Result<(i64, i64), sqlx::Error> {
        match self {
            DbPool::Sqlite(pool) => {
                let mut q = sqlx::query(sql);
                for arg in args {
                    q = bind_sqlite(q, arg);
                }
                let result = q.execute(pool).await?;
                Ok((result.rows_affected() as i64, result.last_insert_rowid()))
            }
            DbPool::Postgres(pool) => {
                let mut q = sqlx::query(sql);
                for arg in args {
                    q = bind_postgres(q, arg);
                }
                let result = q.execute(pool).await?;
                // Postgres doesn't report a last-inserted id without a RETURNING
                // clause; the feature author must add one if they need it.
                Ok((result.rows_affected() as i64, -1))
            }
        }
    }
}

fn bind_sqlite<'q>(
    q: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    value: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match value {
        Value::Null => q.bind(None::<String>),
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else {
                q.bind(n.as_f64())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        other => q.bind(other.to_string()),
    }
}

fn bind_postgres<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    value: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    match value {
        Value::Null => q.bind(None::<String>),
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else {
                q.bind(n.as_f64())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        other => q.bind(other.to_string()),
    }
}

/// Converts a column value to JSON, coercing raw bytes to a UTF-8 string
/// where possible and falling back to a decimal string for types this
/// engine doesn't special-case.
fn sqlite_row_to_record(row: &sqlx::sqlite::SqliteRow) -> Record {
    let mut record = Map::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = sqlite_column_value(row, idx, column.type_info().name());
        record.insert(column.name().to_string(), value);
    }
    record
}

fn sqlite_column_value(row: &sqlx::sqlite::SqliteRow, idx: usize, type_name: &str) -> Value {
    match type_name {
        "INTEGER" | "BIGINT" | "INT" => row
            .try_get::<Option<i64>, _>(idx)
            .ok()
            .flatten()
            .map(|v| Value::from(v))
            .unwrap_or(Value::Null),
        "REAL" | "FLOAT" | "DOUBLE" => row
            .try_get::<Option<f64>, _>(idx)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        "BOOLEAN" | "BOOL" => row
            .try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<Option<String>, _>(idx)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

fn postgres_row_to_record(row: &sqlx::postgres::PgRow) -> Record {
    let mut record = Map::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = postgres_column_value(row, idx, column.type_info().name());
        record.insert(column.name().to_string(), value);
    }
    record
}

fn postgres_column_value(row: &sqlx::postgres::PgRow, idx: usize, type_name: &str) -> Value {
    match type_name {
        "INT2" | "INT4" | "INT8" => row
            .try_get::<Option<i64>, _>(idx)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        "FLOAT4" | "FLOAT8" | "NUMERIC" => row
            .try_get::<Option<f64>, _>(idx)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        "BOOL" => row
            .try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<Option<String>, _>(idx)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
