//! Named-parameter extraction and dialect-specific SQL rewriting.
//!
//! This is the engine's narrow waist: every other component depends on
//! [`Dialect`] only through [`rewrite`] and [`bind_args`]. Adding a
//! dialect means adding one match arm to each.

use serde_json::Value;

/// A database dialect, controlling placeholder rewriting and argument
/// binding order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// SQLite; `:name` placeholders are left unchanged.
    Sqlite,
    /// SQL Server; `:name` placeholders are rewritten to `@name`.
    SqlServer,
    /// Any other driver assumed to support named `:name` parameters
    /// directly (e.g. Postgres via a named-parameter shim).
    Generic,
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            "postgres" | "postgresql" | "generic" => Ok(Dialect::Generic),
            other => Err(format!("unknown dialect: {other}")),
        }
    }
}

/// Returns true if `c` may start a placeholder identifier.
fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Returns true if `c` may continue a placeholder identifier.
fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Extracts every `:identifier` placeholder from `sql`, in first-appearance
/// order, with duplicates removed.
pub fn extract(sql: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut names = Vec::new();
    for name in scan_placeholders(sql, ':') {
        if seen.insert(name.clone()) {
            names.push(name);
        }
    }
    names
}

/// Scans `sql` for `marker` followed by an identifier, returning each
/// occurrence in document order (duplicates included).
fn scan_placeholders(sql: &str, marker: char) -> Vec<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut occurrences = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == marker && i + 1 < chars.len() && is_ident_start(chars[i + 1]) {
            let start = i + 1;
            let mut end = start;
            while end < chars.len() && is_ident_continue(chars[end]) {
                end += 1;
            }
            occurrences.push(chars[start..end].iter().collect());
            i = end;
        } else {
            i += 1;
        }
    }
    occurrences
}

/// Rewrites `sql` for `dialect`.
pub fn rewrite(sql: &str, dialect: Dialect) -> String {
    match dialect {
        Dialect::Sqlite | Dialect::Generic => sql.to_string(),
        Dialect::SqlServer => {
            let chars: Vec<char> = sql.chars().collect();
            let mut out = String::with_capacity(sql.len());
            let mut i = 0;
            while i < chars.len() {
                if chars[i] == ':' && i + 1 < chars.len() && is_ident_start(chars[i + 1]) {
                    out.push('@');
                    i += 1;
                } else {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            out
        }
    }
}

/// The final SQL text together with a positional argument list, ready to
/// be bound to a driver statement.
pub struct Bound {
    /// SQL text, unchanged by binding (binding only determines argument
    /// order; placeholders themselves stay in place for drivers that
    /// accept named markers).
    pub sql: String,
    /// Positional argument values, one per placeholder occurrence scanned
    /// in document order.
    pub args: Vec<Value>,
}

/// Scans `adapted_sql` (already rewritten for `dialect`) for each
/// placeholder occurrence and produces a positional argument list in
/// document order.
///
/// The SQL Server path binds one argument per placeholder *occurrence*,
/// including repeats, while the SQLite/generic path binds one argument
/// per *distinct name*, first occurrence only. Callers targeting a
/// driver that needs one argument per occurrence regardless of dialect
/// should prefer [`bind_args_per_occurrence`].
pub fn bind_args(adapted_sql: &str, dialect: Dialect, supplied: &serde_json::Map<String, Value>) -> Bound {
    match dialect {
        Dialect::SqlServer => {
            let names = scan_placeholders(adapted_sql, '@');
            let args = names
                .iter()
                .map(|n| supplied.get(n).cloned().unwrap_or(Value::Null))
                .collect();
            Bound {
                sql: adapted_sql.to_string(),
                args,
            }
        }
        Dialect::Sqlite | Dialect::Generic => {
            let names = extract(adapted_sql);
            let args = names
                .iter()
                .map(|n| supplied.get(n).cloned().unwrap_or(Value::Null))
                .collect();
            Bound {
                sql: adapted_sql.to_string(),
                args,
            }
        }
    }
}

/// Binds one argument per placeholder occurrence regardless of dialect.
/// Used internally by the executors once a query has passed
/// missing-parameter validation.
pub fn bind_args_per_occurrence(
    adapted_sql: &str,
    dialect: Dialect,
    supplied: &serde_json::Map<String, Value>,
) -> Bound {
    let marker = match dialect {
        Dialect::SqlServer => '@',
        Dialect::Sqlite | Dialect::Generic => ':',
    };
    let names = scan_placeholders(adapted_sql, marker);
    let args = names
        .iter()
        .map(|n| supplied.get(n).cloned().unwrap_or(Value::Null))
        .collect();
    Bound {
        sql: adapted_sql.to_string(),
        args,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_dedupes_preserving_first_appearance() {
        assert_eq!(extract("SELECT 1 WHERE id=:a AND b=:a"), vec!["a"]);
        assert_eq!(extract("WHERE :a AND :b AND :a"), vec!["a", "b"]);
    }

    #[test]
    fn rewrite_sqlite_is_idempotent() {
        let sql = "SELECT * FROM t WHERE id=:a";
        assert_eq!(rewrite(sql, Dialect::Sqlite), sql);
        assert_eq!(rewrite(&rewrite(sql, Dialect::Sqlite), Dialect::Sqlite), sql);
    }

    #[test]
    fn rewrite_sqlserver_replaces_every_placeholder_and_spares_existing_at_names() {
        let sql = "SELECT * FROM t WHERE id=:a AND other=@already";
        let rewritten = rewrite(sql, Dialect::SqlServer);
        assert_eq!(rewritten, "SELECT * FROM t WHERE id=@a AND other=@already");
    }

    #[test]
    fn bind_args_per_occurrence_repeats_sqlserver_arguments() {
        let sql = "WHERE id=@a AND other=@a";
        let supplied = serde_json::Map::from_iter([("a".to_string(), json!(7))]);
        let bound = bind_args_per_occurrence(sql, Dialect::SqlServer, &supplied);
        assert_eq!(bound.args, vec![json!(7), json!(7)]);
    }

    #[test]
    fn bind_args_sqlite_path_binds_once_per_distinct_name() {
        let sql = "WHERE id=:a AND other=:a";
        let supplied = serde_json::Map::from_iter([("a".to_string(), json!(7))]);
        let bound = bind_args(sql, Dialect::Sqlite, &supplied);
        assert_eq!(bound.args, vec![json!(7)]);
    }
}
