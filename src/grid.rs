//! Grid column projection and the presentation-type map.

use serde::Serialize;

use crate::feature::{Feature, Record, Table};

/// A single client-facing column descriptor.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GridColDef {
    /// Result-row key this column reads.
    pub field: String,
    /// Display header.
    #[serde(rename = "headerName")]
    pub header_name: String,
    /// Column width in pixels.
    pub width: i32,
    /// Whether the client should offer sorting.
    pub sortable: bool,
    /// Text alignment hint, when the source specified one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
    /// Presentation tag.
    #[serde(rename = "type")]
    pub col_type: String,
}

/// Parses a width string: strips a trailing `px` or `%`, parses the
/// remainder as an integer, and falls back to `150` on any failure.
pub fn parse_width(width: &str) -> i32 {
    let trimmed = width
        .strip_suffix("px")
        .or_else(|| width.strip_suffix('%'))
        .unwrap_or(width);
    trimmed.trim().parse().unwrap_or(150)
}

/// Maps a source presentation tag to the tag the client understands,
/// case-insensitively.
pub fn presentation_type(source: &str) -> &'static str {
    match source.to_ascii_lowercase().as_str() {
        "number" | "currency" | "percentage" => "number",
        "date" => "date",
        "datetime" => "dateTime",
        "boolean" => "boolean",
        "text" | "string" | "email" | "phone" | "url" | "link" | "badge" | "image" => "string",
        _ => "string",
    }
}

/// Builds the grid column descriptor sequence for a query response,
/// given the feature (for its table/mapping metadata) and the actual
/// columns observed in the first result row, in observed order.
pub fn project(feature: &Feature, table: Option<&Table>, result_columns: &[String]) -> Vec<GridColDef> {
    let mut defs = Vec::new();
    let mut processed = std::collections::HashSet::new();

    if let Some(table) = table {
        for column in &table.columns {
            if !result_columns.iter().any(|c| c == &column.name) {
                continue;
            }
            let width = column.width.as_deref().map(parse_width).unwrap_or(150);
            let col_type = column
                .column_type
                .as_deref()
                .map(presentation_type)
                .unwrap_or("string")
                .to_string();
            defs.push(GridColDef {
                field: column.name.clone(),
                header_name: column.label.clone(),
                width,
                sortable: column.sortable.unwrap_or(true),
                align: column.align.clone(),
                col_type,
            });
            processed.insert(column.name.clone());
        }
    } else {
        for mapping in &feature.mappings {
            if !result_columns.iter().any(|c| c == &mapping.name) {
                continue;
            }
            defs.push(GridColDef {
                field: mapping.name.clone(),
                header_name: mapping.label.clone(),
                width: 150,
                sortable: true,
                align: None,
                col_type: "string".to_string(),
            });
            processed.insert(mapping.name.clone());
        }
    }

    for column_name in result_columns {
        if processed.contains(column_name) {
            continue;
        }
        let header_name = feature
            .mappings
            .iter()
            .find(|m| &m.name == column_name)
            .map(|m| m.label.clone())
            .unwrap_or_else(|| column_name.clone());
        defs.push(GridColDef {
            field: column_name.clone(),
            header_name,
            width: 150,
            sortable: true,
            align: None,
            col_type: "string".to_string(),
        });
    }

    defs
}

/// Extracts column names in first-row-observed order from a record
/// sequence. Returns an empty vector if `records` is empty (there is
/// nothing to project).
pub fn observed_columns(records: &[Record]) -> Vec<String> {
    records
        .first()
        .map(|r| r.keys().cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Column, Mapping};

    fn feature_with(table: Option<Table>, mappings: Vec<Mapping>) -> (Feature, Option<Table>) {
        let feature = Feature {
            name: "demo".into(),
            version: "1".into(),
            queries: vec![],
            actions: vec![],
            mappings,
            tables: table.clone().into_iter().collect(),
            forms: vec![],
        };
        (feature, table)
    }

    #[test]
    fn width_parsing_strips_px_and_percent_suffixes() {
        assert_eq!(parse_width("200px"), 200);
        assert_eq!(parse_width("50%"), 50);
        assert_eq!(parse_width("abc"), 150);
        assert_eq!(parse_width(""), 150);
    }

    #[test]
    fn presentation_type_map_matches_table() {
        assert_eq!(presentation_type("Number"), "number");
        assert_eq!(presentation_type("CURRENCY"), "number");
        assert_eq!(presentation_type("date"), "date");
        assert_eq!(presentation_type("datetime"), "dateTime");
        assert_eq!(presentation_type("boolean"), "boolean");
        assert_eq!(presentation_type("email"), "string");
        assert_eq!(presentation_type("whatever-else"), "string");
    }

    #[test]
    fn projection_layers_table_columns_over_mappings() {
        let table = Table {
            id: "T".into(),
            query_ref: "Q".into(),
            title: None,
            page_size: None,
            columns: vec![
                Column {
                    name: "a".into(),
                    label: "A".into(),
                    column_type: None,
                    width: None,
                    align: None,
                    sortable: None,
                    filterable: None,
                },
                Column {
                    name: "b".into(),
                    label: "B".into(),
                    column_type: None,
                    width: None,
                    align: None,
                    sortable: None,
                    filterable: None,
                },
            ],
        };
        let mapping = Mapping {
            name: "c".into(),
            data_type: "String".into(),
            label: "C".into(),
            list_query: None,
            options: None,
        };
        let (feature, table) = feature_with(Some(table), vec![mapping]);

        let result_columns = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let defs = project(&feature, table.as_ref(), &result_columns);

        let fields: Vec<&str> = defs.iter().map(|d| d.field.as_str()).collect();
        let headers: Vec<&str> = defs.iter().map(|d| d.header_name.as_str()).collect();
        assert_eq!(fields, vec!["a", "b", "c"]);
        assert_eq!(headers, vec!["A", "B", "C"]);
    }

    #[test]
    fn falls_back_to_mappings_when_no_table_is_defined() {
        let mapping = Mapping {
            name: "role".into(),
            data_type: "String".into(),
            label: "Role".into(),
            list_query: None,
            options: None,
        };
        let (feature, table) = feature_with(None, vec![mapping]);
        let defs = project(&feature, table.as_ref(), &["role".to_string(), "extra".to_string()]);
        assert_eq!(defs[0].field, "role");
        assert_eq!(defs[0].header_name, "Role");
        assert_eq!(defs[1].field, "extra");
        assert_eq!(defs[1].header_name, "extra");
    }
}
