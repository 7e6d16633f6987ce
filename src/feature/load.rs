//! Reads a feature XML file from disk and materialises the entity graph
//! in [`crate::feature::model`].
//!
//! Parsing is structural only: every `queryRef`/`actionRef` is taken at
//! face value here and resolved lazily by the façade. Unknown attributes
//! and elements are ignored by `serde`'s default behaviour, which is
//! what lets the schema evolve without a loader change.

use std::path::Path;

use serde::Deserialize;

use super::model::{
    Action, ActionType, Column, Feature, Form, FormButton, FormMessage, FormMode, Mapping, Query,
    Table,
};

/// Failure while reading or parsing a feature document.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read feature file: {0}")]
    Io(#[from] std::io::Error),

    /// The file's contents were not well-formed per the feature schema.
    #[error("failed to parse feature XML: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// A declared query's `type` attribute was not `"Select"`.
    #[error("query {id} has unsupported type {found:?}, expected \"Select\"")]
    InvalidQueryType {
        /// Id of the offending query.
        id: String,
        /// The value actually found.
        found: String,
    },
}

/// Parses a feature document from the file at `path`.
pub fn load(path: &Path) -> Result<Feature, LoadError> {
    let bytes = std::fs::read_to_string(path)?;
    parse(&bytes)
}

/// Parses a feature document from an in-memory XML string. Split out
/// from [`load`] so tests don't need a filesystem fixture.
pub fn parse(xml: &str) -> Result<Feature, LoadError> {
    let wire: XmlFeature = quick_xml::de::from_str(xml)?;
    let feature: Feature = wire.into();
    for query in &feature.queries {
        if query.query_type != "Select" {
            return Err(LoadError::InvalidQueryType {
                id: query.id.clone(),
                found: query.query_type.clone(),
            });
        }
    }
    Ok(feature)
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Feature")]
struct XmlFeature {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@version", default)]
    version: String,
    #[serde(rename = "Query", default)]
    queries: Vec<XmlQuery>,
    #[serde(rename = "Action", default)]
    actions: Vec<XmlAction>,
    #[serde(rename = "Mapping", default)]
    mappings: Vec<XmlMapping>,
    #[serde(rename = "Table", default)]
    tables: Vec<XmlTable>,
    #[serde(rename = "Form", default)]
    forms: Vec<XmlForm>,
}

#[derive(Debug, Deserialize)]
struct XmlQuery {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    query_type: String,
    #[serde(rename = "@description", default)]
    description: Option<String>,
    #[serde(rename = "MockDataSet", default)]
    mock_data_set: Option<String>,
    #[serde(rename = "Sql")]
    sql: String,
}

impl From<XmlQuery> for Query {
    fn from(q: XmlQuery) -> Self {
        Query {
            id: q.id,
            query_type: q.query_type,
            description: q.description,
            mock_data_set: q.mock_data_set.map(|s| s.trim().to_string()),
            sql: q.sql.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct XmlAction {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    action_type: ActionType,
    #[serde(rename = "MockDataSet", default)]
    mock_data_set: Option<String>,
    #[serde(rename = "Sql")]
    sql: String,
}

impl From<XmlAction> for Action {
    fn from(a: XmlAction) -> Self {
        Action {
            id: a.id,
            action_type: a.action_type,
            mock_data_set: a.mock_data_set.map(|s| s.trim().to_string()),
            sql: a.sql.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct XmlMapping {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@dataType")]
    data_type: String,
    #[serde(rename = "@label")]
    label: String,
    #[serde(rename = "ListQuery", default)]
    list_query: Option<String>,
}

impl From<XmlMapping> for Mapping {
    fn from(m: XmlMapping) -> Self {
        let list_query = m.list_query.map(|sql| Query {
            id: format!("{}.ListQuery", m.name),
            query_type: "Select".to_string(),
            description: None,
            mock_data_set: None,
            sql: sql.trim().to_string(),
        });
        Mapping {
            name: m.name,
            data_type: m.data_type,
            label: m.label,
            list_query,
            options: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct XmlColumn {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@label")]
    label: String,
    #[serde(rename = "@type", default)]
    column_type: Option<String>,
    #[serde(rename = "@width", default)]
    width: Option<String>,
    #[serde(rename = "@align", default)]
    align: Option<String>,
    #[serde(rename = "@sortable", default)]
    sortable: Option<bool>,
    #[serde(rename = "@filterable", default)]
    filterable: Option<bool>,
}

impl From<XmlColumn> for Column {
    fn from(c: XmlColumn) -> Self {
        Column {
            name: c.name,
            label: c.label,
            column_type: c.column_type,
            width: c.width,
            align: c.align,
            sortable: c.sortable,
            filterable: c.filterable,
        }
    }
}

#[derive(Debug, Deserialize)]
struct XmlTable {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@queryRef")]
    query_ref: String,
    #[serde(rename = "@title", default)]
    title: Option<String>,
    #[serde(rename = "@pageSize", default)]
    page_size: Option<u32>,
    #[serde(rename = "Column", default)]
    columns: Vec<XmlColumn>,
}

impl From<XmlTable> for Table {
    fn from(t: XmlTable) -> Self {
        Table {
            id: t.id,
            query_ref: t.query_ref,
            title: t.title,
            page_size: t.page_size,
            columns: t.columns.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct XmlButton {
    #[serde(rename = "@label")]
    label: String,
    #[serde(rename = "@action", default)]
    action: Option<String>,
}

impl From<XmlButton> for FormButton {
    fn from(b: XmlButton) -> Self {
        FormButton {
            label: b.label,
            action: b.action,
        }
    }
}

#[derive(Debug, Deserialize)]
struct XmlMessage {
    #[serde(rename = "@type", default)]
    message_type: Option<String>,
    #[serde(rename = "$text")]
    text: String,
}

impl From<XmlMessage> for FormMessage {
    fn from(m: XmlMessage) -> Self {
        FormMessage {
            message_type: m.message_type,
            text: m.text.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct XmlForm {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@mode")]
    mode: FormMode,
    #[serde(rename = "@actionRef", default)]
    action_ref: Option<String>,
    #[serde(rename = "@queryRef", default)]
    query_ref: Option<String>,
    #[serde(rename = "Field", default)]
    fields: Vec<XmlMapping>,
    #[serde(rename = "Button", default)]
    buttons: Vec<XmlButton>,
    #[serde(rename = "Message", default)]
    messages: Vec<XmlMessage>,
}

impl From<XmlForm> for Form {
    fn from(f: XmlForm) -> Self {
        Form {
            id: f.id,
            mode: f.mode,
            action_ref: f.action_ref,
            query_ref: f.query_ref,
            fields: f.fields.into_iter().map(Into::into).collect(),
            buttons: f.buttons.into_iter().map(Into::into).collect(),
            messages: f.messages.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<XmlFeature> for Feature {
    fn from(f: XmlFeature) -> Self {
        Feature {
            name: f.name,
            version: f.version,
            queries: f.queries.into_iter().map(Into::into).collect(),
            actions: f.actions.into_iter().map(Into::into).collect(),
            mappings: f.mappings.into_iter().map(Into::into).collect(),
            tables: f.tables.into_iter().map(Into::into).collect(),
            forms: f.forms.into_iter().map(Into::into).collect(),
        }
    }
}
