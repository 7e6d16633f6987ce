//! In-memory entity graph parsed from a feature XML document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single query result row, with column order preserved as observed
/// while scanning the first row of a result set.
pub type Record = Map<String, Value>;

/// A named bundle of queries, actions, mappings, tables, and forms.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Feature {
    /// Name of the feature, unique per process.
    pub name: String,

    /// Opaque version string.
    #[serde(default)]
    pub version: String,

    /// Parameterised SELECT statements.
    #[serde(default)]
    pub queries: Vec<Query>,

    /// Mutating INSERT/UPDATE/DELETE statements.
    #[serde(default)]
    pub actions: Vec<Action>,

    /// Value-lookup mappings, reused by form fields.
    #[serde(default)]
    pub mappings: Vec<Mapping>,

    /// Grid table definitions.
    #[serde(default)]
    pub tables: Vec<Table>,

    /// Form definitions, relayed to clients verbatim.
    #[serde(default)]
    pub forms: Vec<Form>,
}

impl Feature {
    /// Find a query by id.
    pub fn query(&self, id: &str) -> Option<&Query> {
        self.queries.iter().find(|q| q.id == id)
    }

    /// Find an action by id.
    pub fn action(&self, id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// Find a table by id.
    pub fn table(&self, id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }

    /// Find the table, if any, that targets the given query id.
    pub fn table_for_query(&self, query_id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.query_ref == query_id)
    }

    /// Counts used by `describe`.
    pub fn describe(&self) -> FeatureSummary {
        FeatureSummary {
            name: self.name.clone(),
            version: self.version.clone(),
            query_count: self.queries.len(),
            action_count: self.actions.len(),
            table_count: self.tables.len(),
            form_count: self.forms.len(),
        }
    }
}

/// Lightweight counts returned by the `describe` façade operation.
#[derive(Clone, Debug, Serialize)]
pub struct FeatureSummary {
    /// Feature name.
    pub name: String,
    /// Opaque feature version.
    pub version: String,
    #[serde(rename = "queryCount")]
    /// Number of declared queries.
    pub query_count: usize,
    #[serde(rename = "actionCount")]
    /// Number of declared actions.
    pub action_count: usize,
    #[serde(rename = "tableCount")]
    /// Number of declared tables.
    pub table_count: usize,
    #[serde(rename = "formCount")]
    /// Number of declared forms.
    pub form_count: usize,
}

/// A read-only, parameterised SQL statement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Query {
    /// Identifier, unique within the feature.
    pub id: String,

    /// Must equal `"Select"`; the loader rejects any other value.
    #[serde(rename = "type")]
    pub query_type: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,

    /// Path hint to a mock fixture file.
    #[serde(rename = "mockDataSet", default)]
    pub mock_data_set: Option<String>,

    /// Trimmed SQL text.
    pub sql: String,
}

/// The kind of mutation an [`Action`] performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    /// `INSERT`.
    Insert,
    /// `UPDATE`.
    Update,
    /// `DELETE`.
    Delete,
}

/// A mutating, parameterised SQL statement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Action {
    /// Identifier, unique within the feature.
    pub id: String,

    /// Kind of mutation performed.
    #[serde(rename = "type")]
    pub action_type: ActionType,

    /// Path hint to a mock fixture file.
    #[serde(rename = "mockDataSet", default)]
    pub mock_data_set: Option<String>,

    /// Trimmed SQL text.
    pub sql: String,
}

/// A single resolved option for a [`Mapping`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MappingOption {
    /// Display label.
    pub label: String,
    /// Underlying value.
    pub value: String,
}

/// A declared parameter whose permissible values may be derived from a
/// lookup query.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Mapping {
    /// Name, matching a SQL placeholder.
    pub name: String,

    /// Opaque data-type tag (`String`, `Int`, `Decimal`, `Boolean`, ...).
    #[serde(rename = "dataType")]
    pub data_type: String,

    /// Display label.
    pub label: String,

    /// Lookup query nested inside the mapping, present only before
    /// resolution; cleared once options are attached.
    #[serde(rename = "listQuery", default)]
    pub list_query: Option<Query>,

    /// Resolved options, present only after resolution.
    #[serde(default)]
    pub options: Option<Vec<MappingOption>>,
}

/// One column of a [`Table`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Column {
    /// Result-row key this column projects.
    pub name: String,

    /// Display label.
    pub label: String,

    /// Presentation tag, mapped to an emitted tag by [`crate::grid`].
    #[serde(rename = "type", default)]
    pub column_type: Option<String>,

    /// Raw width, e.g. `"120px"` or `"10%"`; parsed by [`crate::grid`].
    #[serde(default)]
    pub width: Option<String>,

    /// Text alignment hint, relayed verbatim.
    #[serde(default)]
    pub align: Option<String>,

    /// Whether the client should offer sorting on this column.
    #[serde(default)]
    pub sortable: Option<bool>,

    /// Whether the client should offer filtering on this column.
    #[serde(default)]
    pub filterable: Option<bool>,
}

/// A grid/table definition bound to a query by id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Table {
    /// Identifier, unique within the feature.
    pub id: String,

    /// Id of the query this table's rows come from.
    #[serde(rename = "queryRef")]
    pub query_ref: String,

    /// Display title.
    #[serde(default)]
    pub title: Option<String>,

    /// Page size hint, relayed verbatim.
    #[serde(rename = "pageSize", default)]
    pub page_size: Option<u32>,

    /// Columns, in declaration order.
    #[serde(default)]
    pub columns: Vec<Column>,
}

/// The purpose a [`Form`] serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormMode {
    /// Creates a new record.
    Create,
    /// Edits an existing record.
    Edit,
    /// Displays a record read-only.
    View,
    /// Confirms and performs a deletion.
    Delete,
    /// Filters a query.
    Search,
}

/// A client-facing form definition. Carries no server-side behaviour
/// beyond verbatim relay.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Form {
    /// Identifier, unique within the feature.
    pub id: String,

    /// Mode the form operates in.
    pub mode: FormMode,

    /// Id of the action this form submits to, if any.
    #[serde(rename = "actionRef", default)]
    pub action_ref: Option<String>,

    /// Id of the query this form reads from, if any.
    #[serde(rename = "queryRef", default)]
    pub query_ref: Option<String>,

    /// Fields, reusing the mapping shape.
    #[serde(default)]
    pub fields: Vec<Mapping>,

    /// Button labels/actions, relayed verbatim.
    #[serde(default)]
    pub buttons: Vec<FormButton>,

    /// User-facing messages, relayed verbatim.
    #[serde(default)]
    pub messages: Vec<FormMessage>,
}

/// A single button on a [`Form`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormButton {
    /// Display label.
    pub label: String,
    /// Action identifier, e.g. `"submit"`, `"cancel"`.
    #[serde(default)]
    pub action: Option<String>,
}

/// A single user-facing message on a [`Form`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormMessage {
    /// Message kind, e.g. `"success"`, `"error"`.
    #[serde(rename = "type", default)]
    pub message_type: Option<String>,
    /// Message text.
    pub text: String,
}
