//! Schema, table and column selection.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Selection for one schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSelection {
    /// Schema name.
    pub schema_name: String,
    /// Whether the schema is replicated.
    #[serde(default)]
    pub included: bool,
}

impl SchemaSelection {
    /// Creates an included schema selection.
    pub fn included(schema_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            included: true,
        }
    }
}

/// Selection for one table and its columns.
///
/// Columns absent from `columns` are included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSelection {
    /// Table name.
    pub table_name: String,
    /// Whether the table is replicated.
    #[serde(default)]
    pub included: bool,
    /// Per-column inclusion overrides.
    #[serde(default)]
    pub columns: HashMap<String, bool>,
}

impl TableSelection {
    /// Creates an included table selection with no column overrides.
    pub fn included(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            included: true,
            columns: HashMap::new(),
        }
    }

    /// Sets the inclusion flag of a column.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, included: bool) -> Self {
        self.columns.insert(name.into(), included);
        self
    }

    /// Whether `column` should appear in the output.
    ///
    /// Only an explicit `false` excludes a column.
    pub fn is_included(&self, column: &str) -> bool {
        self.columns.get(column).copied().unwrap_or(true)
    }
}
