//! Schema catalog and table resolution.
//!
//! The catalog is a snapshot of previously discovered schemas. It is built
//! once, validated, and then only read, so a single instance can be shared
//! between threads behind an `Arc` without locking.

use crate::error::{SerializeError, SerializeResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Declared logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    Long,
    /// Single precision float.
    Float,
    /// Double precision float.
    Double,
    /// Fixed-point decimal.
    Decimal,
    /// Text.
    String,
    /// Boolean.
    Boolean,
    /// Bytes.
    Binary,
    /// JSON document.
    Json,
    /// Date without zone.
    NaiveDate,
    /// Datetime normalized to UTC.
    UtcDatetime,
    /// Datetime without zone.
    NaiveDatetime,
}

impl DataType {
    /// Every declared type.
    pub const ALL: [DataType; 12] = [
        DataType::Int,
        DataType::Long,
        DataType::Float,
        DataType::Double,
        DataType::Decimal,
        DataType::String,
        DataType::Boolean,
        DataType::Binary,
        DataType::Json,
        DataType::NaiveDate,
        DataType::UtcDatetime,
        DataType::NaiveDatetime,
    ];

    /// Upper-case name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Int => "INT",
            DataType::Long => "LONG",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::Decimal => "DECIMAL",
            DataType::String => "STRING",
            DataType::Boolean => "BOOLEAN",
            DataType::Binary => "BINARY",
            DataType::Json => "JSON",
            DataType::NaiveDate => "NAIVE_DATE",
            DataType::UtcDatetime => "UTC_DATETIME",
            DataType::NaiveDatetime => "NAIVE_DATETIME",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name, unique within its table.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Whether the column is part of the primary key.
    #[serde(default)]
    pub primary_key: bool,
}

impl ColumnDefinition {
    /// Creates a non-key column.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            primary_key: false,
        }
    }

    /// Creates a primary-key column.
    pub fn key(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            primary_key: true,
        }
    }
}

/// A discovered table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDefinition>,
    /// column name -> position in `columns`
    #[serde(skip)]
    column_index: HashMap<String, usize>,
}

impl TableDefinition {
    /// Creates a table definition.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        let mut table = Self {
            name: name.into(),
            columns,
            column_index: HashMap::new(),
        };
        table.index_columns();
        table
    }

    /// Looks up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        match self.column_index.get(name) {
            Some(&i) => self.columns.get(i).filter(|c| c.name == name),
            // `columns` was edited after indexing.
            None if self.column_index.len() != self.columns.len() => {
                self.columns.iter().find(|c| c.name == name)
            }
            None => None,
        }
    }

    /// Rebuilds the name index and returns the first repeated column name.
    fn index_columns(&mut self) -> Option<String> {
        self.column_index.clear();
        self.column_index.reserve(self.columns.len());
        let mut duplicate = None;
        for (i, column) in self.columns.iter().enumerate() {
            if self.column_index.contains_key(&column.name) {
                duplicate.get_or_insert(i);
            } else {
                self.column_index.insert(column.name.clone(), i);
            }
        }
        duplicate.map(|i| self.columns[i].name.clone())
    }

    /// Primary-key columns in declaration order.
    pub fn primary_keys(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    /// Whether any column is marked as primary key.
    pub fn has_primary_key(&self) -> bool {
        self.columns.iter().any(|c| c.primary_key)
    }
}

impl PartialEq for TableDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.columns == other.columns
    }
}

impl Eq for TableDefinition {}

/// A discovered schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Schema name.
    pub name: String,
    /// Tables in discovery order.
    pub tables: Vec<TableDefinition>,
}

impl SchemaDefinition {
    /// Creates a schema definition.
    pub fn new(name: impl Into<String>, tables: Vec<TableDefinition>) -> Self {
        Self {
            name: name.into(),
            tables,
        }
    }
}

#[derive(Deserialize)]
struct CatalogSnapshot {
    schemas: Vec<SchemaDefinition>,
}

/// Read-only snapshot of every known schema.
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    schemas: Vec<SchemaDefinition>,
    /// schema name -> table name -> (schema index, table index)
    index: HashMap<String, HashMap<String, (usize, usize)>>,
}

impl SchemaCatalog {
    /// Builds a catalog from discovered schemas.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCatalog` if a schema name, a table name within a
    /// schema, or a column name within a table appears twice.
    pub fn new(mut schemas: Vec<SchemaDefinition>) -> SerializeResult<Self> {
        let mut index: HashMap<String, HashMap<String, (usize, usize)>> = HashMap::new();

        for (si, schema) in schemas.iter_mut().enumerate() {
            if index.contains_key(&schema.name) {
                return Err(SerializeError::invalid_catalog(format!(
                    "duplicate schema {}",
                    schema.name
                )));
            }
            let mut tables = HashMap::with_capacity(schema.tables.len());

            for (ti, table) in schema.tables.iter_mut().enumerate() {
                if let Some(column) = table.index_columns() {
                    return Err(SerializeError::invalid_catalog(format!(
                        "duplicate column {} in {}.{}",
                        column, schema.name, table.name
                    )));
                }
                if tables.insert(table.name.clone(), (si, ti)).is_some() {
                    return Err(SerializeError::invalid_catalog(format!(
                        "duplicate table {}.{}",
                        schema.name, table.name
                    )));
                }
            }
            index.insert(schema.name.clone(), tables);
        }

        Ok(Self { schemas, index })
    }

    /// Parses a catalog snapshot of the form `{"schemas": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCatalog` for malformed JSON or a catalog that fails
    /// the checks of [`SchemaCatalog::new`].
    pub fn from_json(json: &str) -> SerializeResult<Self> {
        let snapshot: CatalogSnapshot = serde_json::from_str(json)
            .map_err(|e| SerializeError::invalid_catalog(e.to_string()))?;
        Self::new(snapshot.schemas)
    }

    /// Resolves a table by exact schema and table name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTable` if either name is absent.
    pub fn resolve(&self, schema: &str, table: &str) -> SerializeResult<&TableDefinition> {
        self.index
            .get(schema)
            .and_then(|tables| tables.get(table))
            .map(|&(si, ti)| &self.schemas[si].tables[ti])
            .ok_or_else(|| SerializeError::unknown_table(schema, table))
    }
}
