//! Change operations handed to a sink.

use crate::decoder::from_cbor;
use crate::encoder::to_canonical_cbor;
use crate::error::CodecResult;
use crate::value::Value;
use indexmap::IndexMap;

/// Kind of record operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpType {
    /// Row was inserted or should be written as-is.
    Upsert,
    /// Row was updated.
    Update,
    /// Row was deleted.
    Delete,
    /// Table was truncated.
    Truncate,
}

impl OpType {
    /// Converts to a numeric code for CBOR encoding.
    pub fn to_code(self) -> u8 {
        match self {
            OpType::Upsert => 1,
            OpType::Update => 2,
            OpType::Delete => 3,
            OpType::Truncate => 4,
        }
    }

    /// Converts from a numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(OpType::Upsert),
            2 => Some(OpType::Update),
            3 => Some(OpType::Delete),
            4 => Some(OpType::Truncate),
            _ => None,
        }
    }

    /// Upper-case name of the operation.
    pub fn as_str(self) -> &'static str {
        match self {
            OpType::Upsert => "UPSERT",
            OpType::Update => "UPDATE",
            OpType::Delete => "DELETE",
            OpType::Truncate => "TRUNCATE",
        }
    }
}

/// Ordered mapping from column name to value.
///
/// Columns keep the order in which they were inserted, which for serialized
/// rows is the order of the source row's fields. Names are unique. Equality
/// compares order as well as contents.
#[derive(Debug, Clone, Default)]
pub struct RecordData {
    columns: IndexMap<String, Value>,
}

impl RecordData {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty mapping with room for `capacity` columns.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: IndexMap::with_capacity(capacity),
        }
    }

    /// Sets the value of a column, replacing any previous value in place.
    ///
    /// Returns the replaced value, if any.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.columns.insert(name.into(), value)
    }

    /// Looks up a column by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.get(name)
    }

    /// Whether the mapping has an entry for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterates columns in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Column names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

impl PartialEq for RecordData {
    fn eq(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len() && self.columns.iter().eq(other.columns.iter())
    }
}

impl FromIterator<(String, Value)> for RecordData {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut data = RecordData::with_capacity(iter.size_hint().0);
        for (name, value) in iter {
            data.insert(name, value);
        }
        data
    }
}

/// A record-level change for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Operation kind.
    pub op_type: OpType,
    /// Schema the table belongs to.
    pub schema_name: String,
    /// Table name.
    pub table_name: String,
    /// Column values; `None` for truncates.
    pub data: Option<RecordData>,
}

impl Record {
    /// Creates an upsert record.
    pub fn upsert(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        data: RecordData,
    ) -> Self {
        Self::with_data(OpType::Upsert, schema_name, table_name, data)
    }

    /// Creates an update record.
    pub fn update(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        data: RecordData,
    ) -> Self {
        Self::with_data(OpType::Update, schema_name, table_name, data)
    }

    /// Creates a delete record.
    pub fn delete(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        data: RecordData,
    ) -> Self {
        Self::with_data(OpType::Delete, schema_name, table_name, data)
    }

    /// Creates a truncate record, which never carries data.
    pub fn truncate(schema_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            op_type: OpType::Truncate,
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            data: None,
        }
    }

    fn with_data(
        op_type: OpType,
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        data: RecordData,
    ) -> Self {
        Self {
            op_type,
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            data: Some(data),
        }
    }
}

/// The unit handed to a sink.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// A record-level change.
    Record(Record),
}

impl Operation {
    /// Returns the record carried by this operation.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Operation::Record(record) => Some(record),
        }
    }

    /// Returns the operation kind.
    pub fn op_type(&self) -> OpType {
        match self {
            Operation::Record(record) => record.op_type,
        }
    }

    /// Encodes to canonical CBOR bytes.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        to_canonical_cbor(self)
    }

    /// Decodes from canonical CBOR bytes.
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        from_cbor(bytes)
    }
}

impl From<Record> for Operation {
    fn from(record: Record) -> Self {
        Operation::Record(record)
    }
}
