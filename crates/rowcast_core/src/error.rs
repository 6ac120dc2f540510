//! Error types for the record serializer.

use crate::catalog::DataType;
use crate::wire::WireType;
use thiserror::Error;

/// Result type for serializer operations.
pub type SerializeResult<T> = Result<T, SerializeError>;

/// Errors that abort a single serializer call.
///
/// Nothing is sent to the sink when a call fails.
#[derive(Debug, Error)]
pub enum SerializeError {
    /// The table is not in the schema catalog.
    ///
    /// The catalog is stale; schema discovery must run again before retrying.
    #[error("table {schema}.{table} not found in schema catalog")]
    UnknownTable {
        /// Schema name that was looked up.
        schema: String,
        /// Table name that was looked up.
        table: String,
    },

    /// A column value could not be decoded under its wire type.
    #[error("cannot convert column {column} ({wire_type} -> {declared_type}): {message}")]
    Conversion {
        /// Column whose value failed.
        column: String,
        /// Wire type reported by the driver.
        wire_type: WireType,
        /// Declared type from the catalog.
        declared_type: DataType,
        /// Description of the failure.
        message: String,
    },

    /// The driver reported a wire type the serializer cannot handle.
    #[error("unsupported wire type {code} for column {column}")]
    UnsupportedWireType {
        /// Column carrying the type.
        column: String,
        /// Raw wire type code.
        code: u32,
    },

    /// The row does not fit the resolved table definition.
    #[error("row shape mismatch: {message}")]
    ShapeMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// The schema catalog violates an invariant.
    #[error("invalid schema catalog: {message}")]
    InvalidCatalog {
        /// Description of the violation.
        message: String,
    },

    /// The sink rejected the operation.
    #[error("sink error: {message}")]
    Sink {
        /// Description of the failure.
        message: String,
    },

    /// Encoding the operation failed.
    #[error("codec error: {0}")]
    Codec(#[from] rowcast_codec::CodecError),
}

impl SerializeError {
    /// Creates an unknown table error.
    pub fn unknown_table(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self::UnknownTable {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Creates a conversion error.
    pub fn conversion(
        column: impl Into<String>,
        wire_type: WireType,
        declared_type: DataType,
        message: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            column: column.into(),
            wire_type,
            declared_type,
            message: message.into(),
        }
    }

    /// Creates a shape mismatch error.
    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            message: message.into(),
        }
    }

    /// Creates an invalid catalog error.
    pub fn invalid_catalog(message: impl Into<String>) -> Self {
        Self::InvalidCatalog {
            message: message.into(),
        }
    }

    /// Creates a sink error.
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }

    /// Whether retrying the same call can succeed without outside changes.
    ///
    /// Only sink failures qualify; everything else depends on the input or
    /// the catalog.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Sink { .. })
    }
}
