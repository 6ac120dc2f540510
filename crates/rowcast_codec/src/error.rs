//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// NaN has no canonical encoding.
    #[error("NaN values are forbidden")]
    NaNForbidden,

    /// Indefinite-length items are forbidden.
    #[error("indefinite-length items are forbidden")]
    IndefiniteLengthForbidden,

    /// Invalid UTF-8 string.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// Unexpected end of input.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Invalid CBOR structure.
    #[error("invalid CBOR structure: {message}")]
    InvalidStructure {
        /// Description of the structural error.
        message: String,
    },

    /// Unknown operation or value tag.
    #[error("unknown {what} code {code}")]
    UnknownCode {
        /// What kind of code was being decoded.
        what: &'static str,
        /// The offending code.
        code: i64,
    },

    /// A record names the same column twice.
    #[error("duplicate column {name:?}")]
    DuplicateColumn {
        /// The repeated column name.
        name: String,
    },

    /// Integer does not fit the target width.
    #[error("integer overflow")]
    IntegerOverflow,

    /// A length prefix claims more than the decoder accepts.
    #[error("size limit exceeded: claimed {claimed}, max {max_allowed}")]
    SizeLimitExceeded {
        /// Length announced by the input.
        claimed: u64,
        /// Maximum accepted length.
        max_allowed: u64,
    },
}

impl CodecError {
    /// Create an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }
}
