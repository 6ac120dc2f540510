//! # rowcast codec
//!
//! Typed change operations and their canonical CBOR encoding.
//!
//! This crate provides:
//! - [`Value`], the typed column value model
//! - [`Operation`] / [`Record`], the envelope handed to replication sinks
//! - Deterministic CBOR encoding and validating decoding of operations
//!
//! ## Wire format
//!
//! - An operation is a map with keys `type`, `schema`, `table` and, for
//!   row-bearing records, `data`
//! - `data` is an array of `[name, value]` pairs in column order, with
//!   unique names
//! - NULL is a bare CBOR null, every other value a `[kind, payload]` pair
//! - Envelope keys are sorted (length-first, then bytewise)
//! - Integers use shortest encoding; no indefinite lengths, no NaN
//!
//! ## Usage
//!
//! ```
//! use rowcast_codec::{Operation, Record, RecordData, Value};
//!
//! let mut data = RecordData::new();
//! data.insert("id", Value::Int(42));
//! let op = Operation::Record(Record::upsert("shop", "orders", data));
//!
//! let bytes = op.encode().unwrap();
//! assert_eq!(Operation::decode(&bytes).unwrap(), op);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod operation;
mod value;

pub use decoder::{from_cbor, CanonicalDecoder};
pub use encoder::{to_canonical_cbor, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use operation::{OpType, Operation, Record, RecordData};
pub use value::{Timestamp, Value, ValueKind};
