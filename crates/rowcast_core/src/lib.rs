//! # rowcast core
//!
//! Schema-aware serialization of captured row changes.
//!
//! This crate provides:
//! - The raw row model reported by the database driver
//! - A read-only schema catalog with exact-name table resolution
//! - Per-column selection
//! - Conversion of raw values to typed [`Value`]s
//! - The [`RecordSerializer`], which turns inserts, updates, deletes and
//!   truncates into [`Operation`]s for an [`OperationSink`]
//!
//! ## Key Invariants
//!
//! - One successful call emits exactly one operation
//! - A failed call emits nothing
//! - Delete records carry only the selected primary-key columns
//! - A column is dropped only when the selection explicitly excludes it
//! - NULL stays NULL whatever the declared type
//!
//! ## Usage
//!
//! ```
//! use rowcast_core::*;
//! use std::sync::Arc;
//!
//! let catalog = SchemaCatalog::new(vec![SchemaDefinition::new(
//!     "shop",
//!     vec![TableDefinition::new(
//!         "orders",
//!         vec![
//!             ColumnDefinition::key("id", DataType::Long),
//!             ColumnDefinition::new("note", DataType::String),
//!         ],
//!     )],
//! )])
//! .unwrap();
//!
//! let serializer = RecordSerializer::new(
//!     Arc::new(catalog),
//!     MemorySink::new(),
//!     SerializerConfig::default(),
//! );
//!
//! let row = RawRow::new(
//!     vec![
//!         Field::new("id", WireType::Int64),
//!         Field::new("note", WireType::Varchar),
//!     ],
//!     vec![vec![RawValue::int(1), RawValue::text("first")]],
//! );
//! serializer
//!     .record(
//!         &row,
//!         &SchemaSelection::included("shop"),
//!         &TableSelection::included("orders"),
//!         ChangeKind::Insert,
//!     )
//!     .unwrap();
//!
//! let op = serializer.sink().last().unwrap();
//! assert_eq!(op.op_type(), OpType::Upsert);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod config;
mod convert;
mod error;
mod selection;
mod serializer;
mod sink;
mod wire;

pub use catalog::{ColumnDefinition, DataType, SchemaCatalog, SchemaDefinition, TableDefinition};
pub use config::{DeleteKeys, SerializerConfig, UpdateMode};
pub use convert::TypeConverter;
pub use error::{SerializeError, SerializeResult};
pub use selection::{SchemaSelection, TableSelection};
pub use serializer::{ChangeKind, RecordSerializer};
pub use sink::{read_frames, EncodingSink, MemorySink, OperationSink};
pub use wire::{Charset, Field, RawRow, RawValue, UpdatedRow, WireType};

pub use rowcast_codec::{OpType, Operation, Record, RecordData, Timestamp, Value};
