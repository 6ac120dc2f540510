//! The record serializer.
//!
//! One call turns one captured change into at most one [`Operation`] and
//! hands it to the sink before returning. Every value is converted before
//! anything is sent, so a failing call leaves the sink untouched.

use crate::catalog::{ColumnDefinition, SchemaCatalog, TableDefinition};
use crate::config::{DeleteKeys, SerializerConfig, UpdateMode};
use crate::convert::TypeConverter;
use crate::error::{SerializeError, SerializeResult};
use crate::selection::{SchemaSelection, TableSelection};
use crate::sink::OperationSink;
use crate::wire::{RawRow, RawValue, UpdatedRow};
use rowcast_codec::{Operation, Record, RecordData, Value};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Kind of change reported by the capture source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Row inserted.
    Insert,
    /// Row updated.
    Update,
    /// Row deleted.
    Delete,
    /// Table truncated.
    Truncate,
}

/// A retained column: its position in the row and its definition.
type Selected<'a> = (usize, &'a ColumnDefinition);

/// Serializes raw rows into change operations.
///
/// The serializer holds no per-call state. It is `Send + Sync` whenever the
/// sink is, so one instance can serve every capture thread.
pub struct RecordSerializer<S: OperationSink> {
    catalog: Arc<SchemaCatalog>,
    sink: S,
    converter: TypeConverter,
    config: SerializerConfig,
}

impl<S: OperationSink> RecordSerializer<S> {
    /// Creates a serializer over a catalog snapshot.
    pub fn new(catalog: Arc<SchemaCatalog>, sink: S, config: SerializerConfig) -> Self {
        Self {
            catalog,
            sink,
            converter: TypeConverter::new(&config),
            config,
        }
    }

    /// The catalog snapshot in use.
    pub fn catalog(&self) -> &Arc<SchemaCatalog> {
        &self.catalog
    }

    /// The sink operations are sent to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The configuration in use.
    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    /// Consumes the serializer and returns its sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Serializes an inserted or deleted row.
    ///
    /// `ChangeKind::Delete` produces a delete record carrying the retained
    /// primary-key columns; every other kind produces an upsert carrying
    /// every retained column. Only the first physical row is used.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTable` if the table is not in the catalog,
    /// `ShapeMismatch` if the row is malformed, conversion errors for bad
    /// values, and whatever the sink returns.
    pub fn record(
        &self,
        row: &RawRow,
        schema: &SchemaSelection,
        table: &TableSelection,
        kind: ChangeKind,
    ) -> SerializeResult<()> {
        if self.skips(schema, table) {
            return Ok(());
        }
        let definition = self.catalog.resolve(&schema.schema_name, &table.table_name)?;
        let values = row.first_row()?;
        if row.rows.len() > 1 {
            debug!(
                rows = row.rows.len(),
                "{}.{}: only the first physical row is serialized",
                schema.schema_name,
                table.table_name
            );
        }
        let selected = select_columns(row, definition, table)?;

        let record = match kind {
            ChangeKind::Delete => {
                let keys = self.delete_keys(row, values, &selected, definition)?;
                Record::delete(&schema.schema_name, &table.table_name, keys)
            }
            ChangeKind::Insert | ChangeKind::Update | ChangeKind::Truncate => {
                let data = self.convert_columns(row, values, selected.iter().copied())?;
                Record::upsert(&schema.schema_name, &table.table_name, data)
            }
        };
        self.emit(record)
    }

    /// Serializes an updated row.
    ///
    /// Values come from the after image. With [`UpdateMode::ChangedOnly`]
    /// only primary keys and columns whose payload changed are carried.
    ///
    /// # Errors
    ///
    /// As for [`RecordSerializer::record`]; `ChangedOnly` also requires the
    /// before image to have the same fields as the after image.
    pub fn update(
        &self,
        updated: &UpdatedRow,
        schema: &SchemaSelection,
        table: &TableSelection,
    ) -> SerializeResult<()> {
        if self.skips(schema, table) {
            return Ok(());
        }
        let definition = self.catalog.resolve(&schema.schema_name, &table.table_name)?;
        let after = &updated.after;
        let after_values = after.first_row()?;
        let selected = select_columns(after, definition, table)?;
        if !definition.has_primary_key() {
            warn!(
                "{}.{} has no primary key, update carries no key columns",
                schema.schema_name, table.table_name
            );
        }

        let data = match self.config.update_mode {
            UpdateMode::FullAfter => {
                self.convert_columns(after, after_values, selected.iter().copied())?
            }
            UpdateMode::ChangedOnly => {
                let before_values = updated.before.first_row()?;
                if updated.before.fields != after.fields {
                    return Err(SerializeError::shape_mismatch(
                        "before and after images have different fields",
                    ));
                }
                let changed = selected.iter().copied().filter(|&(index, column)| {
                    column.primary_key || before_values[index] != after_values[index]
                });
                self.convert_columns(after, after_values, changed)?
            }
        };

        self.emit(Record::update(&schema.schema_name, &table.table_name, data))
    }

    /// Serializes a table truncation.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTable` if the table is not in the catalog, and
    /// whatever the sink returns.
    pub fn truncate(&self, schema: &SchemaSelection, table: &TableSelection) -> SerializeResult<()> {
        if self.skips(schema, table) {
            return Ok(());
        }
        self.catalog.resolve(&schema.schema_name, &table.table_name)?;
        self.emit(Record::truncate(&schema.schema_name, &table.table_name))
    }

    fn skips(&self, schema: &SchemaSelection, table: &TableSelection) -> bool {
        if self.config.skip_excluded && !(schema.included && table.included) {
            debug!(
                "skipping excluded {}.{}",
                schema.schema_name, table.table_name
            );
            return true;
        }
        false
    }

    fn delete_keys(
        &self,
        row: &RawRow,
        values: &[RawValue],
        selected: &[Selected<'_>],
        definition: &TableDefinition,
    ) -> SerializeResult<RecordData> {
        if !definition.has_primary_key() {
            warn!(
                "{} has no primary key, delete carries no key columns",
                definition.name
            );
        }
        let keys = selected.iter().copied().filter(|(_, column)| column.primary_key);

        match self.config.delete_keys {
            DeleteKeys::Null => Ok(keys
                .map(|(_, column)| (column.name.clone(), Value::Null))
                .collect()),
            DeleteKeys::Values => self.convert_columns(row, values, keys),
        }
    }

    fn convert_columns<'a>(
        &self,
        row: &RawRow,
        values: &[RawValue],
        columns: impl Iterator<Item = Selected<'a>>,
    ) -> SerializeResult<RecordData> {
        let mut data = RecordData::with_capacity(row.fields.len());
        for (index, column) in columns {
            let value = self
                .converter
                .convert(&row.fields[index], &values[index], column.data_type)?;
            data.insert(column.name.clone(), value);
        }
        Ok(data)
    }

    fn emit(&self, record: Record) -> SerializeResult<()> {
        trace!(
            op = record.op_type.as_str(),
            columns = record.data.as_ref().map_or(0, RecordData::len),
            "emitting {}.{}",
            record.schema_name,
            record.table_name
        );
        self.sink.send(Operation::Record(record))
    }
}

/// Pairs row fields with their definitions and applies the column selection.
///
/// Fields unknown to the definition are skipped; a row with no known field
/// at all is rejected.
fn select_columns<'a>(
    row: &RawRow,
    definition: &'a TableDefinition,
    table: &TableSelection,
) -> SerializeResult<Vec<Selected<'a>>> {
    let mut selected = Vec::with_capacity(row.fields.len());
    let mut known = 0usize;

    for (index, field) in row.fields.iter().enumerate() {
        let Some(column) = definition.column(&field.name) else {
            debug!(
                "column {} is not part of {}, skipping",
                field.name, definition.name
            );
            continue;
        };
        known += 1;
        if table.is_included(&column.name) {
            selected.push((index, column));
        }
    }

    if known == 0 {
        return Err(SerializeError::shape_mismatch(format!(
            "no field of the row belongs to table {}",
            definition.name
        )));
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DataType, SchemaDefinition};
    use crate::sink::MemorySink;
    use crate::wire::{Field, WireType};
    use rowcast_codec::OpType;

    fn catalog() -> Arc<SchemaCatalog> {
        Arc::new(
            SchemaCatalog::new(vec![SchemaDefinition::new(
                "shop",
                vec![
                    TableDefinition::new(
                        "orders",
                        vec![
                            ColumnDefinition::key("id", DataType::Long),
                            ColumnDefinition::new("total", DataType::Decimal),
                            ColumnDefinition::new("paid", DataType::Boolean),
                        ],
                    ),
                    TableDefinition::new(
                        "log",
                        vec![ColumnDefinition::new("line", DataType::String)],
                    ),
                ],
            )])
            .unwrap(),
        )
    }

    fn fields() -> Vec<Field> {
        vec![
            Field::new("id", WireType::Int64),
            Field::new("total", WireType::Decimal),
            Field::new("paid", WireType::Int8),
        ]
    }

    fn order(id: i64, total: &str, paid: i64) -> RawRow {
        RawRow::new(
            fields(),
            vec![vec![RawValue::int(id), RawValue::text(total), RawValue::int(paid)]],
        )
    }

    fn serializer(config: SerializerConfig) -> RecordSerializer<MemorySink> {
        RecordSerializer::new(catalog(), MemorySink::new(), config)
    }

    fn shop() -> SchemaSelection {
        SchemaSelection::included("shop")
    }

    fn orders() -> TableSelection {
        TableSelection::included("orders")
    }

    fn last_record(serializer: &RecordSerializer<MemorySink>) -> Record {
        match serializer.sink().last() {
            Some(Operation::Record(record)) => record,
            None => panic!("nothing was emitted"),
        }
    }

    #[test]
    fn insert_carries_every_column() {
        let s = serializer(SerializerConfig::default());
        s.record(&order(7, "12.50", 1), &shop(), &orders(), ChangeKind::Insert)
            .unwrap();

        let record = last_record(&s);
        assert_eq!(record.op_type, OpType::Upsert);
        assert_eq!(record.schema_name, "shop");
        assert_eq!(record.table_name, "orders");
        let data = record.data.unwrap();
        assert_eq!(data.names().collect::<Vec<_>>(), vec!["id", "total", "paid"]);
        assert_eq!(data.get("id"), Some(&Value::Long(7)));
        assert_eq!(data.get("total"), Some(&Value::Decimal("12.50".into())));
        assert_eq!(data.get("paid"), Some(&Value::Bool(true)));
    }

    #[test]
    fn delete_carries_null_keys_by_default() {
        let s = serializer(SerializerConfig::default());
        s.record(&order(7, "12.50", 1), &shop(), &orders(), ChangeKind::Delete)
            .unwrap();

        let record = last_record(&s);
        assert_eq!(record.op_type, OpType::Delete);
        let data = record.data.unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.get("id"), Some(&Value::Null));
    }

    #[test]
    fn delete_can_carry_key_values() {
        let s = serializer(SerializerConfig::new().delete_keys(DeleteKeys::Values));
        s.record(&order(7, "12.50", 1), &shop(), &orders(), ChangeKind::Delete)
            .unwrap();

        let data = last_record(&s).data.unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.get("id"), Some(&Value::Long(7)));
    }

    #[test]
    fn delete_without_primary_key_is_empty() {
        let s = serializer(SerializerConfig::default());
        let row = RawRow::new(
            vec![Field::new("line", WireType::Varchar)],
            vec![vec![RawValue::text("hello")]],
        );
        s.record(&row, &shop(), &TableSelection::included("log"), ChangeKind::Delete)
            .unwrap();
        assert!(last_record(&s).data.unwrap().is_empty());
    }

    #[test]
    fn excluded_columns_are_dropped() {
        let s = serializer(SerializerConfig::default());
        let selection = orders().column("total", false).column("id", false);
        s.record(&order(7, "12.50", 0), &shop(), &selection, ChangeKind::Insert)
            .unwrap();
        let data = last_record(&s).data.unwrap();
        assert_eq!(data.names().collect::<Vec<_>>(), vec!["paid"]);

        s.record(&order(7, "12.50", 0), &shop(), &selection, ChangeKind::Delete)
            .unwrap();
        assert!(last_record(&s).data.unwrap().is_empty());
    }

    #[test]
    fn update_modes() {
        let updated = UpdatedRow {
            before: order(7, "12.50", 0),
            after: order(7, "12.50", 1),
        };

        let full = serializer(SerializerConfig::default());
        full.update(&updated, &shop(), &orders()).unwrap();
        let record = last_record(&full);
        assert_eq!(record.op_type, OpType::Update);
        assert_eq!(record.data.unwrap().len(), 3);

        let delta = serializer(SerializerConfig::new().update_mode(UpdateMode::ChangedOnly));
        delta.update(&updated, &shop(), &orders()).unwrap();
        let data = last_record(&delta).data.unwrap();
        assert_eq!(data.names().collect::<Vec<_>>(), vec!["id", "paid"]);
        assert_eq!(data.get("paid"), Some(&Value::Bool(true)));
    }

    #[test]
    fn changed_only_needs_matching_images() {
        let s = serializer(SerializerConfig::new().update_mode(UpdateMode::ChangedOnly));
        let mut before = order(7, "12.50", 0);
        before.fields.pop();
        before.rows[0].pop();
        let updated = UpdatedRow {
            before,
            after: order(7, "12.50", 1),
        };
        assert!(matches!(
            s.update(&updated, &shop(), &orders()),
            Err(SerializeError::ShapeMismatch { .. })
        ));
        assert!(s.sink().is_empty());
    }

    #[test]
    fn truncate_has_no_data() {
        let s = serializer(SerializerConfig::default());
        s.truncate(&shop(), &orders()).unwrap();
        let record = last_record(&s);
        assert_eq!(record.op_type, OpType::Truncate);
        assert_eq!(record.data, None);

        assert!(matches!(
            s.truncate(&shop(), &TableSelection::included("missing")),
            Err(SerializeError::UnknownTable { .. })
        ));
        assert_eq!(s.sink().len(), 1);
    }

    #[test]
    fn failures_emit_nothing() {
        let s = serializer(SerializerConfig::default());
        let bad = order(7, "twelve", 1);
        assert!(matches!(
            s.record(&bad, &shop(), &orders(), ChangeKind::Insert),
            Err(SerializeError::Conversion { .. })
        ));

        let empty = RawRow::new(fields(), vec![]);
        assert!(matches!(
            s.record(&empty, &shop(), &orders(), ChangeKind::Insert),
            Err(SerializeError::ShapeMismatch { .. })
        ));

        assert!(matches!(
            s.record(&order(7, "1", 1), &SchemaSelection::included("other"), &orders(), ChangeKind::Insert),
            Err(SerializeError::UnknownTable { .. })
        ));
        assert!(s.sink().is_empty());
    }

    #[test]
    fn unknown_fields_are_skipped() {
        let s = serializer(SerializerConfig::default());
        let mut row = order(7, "1.0", 1);
        row.fields.push(Field::new("note", WireType::Varchar));
        row.rows[0].push(RawValue::text("extra"));
        s.record(&row, &shop(), &orders(), ChangeKind::Insert).unwrap();
        assert!(!last_record(&s).data.unwrap().contains("note"));

        let foreign = RawRow::new(
            vec![Field::new("note", WireType::Varchar)],
            vec![vec![RawValue::text("extra")]],
        );
        assert!(matches!(
            s.record(&foreign, &shop(), &orders(), ChangeKind::Insert),
            Err(SerializeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn excluded_selections_can_be_skipped() {
        let mut excluded = orders();
        excluded.included = false;

        let s = serializer(SerializerConfig::new().skip_excluded(true));
        s.record(&order(1, "1", 1), &shop(), &excluded, ChangeKind::Insert)
            .unwrap();
        s.truncate(&shop(), &excluded).unwrap();
        assert!(s.sink().is_empty());

        let strict = serializer(SerializerConfig::default());
        strict
            .record(&order(1, "1", 1), &shop(), &excluded, ChangeKind::Insert)
            .unwrap();
        assert_eq!(strict.sink().len(), 1);
    }

    #[test]
    fn sink_failures_propagate() {
        let s = serializer(SerializerConfig::default());
        s.sink().set_failing(true);
        let err = s
            .record(&order(1, "1", 1), &shop(), &orders(), ChangeKind::Insert)
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn serializer_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RecordSerializer<MemorySink>>();
        assert_send_sync::<RecordSerializer<Arc<MemorySink>>>();
    }
}
