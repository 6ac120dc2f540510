//! Test fixtures.
//!
//! The "Customers" table of the `sample` schema covers every scalar,
//! binary, JSON and temporal conversion in a single row. Its primary key is
//! `(customer_id, name)`.

use rowcast_core::{
    Field, MemorySink, RawRow, RawValue, RecordSerializer, SchemaCatalog, SchemaSelection,
    SerializerConfig, TableSelection, WireType,
};
use std::sync::Arc;

/// Schema holding the Customers table.
pub const SAMPLE_SCHEMA: &str = "sample";

/// The 19-column fixture table.
pub const CUSTOMERS_TABLE: &str = "Customers";

/// Collation id of the `binary` pseudo charset.
const BINARY_CHARSET: u32 = 63;

/// Catalog snapshot for the `sample` schema, as schema discovery writes it.
pub const CUSTOMERS_CATALOG_JSON: &str = r#"{
  "schemas": [{
    "name": "sample",
    "tables": [{
      "name": "Customers",
      "columns": [
        {"name": "customer_id", "type": "INT", "primary_key": true},
        {"name": "name", "type": "STRING", "primary_key": true},
        {"name": "first_name", "type": "STRING"},
        {"name": "last_name", "type": "STRING"},
        {"name": "middle_name", "type": "STRING"},
        {"name": "is_deleted", "type": "BOOLEAN"},
        {"name": "notes", "type": "STRING"},
        {"name": "decimal", "type": "DECIMAL"},
        {"name": "profile_pic", "type": "BINARY"},
        {"name": "header_pic", "type": "BINARY"},
        {"name": "footer_pic", "type": "BINARY"},
        {"name": "sitemap", "type": "JSON"},
        {"name": "long_value", "type": "LONG"},
        {"name": "double_value", "type": "DOUBLE"},
        {"name": "float_value", "type": "FLOAT"},
        {"name": "date_value", "type": "NAIVE_DATE"},
        {"name": "timestamp_value", "type": "UTC_DATETIME"},
        {"name": "datetime_value", "type": "NAIVE_DATETIME"},
        {"name": "tiny_int_as_bool_value", "type": "BOOLEAN"}
      ]
    }]
  }]
}"#;

/// Catalog for a two-column `SalesDB.Customers` table with no primary key.
pub const SALES_CATALOG_JSON: &str = r#"{
  "schemas": [{
    "name": "SalesDB",
    "tables": [{
      "name": "Customers",
      "columns": [
        {"name": "customer_id", "type": "INT"},
        {"name": "name", "type": "STRING"}
      ]
    }]
  }]
}"#;

/// Loads the `sample` catalog.
pub fn customers_catalog() -> Arc<SchemaCatalog> {
    Arc::new(SchemaCatalog::from_json(CUSTOMERS_CATALOG_JSON).expect("Invalid fixture catalog"))
}

/// Loads the `SalesDB` catalog.
pub fn sales_catalog() -> Arc<SchemaCatalog> {
    Arc::new(SchemaCatalog::from_json(SALES_CATALOG_JSON).expect("Invalid fixture catalog"))
}

/// Field metadata of a Customers row, in driver order.
///
/// The driver order differs from the catalog order (`middle_name` comes
/// before `last_name`).
pub fn customers_fields() -> Vec<Field> {
    let text = |name: &str, wire| Field::new(name, wire).with_charset(BINARY_CHARSET);
    vec![
        Field::new("customer_id", WireType::Int32),
        text("name", WireType::Varchar),
        text("first_name", WireType::Varchar),
        text("middle_name", WireType::Varchar),
        text("last_name", WireType::Varchar),
        Field::new("is_deleted", WireType::Int8),
        text("notes", WireType::Text),
        Field::new("decimal", WireType::Decimal),
        Field::new("profile_pic", WireType::Binary),
        Field::new("header_pic", WireType::Binary),
        Field::new("footer_pic", WireType::Binary),
        Field::new("sitemap", WireType::Json),
        Field::new("long_value", WireType::Int64),
        Field::new("double_value", WireType::Float64),
        Field::new("float_value", WireType::Float32),
        Field::new("date_value", WireType::Date),
        Field::new("timestamp_value", WireType::Timestamp),
        Field::new("datetime_value", WireType::Datetime),
        Field::new("tiny_int_as_bool_value", WireType::Int8),
    ]
}

/// One Customers row with the given `name`; every other value is fixed.
pub fn customers_row(name: &str) -> RawRow {
    let pic = || RawValue::text("profiles/phanatic.jpg");
    RawRow::new(
        customers_fields(),
        vec![vec![
            RawValue::int(123),
            RawValue::text(name),
            RawValue::text("PhaniRaj"),
            RawValue::text("PhaniRaj"),
            RawValue::text("PhaniRaj"),
            RawValue::int(0),
            RawValue::text("Something great comes this way"),
            RawValue::text("156.123"),
            pic(),
            pic(),
            pic(),
            RawValue::text("{'home': 'phanatic.dev'}"),
            RawValue::int(i64::MAX),
            RawValue::float(f64::MAX),
            RawValue::text("123.456"),
            RawValue::text("2004-12-12"),
            RawValue::text("2006-01-02 15:04:05"),
            RawValue::text("2021-01-19 03:14:07.999999"),
            RawValue::int(1),
        ]],
    )
}

/// A Customers row whose every value is NULL.
pub fn customers_null_row() -> RawRow {
    let fields = customers_fields();
    let nulls = vec![RawValue::Null; fields.len()];
    RawRow::new(fields, vec![nulls])
}

/// The included `sample` schema.
pub fn sample_schema() -> SchemaSelection {
    SchemaSelection::included(SAMPLE_SCHEMA)
}

/// The included Customers table with every column explicitly selected.
pub fn customers_selection() -> TableSelection {
    customers_fields()
        .into_iter()
        .fold(TableSelection::included(CUSTOMERS_TABLE), |selection, field| {
            selection.column(field.name, true)
        })
}

/// A serializer over the `sample` catalog that collects into memory.
pub fn customers_serializer(config: SerializerConfig) -> RecordSerializer<MemorySink> {
    RecordSerializer::new(customers_catalog(), MemorySink::new(), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_shapes_agree() {
        let catalog = customers_catalog();
        let table = catalog.resolve(SAMPLE_SCHEMA, CUSTOMERS_TABLE).unwrap();
        let row = customers_row("PhaniRaj");

        assert_eq!(table.columns.len(), 19);
        assert_eq!(row.first_row().unwrap().len(), 19);
        assert!(row.fields.iter().all(|f| table.column(&f.name).is_some()));
        assert_eq!(table.primary_keys().count(), 2);
        assert_eq!(customers_null_row().first_row().unwrap().len(), 19);
    }

    #[test]
    fn selection_lists_every_column() {
        let selection = customers_selection();
        assert_eq!(selection.columns.len(), 19);
        assert!(selection.columns.values().all(|&included| included));
    }
}
