//! Property-based test generators using proptest.
//!
//! Strategies produce catalogs, rows and selections that fit together: every
//! generated row only uses columns of the generated table, and every raw
//! payload parses under its wire type.

use proptest::prelude::*;
use rowcast_core::{
    ColumnDefinition, DataType, Field, RawRow, RawValue, SchemaCatalog, SchemaDefinition,
    TableDefinition, TableSelection, WireType,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Schema name used by generated tables.
pub const GENERATED_SCHEMA: &str = "gen";

/// Table name used by generated tables.
pub const GENERATED_TABLE: &str = "t";

/// A generated table together with one matching row.
#[derive(Debug, Clone)]
pub struct GeneratedTable {
    /// Catalog holding only the generated table.
    pub catalog: Arc<SchemaCatalog>,
    /// The table definition.
    pub table: TableDefinition,
    /// A row with one value per column.
    pub row: RawRow,
}

impl GeneratedTable {
    /// Names of the primary-key columns.
    pub fn key_names(&self) -> Vec<String> {
        self.table.primary_keys().map(|c| c.name.clone()).collect()
    }
}

/// Strategy for column names.
pub fn column_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for a wire type, declared type and valid payload triple.
///
/// Roughly one value in eight is NULL.
pub fn typed_value_strategy() -> impl Strategy<Value = (WireType, DataType, RawValue)> {
    let value = prop_oneof![
        any::<i32>().prop_map(|n| (WireType::Int32, DataType::Int, RawValue::int(i64::from(n)))),
        any::<i64>().prop_map(|n| (WireType::Int64, DataType::Long, RawValue::int(n))),
        any::<bool>().prop_map(|b| (WireType::Int8, DataType::Boolean, RawValue::int(i64::from(b)))),
        any::<f64>()
            .prop_filter("finite", |n| n.is_finite())
            .prop_map(|n| (WireType::Float64, DataType::Double, RawValue::float(n))),
        "[-]?[0-9]{1,12}\\.[0-9]{1,6}"
            .prop_map(|s| (WireType::Decimal, DataType::Decimal, RawValue::text(&s))),
        "\\PC{0,24}".prop_map(|s| (WireType::Varchar, DataType::String, RawValue::text(&s))),
        prop::collection::vec(any::<u8>(), 0..32)
            .prop_map(|b| (WireType::Varbinary, DataType::Binary, RawValue::bytes(b))),
        (1970i32..2100, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| (
            WireType::Date,
            DataType::NaiveDate,
            RawValue::text(&format!("{y:04}-{m:02}-{d:02}"))
        )),
    ];
    (value, 0u8..8).prop_map(|((wire, declared, raw), null)| {
        if null == 0 {
            (wire, declared, RawValue::Null)
        } else {
            (wire, declared, raw)
        }
    })
}

/// Strategy for a table of 1 to 12 columns, some of them primary keys,
/// with one matching row.
pub fn table_strategy() -> impl Strategy<Value = GeneratedTable> {
    prop::collection::btree_map(
        column_name_strategy(),
        (typed_value_strategy(), any::<bool>()),
        1..12,
    )
    .prop_map(|columns| {
        let mut definitions = Vec::with_capacity(columns.len());
        let mut fields = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());

        for (name, ((wire, declared, raw), primary_key)) in columns {
            definitions.push(ColumnDefinition {
                name: name.clone(),
                data_type: declared,
                primary_key,
            });
            fields.push(Field::new(name, wire));
            values.push(raw);
        }

        let table = TableDefinition::new(GENERATED_TABLE, definitions);
        let catalog = SchemaCatalog::new(vec![SchemaDefinition::new(
            GENERATED_SCHEMA,
            vec![table.clone()],
        )])
        .expect("Generated names are unique");

        GeneratedTable {
            catalog: Arc::new(catalog),
            table,
            row: RawRow::new(fields, vec![values]),
        }
    })
}

/// Strategy for a generated table plus a selection with random overrides.
///
/// Each column is left out of the mapping, set to `true` or set to `false`
/// with equal probability.
pub fn table_with_selection_strategy() -> impl Strategy<Value = (GeneratedTable, TableSelection)> {
    table_strategy().prop_flat_map(|generated| {
        let n = generated.table.columns.len();
        (Just(generated), prop::collection::vec(0u8..3, n)).prop_map(|(generated, choices)| {
            let columns: HashMap<String, bool> = generated
                .table
                .columns
                .iter()
                .zip(choices)
                .filter_map(|(column, choice)| match choice {
                    0 => None,
                    1 => Some((column.name.clone(), true)),
                    _ => Some((column.name.clone(), false)),
                })
                .collect();
            let selection = TableSelection {
                table_name: GENERATED_TABLE.to_string(),
                included: true,
                columns,
            };
            (generated, selection)
        })
    })
}
