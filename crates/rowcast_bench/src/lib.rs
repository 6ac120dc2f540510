//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use rand::Rng;
use rowcast_core::{Field, RawRow, RawValue, WireType};
use rowcast_codec::{Operation, Record, RecordData, Value};

/// Generate random bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate a wide row of `columns` BIGINT columns named `c0`, `c1`, ...
pub fn wide_row(columns: usize) -> RawRow {
    let mut rng = rand::thread_rng();
    let fields = (0..columns)
        .map(|i| Field::new(format!("c{i}"), WireType::Int64))
        .collect();
    let values = (0..columns).map(|_| RawValue::int(rng.gen())).collect();
    RawRow::new(fields, vec![values])
}

/// Generate an upsert carrying `columns` mixed values.
pub fn mixed_operation(columns: usize, payload_size: usize) -> Operation {
    let mut rng = rand::thread_rng();
    let data: RecordData = (0..columns)
        .map(|i| {
            let value = match i % 5 {
                0 => Value::Long(rng.gen()),
                1 => Value::Double(rng.gen()),
                2 => Value::String(format!("value-{}", rng.gen::<u32>())),
                3 => Value::Binary(random_data(payload_size)),
                _ => Value::Null,
            };
            (format!("column_{i}"), value)
        })
        .collect();
    Record::upsert("bench", "events", data).into()
}
