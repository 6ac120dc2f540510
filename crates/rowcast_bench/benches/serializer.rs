//! Record serialization benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rowcast_bench::wide_row;
use rowcast_core::{
    ChangeKind, ColumnDefinition, DataType, EncodingSink, RecordSerializer, SchemaCatalog,
    SchemaDefinition, SchemaSelection, SerializerConfig, TableDefinition, TableSelection,
};
use rowcast_testkit::{customers_row, customers_selection, customers_serializer, sample_schema};
use std::io::sink;
use std::sync::Arc;

/// Catalog with a single `bench.wide` table of `columns` LONG columns.
fn wide_catalog(columns: usize) -> Arc<SchemaCatalog> {
    let definitions = (0..columns)
        .map(|i| ColumnDefinition {
            name: format!("c{i}"),
            data_type: DataType::Long,
            primary_key: i == 0,
        })
        .collect();
    Arc::new(
        SchemaCatalog::new(vec![SchemaDefinition::new(
            "bench",
            vec![TableDefinition::new("wide", definitions)],
        )])
        .unwrap(),
    )
}

/// Benchmark the Customers row through every operation kind.
fn bench_customers(c: &mut Criterion) {
    let mut group = c.benchmark_group("customers");
    let row = customers_row("PhaniRaj");
    let schema = sample_schema();
    let table = customers_selection();

    for (name, kind) in [("insert", ChangeKind::Insert), ("delete", ChangeKind::Delete)] {
        group.bench_function(name, |b| {
            let serializer = customers_serializer(SerializerConfig::default());
            b.iter(|| {
                serializer
                    .record(black_box(&row), &schema, &table, kind)
                    .unwrap();
                serializer.sink().take();
            });
        });
    }

    group.bench_function("truncate", |b| {
        let serializer = customers_serializer(SerializerConfig::default());
        b.iter(|| {
            serializer.truncate(&schema, &table).unwrap();
            serializer.sink().take();
        });
    });

    group.finish();
}

/// Benchmark serialization straight into an encoding sink by row width.
fn bench_wide_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("wide_row_encoded");

    for columns in [8, 64, 256] {
        group.throughput(Throughput::Elements(columns as u64));
        group.bench_with_input(BenchmarkId::from_parameter(columns), &columns, |b, &columns| {
            let serializer = RecordSerializer::new(
                wide_catalog(columns),
                EncodingSink::new(sink()),
                SerializerConfig::default(),
            );
            let row = wide_row(columns);
            let schema = SchemaSelection::included("bench");
            let table = TableSelection::included("wide");

            b.iter(|| {
                serializer
                    .record(black_box(&row), &schema, &table, ChangeKind::Insert)
                    .unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_customers, bench_wide_rows);

criterion_main!(benches);
