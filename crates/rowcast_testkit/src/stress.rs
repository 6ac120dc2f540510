//! Stress helpers.
//!
//! Drive a single shared serializer from many threads at once.

use rowcast_core::{
    ChangeKind, OperationSink, RawRow, RecordSerializer, SchemaSelection, TableSelection,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total calls made.
    pub total_ops: usize,
    /// Calls that returned `Ok`.
    pub successful_ops: usize,
    /// Calls that returned an error.
    pub failed_ops: usize,
    /// Wall-clock duration.
    pub duration: Duration,
    /// Calls per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }
}

/// Configuration for a stress run.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of threads.
    pub threads: usize,
    /// Calls per thread.
    pub ops_per_thread: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 8,
            ops_per_thread: 200,
        }
    }
}

/// Calls `record` with the same row from every thread, alternating inserts
/// and deletes.
pub fn stress_record<S>(
    serializer: Arc<RecordSerializer<S>>,
    row: RawRow,
    schema: SchemaSelection,
    table: TableSelection,
    config: &StressConfig,
) -> StressTestResult
where
    S: OperationSink + 'static,
{
    let row = Arc::new(row);
    let schema = Arc::new(schema);
    let table = Arc::new(table);
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|_| {
            let serializer = Arc::clone(&serializer);
            let row = Arc::clone(&row);
            let schema = Arc::clone(&schema);
            let table = Arc::clone(&table);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let ops = config.ops_per_thread;

            thread::spawn(move || {
                for i in 0..ops {
                    let kind = if i % 2 == 0 {
                        ChangeKind::Insert
                    } else {
                        ChangeKind::Delete
                    };
                    match serializer.record(&row, &schema, &table, kind) {
                        Ok(()) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Stress thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}
