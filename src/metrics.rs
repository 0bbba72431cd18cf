// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the search adapter.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host application is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `search_adapter_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `operation`: find, get, create, update, patch, remove
//! - `status`: ok, empty, invalid, success, failed, issued, skipped

use metrics::{counter, histogram};
use std::time::{Duration, Instant};

/// Record a query compilation outcome (`ok`, `empty` or `invalid`)
pub fn record_query_compiled(status: &'static str) {
    counter!(
        "search_adapter_queries_compiled_total",
        "status" => status
    )
    .increment(1);
}

/// Record per-item outcomes of one bulk write
pub fn record_bulk_items(operation: &'static str, succeeded: usize, failed: usize) {
    counter!(
        "search_adapter_bulk_items_total",
        "operation" => operation,
        "status" => "success"
    )
    .increment(succeeded as u64);
    counter!(
        "search_adapter_bulk_items_total",
        "operation" => operation,
        "status" => "failed"
    )
    .increment(failed as u64);
}

/// Record whether the secondary read after a bulk write was issued or skipped
pub fn record_secondary_read(issued: bool) {
    counter!(
        "search_adapter_secondary_reads_total",
        "status" => if issued { "issued" } else { "skipped" }
    )
    .increment(1);
}

/// Record bulk operation latency
pub fn record_bulk_latency(operation: &'static str, duration: Duration) {
    histogram!(
        "search_adapter_bulk_seconds",
        "operation" => operation
    )
    .record(duration.as_secs_f64());
}

/// Record a store call failure
pub fn record_store_error(operation: &'static str) {
    counter!(
        "search_adapter_store_errors_total",
        "operation" => operation
    )
    .increment(1);
}

/// RAII timer for bulk operations; records on drop.
pub struct BulkTimer {
    operation: &'static str,
    start: Instant,
}

impl BulkTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for BulkTimer {
    fn drop(&mut self) {
        record_bulk_latency(self.operation, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Without an installed recorder these only check that recording never panics.

    #[test]
    fn test_record_query_compiled() {
        record_query_compiled("ok");
        record_query_compiled("empty");
        record_query_compiled("invalid");
    }

    #[test]
    fn test_record_bulk() {
        record_bulk_items("create", 2, 1);
        record_bulk_items("remove", 0, 0);
        record_secondary_read(true);
        record_secondary_read(false);
        record_store_error("bulk");
    }

    #[test]
    fn test_bulk_timer() {
        {
            let _timer = BulkTimer::new("patch");
            std::thread::sleep(Duration::from_millis(1));
        }
        record_bulk_latency("create", Duration::from_millis(5));
    }
}
