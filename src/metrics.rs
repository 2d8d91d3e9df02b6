// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for hemisphere-store.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host service is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `hemisphere_store_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `backend`: sql, remote
//! - `operation`: create, get, get_all, update, delete
//! - `status`: success, not_found, conflict, unavailable, error

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

use crate::storage::StorageError;

/// Record a backend operation outcome
pub fn record_operation(backend: &str, operation: &str, status: &str) {
    counter!(
        "hemisphere_store_operations_total",
        "backend" => backend.to_string(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a backend operation from its result
pub fn record_result<T>(backend: &str, operation: &str, result: &Result<T, StorageError>) {
    let status = match result {
        Ok(_) => "success",
        Err(StorageError::NotFound(_)) => "not_found",
        Err(StorageError::UniqueViolation(_)) => "conflict",
        Err(StorageError::Unavailable(_)) => "unavailable",
        Err(StorageError::Backend(_)) => "error",
    };
    record_operation(backend, operation, status);
}

/// Record operation latency
pub fn record_latency(backend: &str, operation: &str, duration: Duration) {
    histogram!(
        "hemisphere_store_operation_seconds",
        "backend" => backend.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// A backend faulted during a fan-out and its share was skipped
pub fn record_fanout_fault(region: &str, operation: &str) {
    counter!(
        "hemisphere_store_fanout_faults_total",
        "region" => region.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record a cross-backend move (outcome: success, create_failed, delete_failed)
pub fn record_migration(from: &str, to: &str, outcome: &str) {
    counter!(
        "hemisphere_store_migrations_total",
        "from" => from.to_string(),
        "to" => to.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Size of the last merged listing
pub fn set_listing_size(count: usize) {
    gauge!("hemisphere_store_listing_size").set(count as f64);
}

/// RAII timer that records on drop
pub struct LatencyTimer {
    backend: &'static str,
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(backend: &'static str, operation: &'static str) -> Self {
        Self {
            backend,
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.backend, self.operation, self.start.elapsed());
    }
}
