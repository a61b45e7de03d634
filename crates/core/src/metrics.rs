//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Conversions (per-file results, engine duration, retries, active workers)
//! - Batches (outcomes, size)
//! - Archives (results, size)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Per-file conversions total by result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mp3forge_conversions_total", "Total per-file conversions"),
        &["result"], // "success", "transcode", "unsupported_format", "cancelled"
    )
    .unwrap()
});

/// Engine run duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mp3forge_conversion_duration_seconds",
            "Duration of a single file conversion",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Retried engine invocations total.
pub static CONVERSION_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mp3forge_conversion_retries_total",
        "Total conversion attempts that were retried",
    )
    .unwrap()
});

/// Conversions currently holding a worker slot.
pub static CONVERSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mp3forge_conversions_active",
        "Number of conversions currently running",
    )
    .unwrap()
});

// =============================================================================
// Batch Metrics
// =============================================================================

/// Batches total by outcome.
pub static BATCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mp3forge_batches_total", "Total batches processed"),
        &["outcome"], // "single", "archive", "no_success", "packaging_failed", "rejected", "output_directory"
    )
    .unwrap()
});

/// Files per accepted batch.
pub static BATCH_FILES: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("mp3forge_batch_files", "Number of files per batch")
            .buckets(vec![1.0, 2.0, 5.0, 10.0, 15.0, 20.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Archive Metrics
// =============================================================================

/// Archives built total by result.
pub static ARCHIVES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mp3forge_archives_total", "Total archives built"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Archive size in bytes.
pub static ARCHIVE_BYTES: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("mp3forge_archive_bytes", "Size of produced archives")
            .buckets(prometheus::exponential_buckets(1024.0 * 1024.0, 2.0, 12).unwrap_or_default()),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Conversions
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(CONVERSION_RETRIES.clone()),
        Box::new(CONVERSIONS_ACTIVE.clone()),
        // Batches
        Box::new(BATCHES_TOTAL.clone()),
        Box::new(BATCH_FILES.clone()),
        // Archives
        Box::new(ARCHIVES_TOTAL.clone()),
        Box::new(ARCHIVE_BYTES.clone()),
    ]
}
