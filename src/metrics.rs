//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, Opts, Registry};
use std::sync::Once;

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Database Metrics
    pub static ref DB_QUERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tweetquery_db_queries_total", "Total number of database queries"),
        &["operation", "table"]
    ).expect("metric can be created");

    // Ingestion Metrics
    pub static ref INGEST_BATCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tweetquery_ingest_batches_total", "Total number of ingestion batches"),
        &["status"]
    ).expect("metric can be created");
    pub static ref INGEST_POSTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tweetquery_ingest_posts_total", "Total number of ingested post elements"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref INGEST_DURATION_SECONDS: prometheus::Histogram = prometheus::Histogram::with_opts(
        HistogramOpts::new(
            "tweetquery_ingest_duration_seconds",
            "Ingestion batch duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0])
    ).expect("metric can be created");

    // Search Metrics
    pub static ref SEARCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tweetquery_searches_total", "Total number of post searches"),
        &["outcome"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tweetquery_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Count one database statement
pub fn observe_db_query(operation: &str, table: &str) {
    DB_QUERIES_TOTAL.with_label_values(&[operation, table]).inc();
}

/// Initialize metrics registry.
///
/// Safe to call more than once; registration happens on the first call.
pub fn init_metrics() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let collectors: [Box<dyn prometheus::core::Collector>; 6] = [
            Box::new(DB_QUERIES_TOTAL.clone()),
            Box::new(INGEST_BATCHES_TOTAL.clone()),
            Box::new(INGEST_POSTS_TOTAL.clone()),
            Box::new(INGEST_DURATION_SECONDS.clone()),
            Box::new(SEARCHES_TOTAL.clone()),
            Box::new(ERRORS_TOTAL.clone()),
        ];
        for collector in collectors {
            if let Err(error) = REGISTRY.register(collector) {
                tracing::error!(%error, "Failed to register metric");
            }
        }

        tracing::info!("Metrics registry initialized");
    });
}
