//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::sync::Once;
use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Database Metrics
    pub static ref DB_QUERY_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "postboard_db_query_duration_seconds",
            "Database query duration in seconds"
        ).buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["operation", "table"]
    ).expect("metric can be created");

    // Application Metrics
    pub static ref POSTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("postboard_posts_total", "Total number of post mutations"),
        &["operation"]
    ).expect("metric can be created");
    pub static ref PHOTO_UPLOADS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("postboard_photo_uploads_total", "Total number of post photo uploads"),
        &["status"]
    ).expect("metric can be created");
    pub static ref AUTH_EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("postboard_auth_events_total", "Total number of authentication events"),
        &["provider", "event"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("postboard_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; only the first call registers collectors.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(DB_QUERY_DURATION_SECONDS.clone()))
            .expect("DB_QUERY_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(POSTS_TOTAL.clone()))
            .expect("POSTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(PHOTO_UPLOADS_TOTAL.clone()))
            .expect("PHOTO_UPLOADS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(AUTH_EVENTS_TOTAL.clone()))
            .expect("AUTH_EVENTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}

/// Record a finished database query.
pub fn observe_db_query(operation: &str, table: &str, elapsed: Duration) {
    DB_QUERY_DURATION_SECONDS
        .with_label_values(&[operation, table])
        .observe(elapsed.as_secs_f64());
}
