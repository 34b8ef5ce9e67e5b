//! Metrics collection.
//!
//! # Metrics
//! - `http_responses_total` (counter): responses by method, route, status
//! - `http_response_duration_seconds` (histogram): handler-to-write latency
//! - `response_compressed_total` (counter): compressed bodies by encoding
//! - `response_write_failures_total` (counter): transport failures by kind

use std::time::Instant;

use metrics::{counter, histogram};

/// `route` is the matched route template, so ids in paths do not explode
/// label cardinality.
pub fn record_response(method: &str, route: &str, status: u16, start_time: Instant) {
    let status = status.to_string();
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    histogram!(
        "http_response_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status
    )
    .record(start_time.elapsed().as_secs_f64());
}

pub fn record_compressed(encoding: &'static str) {
    counter!("response_compressed_total", "encoding" => encoding).increment(1);
}

pub fn record_write_failure(kind: &'static str) {
    counter!("response_write_failures_total", "kind" => kind).increment(1);
}
