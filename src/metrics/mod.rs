//! Prometheus metrics for the service.
//!
//! - Push metrics (messages, batches, tickets, invalid tokens)
//! - Write-path notification events and outbox behaviour
//! - HTTP-facing gauges refreshed on scrape (audience size, uptime)

mod helpers;

pub use helpers::{encode_metrics, PushMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "ward";

lazy_static! {
    // ============================================================================
    // Push Metrics
    // ============================================================================

    /// Messages accepted by the push gateway
    pub static ref PUSH_MESSAGES_SENT_TOTAL: IntCounter = register_int_counter!(
        format!("{}_push_messages_sent_total", METRIC_PREFIX),
        "Total push messages submitted to the gateway"
    ).unwrap();

    /// Batches submitted by outcome
    pub static ref PUSH_BATCHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_push_batches_total", METRIC_PREFIX),
        "Total push batches submitted",
        &["outcome"]
    ).unwrap();

    /// Batch sizes
    pub static ref PUSH_BATCH_SIZE: Histogram = register_histogram!(
        format!("{}_push_batch_size", METRIC_PREFIX),
        "Distribution of push batch sizes",
        vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0]
    ).unwrap();

    /// Error tickets by gateway error code
    pub static ref PUSH_TICKET_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_push_ticket_errors_total", METRIC_PREFIX),
        "Total push tickets returned with status error",
        &["error"]
    ).unwrap();

    /// Tokens dropped before submission
    pub static ref PUSH_INVALID_TOKENS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_push_invalid_tokens_total", METRIC_PREFIX),
        "Total push tokens rejected as malformed"
    ).unwrap();

    // ============================================================================
    // Notification Event Metrics
    // ============================================================================

    /// Notify-worthy write events
    pub static ref NOTIFICATION_EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notification_events_total", METRIC_PREFIX),
        "Total write events that produced a notification",
        &["event"]
    ).unwrap();

    /// Jobs queued for the notification worker
    pub static ref OUTBOX_ENQUEUED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_outbox_enqueued_total", METRIC_PREFIX),
        "Total notification jobs queued for background dispatch"
    ).unwrap();

    /// Jobs dropped because the outbox was full or closed
    pub static ref OUTBOX_DROPPED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_outbox_dropped_total", METRIC_PREFIX),
        "Total notification jobs dropped by the outbox"
    ).unwrap();

    // ============================================================================
    // Service Metrics
    // ============================================================================

    /// Seconds since the process started
    pub static ref UPTIME_SECONDS: IntGauge = register_int_gauge!(
        format!("{}_uptime_seconds", METRIC_PREFIX),
        "Seconds since the service started"
    ).unwrap();

    /// Store reachability (1 = reachable, 0 = unreachable)
    pub static ref STORE_UP: IntGauge = register_int_gauge!(
        format!("{}_store_up", METRIC_PREFIX),
        "Document store reachability (1=up, 0=down)"
    ).unwrap();
}
