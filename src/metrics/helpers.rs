//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    NOTIFICATION_EVENTS_TOTAL, OUTBOX_DROPPED_TOTAL, OUTBOX_ENQUEUED_TOTAL, PUSH_BATCHES_TOTAL,
    PUSH_BATCH_SIZE, PUSH_INVALID_TOKENS_TOTAL, PUSH_MESSAGES_SENT_TOTAL,
    PUSH_TICKET_ERRORS_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording push delivery metrics
pub struct PushMetrics;

impl PushMetrics {
    /// Record a batch the gateway accepted
    pub fn record_batch_sent(size: u64) {
        PUSH_BATCHES_TOTAL.with_label_values(&["ok"]).inc();
        PUSH_MESSAGES_SENT_TOTAL.inc_by(size);
        PUSH_BATCH_SIZE.observe(size as f64);
    }

    /// Record a batch that failed or timed out
    pub fn record_batch_failed() {
        PUSH_BATCHES_TOTAL.with_label_values(&["failed"]).inc();
    }

    pub fn record_ticket_error(code: Option<&str>) {
        PUSH_TICKET_ERRORS_TOTAL
            .with_label_values(&[code.unwrap_or("unknown")])
            .inc();
    }

    pub fn record_invalid_tokens(count: u64) {
        if count > 0 {
            PUSH_INVALID_TOKENS_TOTAL.inc_by(count);
        }
    }

    /// Record a notify-worthy write event
    pub fn record_event(event: &str) {
        NOTIFICATION_EVENTS_TOTAL.with_label_values(&[event]).inc();
    }

    pub fn record_enqueued() {
        OUTBOX_ENQUEUED_TOTAL.inc();
    }

    pub fn record_dropped() {
        OUTBOX_DROPPED_TOTAL.inc();
    }
}
