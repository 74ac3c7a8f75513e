use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::metrics::PushMetrics;

use super::{DispatchReport, PushError, PushGateway, PushMessage, PushNotification, Recipient};

/// Statistics for the notification dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Dispatches handled
    pub dispatches: AtomicU64,
    /// Messages submitted to the gateway
    pub total_sent: AtomicU64,
    pub total_batches: AtomicU64,
    pub failed_batches: AtomicU64,
    pub ticket_errors: AtomicU64,
    pub invalid_tokens: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            dispatches: self.dispatches.load(Ordering::Relaxed),
            total_sent: self.total_sent.load(Ordering::Relaxed),
            total_batches: self.total_batches.load(Ordering::Relaxed),
            failed_batches: self.failed_batches.load(Ordering::Relaxed),
            ticket_errors: self.ticket_errors.load(Ordering::Relaxed),
            invalid_tokens: self.invalid_tokens.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub dispatches: u64,
    pub total_sent: u64,
    pub total_batches: u64,
    pub failed_batches: u64,
    pub ticket_errors: u64,
    pub invalid_tokens: u64,
}

/// Turns a resolved audience into push gateway batches.
///
/// Delivery is best effort: nothing here returns an error. Failed batches and
/// error tickets are logged and counted, and the remaining batches are still
/// submitted.
pub struct NotificationDispatcher {
    gateway: Arc<dyn PushGateway>,
    batch_timeout: Duration,
    stats: DispatcherStats,
}

impl NotificationDispatcher {
    pub fn new(gateway: Arc<dyn PushGateway>, batch_timeout: Duration) -> Self {
        Self {
            gateway,
            batch_timeout,
            stats: DispatcherStats::default(),
        }
    }

    pub fn gateway(&self) -> &Arc<dyn PushGateway> {
        &self.gateway
    }

    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Valid destination tokens of `recipients`, in audience order
    fn collect_tokens(&self, recipients: &[Recipient], report: &mut DispatchReport) -> Vec<String> {
        let mut tokens = Vec::with_capacity(recipients.len());

        for recipient in recipients {
            let Some(token) = recipient.push_token.as_deref() else {
                report.missing_tokens += 1;
                continue;
            };

            if self.gateway.is_valid_token(token) {
                tokens.push(token.to_string());
            } else {
                report.invalid_tokens += 1;
                tracing::warn!(
                    user_id = %recipient.user_id,
                    token = %token,
                    "Skipping invalid push token"
                );
            }
        }

        tokens
    }

    #[tracing::instrument(
        name = "dispatcher.deliver",
        skip(self, recipients, notification),
        fields(recipients = recipients.len(), title = %notification.title)
    )]
    pub async fn deliver(
        &self,
        recipients: &[Recipient],
        notification: &PushNotification,
    ) -> DispatchReport {
        self.stats.dispatches.fetch_add(1, Ordering::Relaxed);

        let mut report = DispatchReport {
            recipients: recipients.len(),
            ..Default::default()
        };

        let tokens = self.collect_tokens(recipients, &mut report);
        self.stats
            .invalid_tokens
            .fetch_add(report.invalid_tokens as u64, Ordering::Relaxed);
        PushMetrics::record_invalid_tokens(report.invalid_tokens as u64);

        if tokens.is_empty() {
            tracing::debug!("No valid push tokens in audience");
            return report;
        }

        let messages: Vec<PushMessage> = tokens
            .iter()
            .map(|token| PushMessage::new(token, notification))
            .collect();

        for (index, batch) in messages.chunks(self.gateway.batch_limit().max(1)).enumerate() {
            report.batches += 1;
            self.stats.total_batches.fetch_add(1, Ordering::Relaxed);

            match self.submit(batch).await {
                Ok(tickets) => {
                    report.submitted += batch.len();
                    self.stats
                        .total_sent
                        .fetch_add(batch.len() as u64, Ordering::Relaxed);
                    PushMetrics::record_batch_sent(batch.len() as u64);

                    for (message, ticket) in batch.iter().zip(tickets.iter()) {
                        if !ticket.is_error() {
                            continue;
                        }

                        report.ticket_errors += 1;
                        self.stats.ticket_errors.fetch_add(1, Ordering::Relaxed);
                        PushMetrics::record_ticket_error(ticket.error_code());
                        tracing::warn!(
                            token = %message.to,
                            error = ?ticket.error_code(),
                            message = ?ticket.message,
                            "Push ticket error"
                        );

                        if ticket.is_device_not_registered() {
                            report.stale_tokens.push(message.to.clone());
                        }
                    }
                }
                Err(e) => {
                    report.failed_batches += 1;
                    self.stats.failed_batches.fetch_add(1, Ordering::Relaxed);
                    PushMetrics::record_batch_failed();
                    tracing::error!(
                        batch = index,
                        batch_size = batch.len(),
                        error = %e,
                        "Push batch failed, continuing with next batch"
                    );
                }
            }
        }

        tracing::info!(
            submitted = report.submitted,
            batches = report.batches,
            failed_batches = report.failed_batches,
            ticket_errors = report.ticket_errors,
            "Push notifications dispatched"
        );

        report
    }

    async fn submit(&self, batch: &[PushMessage]) -> Result<Vec<super::PushTicket>, PushError> {
        match tokio::time::timeout(self.batch_timeout, self.gateway.send(batch)).await {
            Ok(result) => result,
            Err(_) => Err(PushError::Timeout(self.batch_timeout.as_secs())),
        }
    }
}
