use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::notification::{NotificationDispatcher, NotificationJob};

/// Background task draining the notification outbox.
///
/// Jobs are delivered one at a time in the order they were queued. On
/// shutdown the outbox is closed and whatever is already queued is still
/// delivered before the task stops.
pub struct NotificationWorker {
    dispatcher: Arc<NotificationDispatcher>,
    outbox: mpsc::Receiver<NotificationJob>,
    shutdown: broadcast::Receiver<()>,
}

impl NotificationWorker {
    pub fn new(
        dispatcher: Arc<NotificationDispatcher>,
        outbox: mpsc::Receiver<NotificationJob>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            dispatcher,
            outbox,
            shutdown,
        }
    }

    /// Run until shutdown is signalled or every sender is gone
    pub async fn run(mut self) {
        tracing::info!(
            gateway = %self.dispatcher.gateway().name(),
            "Notification worker started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Notification worker received shutdown signal");
                    break;
                }
                job = self.outbox.recv() => match job {
                    Some(job) => self.deliver(job).await,
                    None => {
                        tracing::info!("Notification outbox closed");
                        break;
                    }
                }
            }
        }

        self.drain().await;
        tracing::info!("Notification worker stopped");
    }

    async fn deliver(&self, job: NotificationJob) {
        let report = self
            .dispatcher
            .deliver(&job.recipients, &job.notification)
            .await;

        tracing::debug!(
            event = %job.event,
            recipients = report.recipients,
            submitted = report.submitted,
            failed_batches = report.failed_batches,
            "Notification job processed"
        );
    }

    /// Stop accepting jobs and deliver the ones already queued
    async fn drain(&mut self) {
        self.outbox.close();

        let mut drained = 0usize;
        while let Some(job) = self.outbox.recv().await {
            self.deliver(job).await;
            drained += 1;
        }

        if drained > 0 {
            tracing::info!(drained, "Delivered queued notifications before shutdown");
        }
    }
}
