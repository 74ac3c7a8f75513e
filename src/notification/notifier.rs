use std::sync::Arc;

use tokio::sync::mpsc;

use crate::metrics::PushMetrics;

use super::{DispatchReport, NotificationDispatcher, PushNotification, Recipient};

/// A resolved audience and the notification to push to it
#[derive(Debug, Clone)]
pub struct NotificationJob {
    /// Write event that produced the job (e.g. `complaint.created`)
    pub event: &'static str,
    pub recipients: Vec<Recipient>,
    pub notification: PushNotification,
}

#[derive(Clone)]
enum Mode {
    /// Dispatch before returning to the caller
    Inline,
    /// Hand jobs to the notification worker through the outbox
    Background(mpsc::Sender<NotificationJob>),
}

/// Entry point of write paths into notification delivery.
///
/// `notify` never fails. In background mode the job is queued and the call
/// returns immediately; a full or closed outbox drops the job with a warning.
#[derive(Clone)]
pub struct Notifier {
    dispatcher: Arc<NotificationDispatcher>,
    mode: Mode,
}

impl Notifier {
    pub fn inline(dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self {
            dispatcher,
            mode: Mode::Inline,
        }
    }

    /// Create a background notifier and the outbox receiver its worker drains
    pub fn background(
        dispatcher: Arc<NotificationDispatcher>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<NotificationJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                dispatcher,
                mode: Mode::Background(tx),
            },
            rx,
        )
    }

    pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
        &self.dispatcher
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.mode, Mode::Inline)
    }

    /// Deliver or enqueue `job`. Returns the dispatch report in inline mode.
    pub async fn notify(&self, job: NotificationJob) -> Option<DispatchReport> {
        PushMetrics::record_event(job.event);

        match &self.mode {
            Mode::Inline => {
                let report = self
                    .dispatcher
                    .deliver(&job.recipients, &job.notification)
                    .await;
                Some(report)
            }
            Mode::Background(tx) => {
                let event = job.event;
                match tx.try_send(job) {
                    Ok(()) => {
                        PushMetrics::record_enqueued();
                    }
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        PushMetrics::record_dropped();
                        tracing::warn!(event = %event, "Notification outbox full, dropping event");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        PushMetrics::record_dropped();
                        tracing::warn!(event = %event, "Notification outbox closed, dropping event");
                    }
                }
                None
            }
        }
    }
}
