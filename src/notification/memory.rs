//! In-process push gateway.
//!
//! Records every submitted batch instead of delivering it. Used for local runs
//! (`push.provider = "memory"`) and tests, where individual batches or tokens
//! can be scripted to fail.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::expo::is_expo_push_token;
use super::{PushError, PushGateway, PushMessage, PushTicket, DEVICE_NOT_REGISTERED};

#[derive(Default)]
struct Inner {
    batches: Vec<Vec<PushMessage>>,
    failing_batches: HashSet<usize>,
    ticket_errors: HashMap<String, String>,
    delay: Option<Duration>,
}

pub struct MemoryPushGateway {
    batch_limit: usize,
    inner: Mutex<Inner>,
}

impl MemoryPushGateway {
    pub fn new(batch_limit: usize) -> Self {
        Self {
            batch_limit: batch_limit.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not hide the recorded batches
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the `index`-th call to `send` (0-based) fail
    pub fn fail_batch(&self, index: usize) {
        self.lock().failing_batches.insert(index);
    }

    /// Return an error ticket with `code` for every message to `token`
    pub fn reject_token(&self, token: &str, code: &str) {
        self.lock()
            .ticket_errors
            .insert(token.to_string(), code.to_string());
    }

    /// Report `token` as belonging to an uninstalled app
    pub fn unregister_token(&self, token: &str) {
        self.reject_token(token, DEVICE_NOT_REGISTERED);
    }

    /// Delay every `send` by `delay`
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    /// Number of `send` calls, including failed ones
    pub fn calls(&self) -> usize {
        self.lock().batches.len()
    }

    pub fn batches(&self) -> Vec<Vec<PushMessage>> {
        self.lock().batches.clone()
    }

    /// Every submitted message, in submission order
    pub fn messages(&self) -> Vec<PushMessage> {
        self.lock().batches.iter().flatten().cloned().collect()
    }

    /// Messages sent to `token`
    pub fn messages_to(&self, token: &str) -> Vec<PushMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.to == token)
            .collect()
    }

    pub fn clear(&self) {
        self.lock().batches.clear();
    }
}

#[async_trait]
impl PushGateway for MemoryPushGateway {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn is_valid_token(&self, token: &str) -> bool {
        is_expo_push_token(token)
    }

    fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    async fn send(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, PushError> {
        let (index, delay) = {
            let mut inner = self.lock();
            inner.batches.push(messages.to_vec());
            (inner.batches.len() - 1, inner.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let inner = self.lock();
        if inner.failing_batches.contains(&index) {
            return Err(PushError::Unavailable(format!("batch {} failed", index)));
        }

        let tickets = messages
            .iter()
            .enumerate()
            .map(|(i, message)| match inner.ticket_errors.get(&message.to) {
                Some(code) => PushTicket::error(
                    format!("\"{}\" could not be delivered", message.to),
                    Some(code),
                ),
                None => PushTicket::ok(format!("ticket-{}-{}", index, i)),
            })
            .collect();

        Ok(tickets)
    }
}
