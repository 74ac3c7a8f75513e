use async_trait::async_trait;
use thiserror::Error;

use super::{PushMessage, PushTicket};

/// Errors from submitting a batch to a push gateway.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("Push gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Push gateway rejected batch with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Push gateway returned {tickets} tickets for {messages} messages")]
    TicketMismatch { messages: usize, tickets: usize },

    #[error("Push gateway timed out after {0} seconds")]
    Timeout(u64),

    #[error("Push gateway unavailable: {0}")]
    Unavailable(String),
}

/// Mobile push delivery provider.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Provider identifier
    fn name(&self) -> &'static str;

    /// Whether `token` is a destination this provider accepts
    fn is_valid_token(&self, token: &str) -> bool;

    /// Maximum messages accepted per `send`
    fn batch_limit(&self) -> usize;

    /// Submit one batch. Tickets are aligned positionally with `messages`.
    async fn send(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, PushError>;
}
