//! Expo push service client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;

use crate::config::PushConfig;

use super::{PushError, PushGateway, PushMessage, PushTicket};

/// Hard limit of the Expo push API
pub const EXPO_BATCH_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    data: Vec<PushTicket>,
}

pub struct ExpoPushGateway {
    client: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
    batch_limit: usize,
}

impl ExpoPushGateway {
    pub fn new(config: &PushConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.batch_timeout_seconds.max(1)))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: config.endpoint.clone(),
            access_token: config.access_token.clone(),
            batch_limit: config.batch_limit.clamp(1, EXPO_BATCH_LIMIT),
        }
    }

    fn headers(&self) -> Result<HeaderMap, PushError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.access_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| PushError::Unavailable(format!("invalid access token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

/// `ExponentPushToken[...]`, `ExpoPushToken[...]`, or a bare UUID
pub fn is_expo_push_token(token: &str) -> bool {
    let bracketed = ["ExponentPushToken[", "ExpoPushToken["].iter().any(|prefix| {
        token
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(']'))
            .is_some_and(|inner| !inner.is_empty())
    });

    bracketed || uuid::Uuid::parse_str(token).is_ok_and(|_| token.len() == 36)
}

#[async_trait]
impl PushGateway for ExpoPushGateway {
    fn name(&self) -> &'static str {
        "expo"
    }

    fn is_valid_token(&self, token: &str) -> bool {
        is_expo_push_token(token)
    }

    fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    #[tracing::instrument(name = "expo.send", skip(self, messages), fields(batch_size = messages.len()))]
    async fn send(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, PushError> {
        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers()?)
            .json(messages)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "(no body)".to_string());
            return Err(PushError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SendResponse = response.json().await?;
        if parsed.data.len() != messages.len() {
            return Err(PushError::TicketMismatch {
                messages: messages.len(),
                tickets: parsed.data.len(),
            });
        }

        Ok(parsed.data)
    }
}
