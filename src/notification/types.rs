use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::User;

/// Ticket error detail the gateway returns for tokens of uninstalled apps
pub const DEVICE_NOT_REGISTERED: &str = "DeviceNotRegistered";

/// What a write event wants to tell its audience
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
    /// Deep-link payload delivered alongside the notification
    #[serde(default)]
    pub data: Value,
}

impl PushNotification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: Value::Object(Default::default()),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// A single message as submitted to the push gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub to: String,
    pub sound: String,
    pub title: String,
    pub body: String,
    pub data: Value,
}

impl PushMessage {
    pub fn new(token: &str, notification: &PushNotification) -> Self {
        Self {
            to: token.to_string(),
            sound: "default".to_string(),
            title: notification.title.clone(),
            body: notification.body.clone(),
            data: notification.data.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-message delivery outcome, positionally aligned with the batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushTicket {
    pub status: TicketStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<TicketDetails>,
}

impl PushTicket {
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            status: TicketStatus::Ok,
            id: Some(id.into()),
            message: None,
            details: None,
        }
    }

    pub fn error(message: impl Into<String>, detail: Option<&str>) -> Self {
        Self {
            status: TicketStatus::Error,
            id: None,
            message: Some(message.into()),
            details: detail.map(|d| TicketDetails {
                error: Some(d.to_string()),
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == TicketStatus::Error
    }

    pub fn error_code(&self) -> Option<&str> {
        self.details.as_ref().and_then(|d| d.error.as_deref())
    }

    /// The token belongs to an app that is no longer installed
    pub fn is_device_not_registered(&self) -> bool {
        self.error_code() == Some(DEVICE_NOT_REGISTERED)
    }
}

/// A resolved audience member
#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    pub user_id: String,
    pub push_token: Option<String>,
}

impl From<&User> for Recipient {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            push_token: user.expo_push_token.clone(),
        }
    }
}

/// Outcome of one dispatch
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    /// Recipients handed to the dispatcher
    pub recipients: usize,
    /// Recipients without a token
    pub missing_tokens: usize,
    pub invalid_tokens: usize,
    /// Messages submitted to the gateway
    pub submitted: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub ticket_errors: usize,
    /// Tokens the gateway reported as unregistered
    pub stale_tokens: Vec<String>,
}
