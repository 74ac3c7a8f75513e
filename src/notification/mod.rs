//! Push notification delivery.
//!
//! # Gateway Architecture
//!
//! Delivery goes through the [`PushGateway`] abstraction:
//!
//! - `ExpoPushGateway`: Expo push service over HTTPS (default)
//! - `MemoryPushGateway`: records batches in memory, for local runs and tests
//!
//! Write paths resolve their ward audience and hand it to the [`Notifier`],
//! which either dispatches inline or queues the job for the notification
//! worker. The [`NotificationDispatcher`] does the token filtering, batching
//! and ticket inspection.
//!
//! Use `create_push_gateway()` to create the gateway based on configuration.

mod dispatcher;
mod expo;
mod gateway;
mod memory;
mod notifier;
mod types;

use std::sync::Arc;

use crate::config::PushConfig;

pub use dispatcher::{DispatcherStatsSnapshot, NotificationDispatcher};
pub use expo::{is_expo_push_token, ExpoPushGateway, EXPO_BATCH_LIMIT};
pub use gateway::{PushError, PushGateway};
pub use memory::MemoryPushGateway;
pub use notifier::{NotificationJob, Notifier};
pub use types::{
    DispatchReport, PushMessage, PushNotification, PushTicket, Recipient, TicketDetails,
    TicketStatus, DEVICE_NOT_REGISTERED,
};

/// Create a push gateway based on configuration.
///
/// - `"memory"`: records messages without delivering them
/// - `"expo"` (default): Expo push service
pub fn create_push_gateway(config: &PushConfig) -> Arc<dyn PushGateway> {
    match config.provider.as_str() {
        "memory" => {
            tracing::warn!(
                provider = "memory",
                "Push notifications are recorded in memory and not delivered"
            );
            Arc::new(MemoryPushGateway::new(config.batch_limit))
        }
        _ => {
            tracing::info!(
                provider = "expo",
                endpoint = %config.endpoint,
                batch_limit = config.batch_limit,
                "Creating Expo push gateway"
            );
            Arc::new(ExpoPushGateway::new(config))
        }
    }
}
