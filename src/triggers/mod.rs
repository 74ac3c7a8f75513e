//! Write-path notification triggers.
//!
//! Each notify-worthy state transition resolves its ward audience here and
//! hands the job to the [`Notifier`]. Audience resolution happens before the
//! caller responds; delivery follows the notifier's mode. Nothing in this
//! module returns an error: a failed lookup is logged and the write that
//! triggered it still succeeds.

use std::sync::Arc;

use serde_json::json;

use crate::models::{Announcement, BloodGroup, Complaint, Emergency, User};
use crate::notification::{NotificationJob, Notifier, PushNotification, Recipient};
use crate::ward::{Audience, WardMatcher};

/// Maximum characters of announcement content shown in the push body
pub const ANNOUNCEMENT_PREVIEW_CHARS: usize = 100;

pub const COMPLAINT_CREATED: &str = "complaint.created";
pub const COMPLAINT_RESOLVED: &str = "complaint.resolved";
pub const ANNOUNCEMENT_POSTED: &str = "announcement.posted";
pub const BLOOD_REQUESTED: &str = "blood.requested";

/// First `max` characters of `text`, with "..." appended when cut
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub struct WriteTriggers {
    matcher: Arc<WardMatcher>,
    notifier: Notifier,
}

impl WriteTriggers {
    pub fn new(matcher: Arc<WardMatcher>, notifier: Notifier) -> Self {
        Self { matcher, notifier }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Resolve the audience and notify. Returns the audience size.
    async fn fan_out(
        &self,
        event: &'static str,
        ward: &str,
        audience: Audience,
        notification: PushNotification,
    ) -> usize {
        let users = match self.matcher.resolve(ward, &audience).await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(
                    event = %event,
                    ward = %ward,
                    error = %e,
                    "Failed to resolve notification audience"
                );
                return 0;
            }
        };

        let audience_size = users.len();
        if audience_size == 0 {
            tracing::debug!(event = %event, ward = %ward, "Empty ward audience, nothing to notify");
            return 0;
        }

        let job = NotificationJob {
            event,
            recipients: users.iter().map(Recipient::from).collect(),
            notification,
        };
        self.notifier.notify(job).await;

        audience_size
    }

    /// `(none) -> open`
    #[tracing::instrument(name = "trigger.complaint_created", skip_all, fields(complaint_id = %complaint.id))]
    pub async fn complaint_created(&self, complaint: &Complaint) -> usize {
        let notification = PushNotification::new(
            "🚨 New Issue Reported",
            format!("\"{}\" reported in {}", complaint.title, complaint.ward.trim()),
        )
        .with_data(json!({
            "type": "complaint",
            "complaintId": complaint.id,
            "ward": complaint.ward,
        }));

        self.fan_out(
            COMPLAINT_CREATED,
            &complaint.ward,
            Audience::everyone().with_push_token(),
            notification,
        )
        .await
    }

    /// First transition into `resolved`
    #[tracing::instrument(name = "trigger.complaint_resolved", skip_all, fields(complaint_id = %complaint.id))]
    pub async fn complaint_resolved(&self, complaint: &Complaint) -> usize {
        let notification = PushNotification::new(
            "✅ Issue Resolved",
            format!("\"{}\" in {} has been resolved", complaint.title, complaint.ward.trim()),
        )
        .with_data(json!({
            "type": "complaint_resolved",
            "complaintId": complaint.id,
            "ward": complaint.ward,
        }));

        self.fan_out(
            COMPLAINT_RESOLVED,
            &complaint.ward,
            Audience::everyone().with_push_token(),
            notification,
        )
        .await
    }

    #[tracing::instrument(name = "trigger.announcement_posted", skip_all, fields(announcement_id = %announcement.id))]
    pub async fn announcement_posted(&self, announcement: &Announcement) -> usize {
        let notification = PushNotification::new(
            format!("📢 {}", announcement.title),
            truncate_chars(&announcement.content, ANNOUNCEMENT_PREVIEW_CHARS),
        )
        .with_data(json!({
            "type": "announcement",
            "announcementId": announcement.id,
            "ward": announcement.ward,
        }));

        self.fan_out(
            ANNOUNCEMENT_POSTED,
            &announcement.ward,
            Audience::everyone().with_push_token(),
            notification,
        )
        .await
    }

    /// Blood request raised by `requester`. Every other member of the
    /// requester's ward is in the audience, with or without a push token.
    #[tracing::instrument(name = "trigger.blood_requested", skip_all, fields(emergency_id = %emergency.id))]
    pub async fn blood_requested(
        &self,
        requester: &User,
        emergency: &Emergency,
        blood_group: BloodGroup,
    ) -> usize {
        let notification = PushNotification::new(
            "🩸 Emergency Blood Request!",
            format!(
                "Urgent: {} blood needed in {}. Tap to respond.",
                blood_group,
                requester.ward.trim()
            ),
        )
        .with_data(json!({
            "type": "blood_request",
            "emergencyId": emergency.id,
            "bloodGroup": blood_group,
            "location": emergency.location,
            "contactNumber": emergency.contact_number,
        }));

        self.fan_out(
            BLOOD_REQUESTED,
            &requester.ward,
            Audience::everyone().excluding(requester.id.clone()),
            notification,
        )
        .await
    }
}
