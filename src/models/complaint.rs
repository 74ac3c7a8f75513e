use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Document;

/// Complaint lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ComplaintStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Rejected,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Open => "open",
            ComplaintStatus::InProgress => "in-progress",
            ComplaintStatus::Resolved => "resolved",
            ComplaintStatus::Rejected => "rejected",
        }
    }
}

/// An issue reported by a resident
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: String,
    /// Reporting user
    pub user: String,
    pub title: String,
    pub description: String,
    pub ward: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: ComplaintStatus,
    /// Ward member handling the complaint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Complaint {
    pub fn new(
        user: String,
        title: String,
        description: String,
        ward: String,
        image_url: Option<String>,
    ) -> Self {
        Self {
            id: super::new_id(),
            user,
            title,
            description,
            ward,
            image_url,
            status: ComplaintStatus::Open,
            assigned_to: None,
            resolved_at: None,
            resolved_by: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status == ComplaintStatus::Resolved
    }
}

impl Document for Complaint {
    const COLLECTION: &'static str = "complaints";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_complaint_is_open() {
        let complaint = Complaint::new(
            "u1".into(),
            "Pothole".into(),
            "Deep pothole on main road".into(),
            "Ward 5".into(),
            None,
        );
        assert_eq!(complaint.status, ComplaintStatus::Open);
        assert!(complaint.resolved_at.is_none());
        assert!(!complaint.is_resolved());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_value(ComplaintStatus::InProgress).unwrap(),
            "in-progress"
        );
        let status: ComplaintStatus = serde_json::from_str("\"resolved\"").unwrap();
        assert_eq!(status, ComplaintStatus::Resolved);
        assert_eq!(ComplaintStatus::Rejected.as_str(), "rejected");
    }
}
