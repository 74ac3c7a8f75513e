use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmergencyType {
    Blood,
    Medical,
    Disaster,
    Other,
}

/// Emergency request raised by a resident
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emergency {
    pub id: String,
    pub requester: String,
    #[serde(rename = "type")]
    pub kind: EmergencyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub ward: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub contact_number: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Emergency {
    pub fn new(
        requester: String,
        kind: EmergencyType,
        details: Option<String>,
        ward: String,
        location: Option<String>,
        contact_number: String,
    ) -> Self {
        Self {
            id: super::new_id(),
            requester,
            kind,
            details,
            ward,
            location,
            contact_number,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

impl Document for Emergency {
    const COLLECTION: &'static str = "emergencies";

    fn id(&self) -> &str {
        &self.id
    }
}
