use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusinessStatus {
    Active,
    #[default]
    Pending,
    Rejected,
}

impl BusinessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessStatus::Active => "active",
            BusinessStatus::Pending => "pending",
            BusinessStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: String,
    pub owner: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub ward: String,
    #[serde(default)]
    pub status: BusinessStatus,
    pub created_at: DateTime<Utc>,
}

impl Business {
    /// New listing. Listings created by an admin are active at once, all
    /// others wait for approval.
    pub fn new(owner: String, name: String, ward: String, created_by_admin: bool) -> Self {
        Self {
            id: super::new_id(),
            owner,
            name,
            description: None,
            category: None,
            contact_number: None,
            address: None,
            image_url: None,
            ward,
            status: if created_by_admin {
                BusinessStatus::Active
            } else {
                BusinessStatus::Pending
            },
            created_at: Utc::now(),
        }
    }
}

impl Document for Business {
    const COLLECTION: &'static str = "businesses";

    fn id(&self) -> &str {
        &self.id
    }
}
