use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    High,
    Emergency,
}

/// Ward notice posted by a ward member or admin. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    pub posted_by: String,
    pub title: String,
    pub content: String,
    pub ward: String,
    #[serde(default)]
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

impl Announcement {
    pub fn new(
        posted_by: String,
        title: String,
        content: String,
        ward: &str,
        priority: Priority,
    ) -> Self {
        Self {
            id: super::new_id(),
            posted_by,
            title,
            content,
            ward: ward.trim().to_string(),
            priority,
            created_at: Utc::now(),
        }
    }
}

impl Document for Announcement {
    const COLLECTION: &'static str = "announcements";

    fn id(&self) -> &str {
        &self.id
    }
}
