//! Persisted entities.
//!
//! All entities are stored and served as camelCase JSON documents.

mod announcement;
mod blood;
mod business;
mod complaint;
mod emergency;
mod job;
mod user;

pub use announcement::{Announcement, Priority};
pub use blood::{BloodDonor, BloodGroup, ParseBloodGroupError};
pub use business::{Business, BusinessStatus};
pub use complaint::{Complaint, ComplaintStatus};
pub use emergency::{Emergency, EmergencyType};
pub use job::{Job, JobType};
pub use user::{Profile, Role, User, UserResponse};

/// Document field names used in store filters and patches.
pub mod fields {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const WARD: &str = "ward";
    pub const DISTRICT: &str = "district";
    pub const STATE: &str = "state";
    pub const STATUS: &str = "status";
    pub const PHONE: &str = "phone";
    pub const ROLE: &str = "role";
    pub const IS_VERIFIED: &str = "isVerified";
    pub const PROFILE: &str = "profile";
    pub const USER: &str = "user";
    pub const OWNER: &str = "owner";
    pub const PUSH_TOKEN: &str = "expoPushToken";
    pub const IS_ACTIVE: &str = "isActive";
    pub const IS_AVAILABLE: &str = "isAvailable";
    pub const BLOOD_GROUP: &str = "bloodGroup";
    pub const CONTACT_NUMBER: &str = "contactNumber";
    pub const LAST_DONATION_DATE: &str = "lastDonationDate";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const RESOLVED_AT: &str = "resolvedAt";
    pub const RESOLVED_BY: &str = "resolvedBy";
    pub const ASSIGNED_TO: &str = "assignedTo";
    pub const DESCRIPTION: &str = "description";
    pub const CATEGORY: &str = "category";
    pub const ADDRESS: &str = "address";
    pub const IMAGE_URL: &str = "imageUrl";
}

/// New document id
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Timestamp in the same RFC 3339 form the models serialize to
pub fn timestamp(at: chrono::DateTime<chrono::Utc>) -> serde_json::Value {
    serde_json::Value::String(at.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true))
}
