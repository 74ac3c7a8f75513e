//! API layer - HTTP endpoint handlers organized by domain.

mod announcements;
mod auth;
mod blood_donation;
mod businesses;
mod complaints;
mod details;
mod emergencies;
mod extract;
mod health;
mod jobs;
mod metrics;
mod routes;
mod uploads;
mod users;

pub use auth::AuthResponse;
pub use blood_donation::DonorListing;
pub use businesses::BusinessListing;
pub use complaints::ComplaintListing;
pub use details::{NameRef, UserContact};
pub use extract::ApiJson;
pub use health::{HealthResponse, StatsResponse};
pub use jobs::JobListing;
pub use routes::api_routes;
