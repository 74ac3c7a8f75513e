use axum::{
    routing::{get, post, put},
    Router,
};

use crate::server::AppState;

use super::announcements::{create_announcement, list_announcements};
use super::auth::{login, register};
use super::blood_donation::{
    complete_donation, list_donors, my_status, register_donor, request_blood, update_availability,
};
use super::businesses::{create_business, list_businesses, my_businesses, update_business};
use super::complaints::{create_complaint, list_complaints, update_complaint, ward_feed};
use super::emergencies::{close_emergency, create_emergency, list_emergencies};
use super::health::{health, root, stats};
use super::jobs::{create_job, list_jobs};
use super::metrics::prometheus_metrics;
use super::uploads::upload_image;
use super::users::{get_profile, list_users, register_push_token, update_profile, update_user};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health, stats & metrics
        .route("/", get(root))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        .nest(
            "/api",
            Router::new()
                // Accounts
                .route("/auth/register", post(register))
                .route("/auth/login", post(login))
                .route("/users", get(list_users))
                .route("/users/profile", get(get_profile).put(update_profile))
                .route("/users/push-token", post(register_push_token))
                .route("/users/{id}", put(update_user))
                // Complaints
                .route("/complaints", post(create_complaint).get(list_complaints))
                .route("/complaints/ward", get(ward_feed))
                .route("/complaints/upload", post(upload_image))
                .route("/complaints/{id}", put(update_complaint))
                // Announcements
                .route(
                    "/announcements",
                    post(create_announcement).get(list_announcements),
                )
                // Businesses & jobs
                .route("/businesses", post(create_business).get(list_businesses))
                .route("/businesses/my", get(my_businesses))
                .route("/businesses/upload", post(upload_image))
                .route("/businesses/{id}", put(update_business))
                .route("/jobs", post(create_job).get(list_jobs))
                // Emergencies
                .route("/emergency", post(create_emergency).get(list_emergencies))
                .route("/emergency/{id}/close", put(close_emergency))
                // Blood donation
                .route("/blood-donation/register", post(register_donor))
                .route("/blood-donation/availability", put(update_availability))
                .route("/blood-donation/my-status", get(my_status))
                .route("/blood-donation/donors", get(list_donors))
                .route("/blood-donation/request", post(request_blood))
                .route("/blood-donation/complete", put(complete_donation)),
        )
}
