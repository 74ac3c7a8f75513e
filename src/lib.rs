// Shared infrastructure
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod store;

// Domain
pub mod models;
pub mod notification;
pub mod policy;
pub mod ward;

// Application layer
pub mod api;
pub mod server;
pub mod triggers;
pub mod uploads;

// Background tasks
pub mod tasks;
