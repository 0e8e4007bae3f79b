pub mod auth;
pub mod configuration;
pub mod error;
pub mod issuance;
pub mod listing;
pub mod logger;
pub mod middleware;
pub mod registry;
pub mod routes;
pub mod startup;
pub mod subjects;
pub mod telemetry;
pub mod triggers;
pub mod validators;
