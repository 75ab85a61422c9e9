pub mod analytics;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod geo;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod query;
pub mod slug;
pub mod validation;
