//! Route handlers for the HTTP API.

pub mod cache;
pub mod health;
pub mod metrics;
