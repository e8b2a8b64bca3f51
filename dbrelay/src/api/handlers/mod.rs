//! Axum route handlers.

pub mod uploads;
