//! HTTP layer: axum handlers and the bodies they exchange.
//!
//! - **[`handlers`]**: route handlers for `/api/upload`
//! - **[`models`]**: request/response data structures
//!
//! Handlers only deal with HTTP concerns (method dispatch, status codes). The upload pipeline
//! itself lives in [`crate::relay`].

pub mod handlers;
pub mod models;
