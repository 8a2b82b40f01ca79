//! REST API transport: axum router, envelope responses, API key auth.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
