//! REST API handlers.

pub mod conversation;
pub mod draft;
pub mod engineer;
