//! Shared domain types for Proposer.
//!
//! This crate contains the domain types used across the Proposer workspace:
//! field catalogs, engineers, the per-conversation proposal session, action
//! tokens, transport messages, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod action;
pub mod catalog;
pub mod config;
pub mod document;
pub mod engineer;
pub mod error;
pub mod message;
pub mod session;
