//! Infrastructure layer for Proposer.
//!
//! Contains implementations of the port traits defined in `proposer-core`:
//! SQLite storage for the engineer registry and proposal drafts, filesystem
//! attachment storage, remote/local file fetching, and handlebars document
//! rendering.

pub mod config;
pub mod document;
pub mod filesystem;
pub mod sqlite;
