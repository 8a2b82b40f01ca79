//! Interview state machine and port trait definitions for Proposer.
//!
//! This crate defines the "ports" (registry, draft store, attachment and
//! document traits) that the infrastructure layer implements, plus the
//! conversation controller that drives a proposal interview. It depends only
//! on `proposer-types` -- never on `proposer-infra` or any database/IO crate.

pub mod attachment;
pub mod catalog;
pub mod controller;
pub mod document;
pub mod linkage;
pub mod repository;
pub mod session;
