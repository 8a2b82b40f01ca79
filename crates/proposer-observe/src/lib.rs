//! Observability setup for Proposer: structured logging with optional
//! OpenTelemetry span export.

pub mod tracing_setup;
