//! Observability setup for MedConsult binaries.

pub mod tracing_setup;
