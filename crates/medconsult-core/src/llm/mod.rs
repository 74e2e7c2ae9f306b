//! Generation provider abstractions for MedConsult.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: Object-safe wrapper for dynamic dispatch
//! - `structured`: JSON-schema constrained output helpers

pub mod box_provider;
pub mod provider;
pub mod structured;
