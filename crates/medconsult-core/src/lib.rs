//! Business logic and repository trait definitions for MedConsult.
//!
//! This crate defines the "ports" (repository and provider traits) that the
//! infrastructure layer implements, plus the consultation pipeline built on
//! top of them: retrieval, prompt assembly, insight extraction, memory
//! consolidation, and condition reconciliation. It depends only on
//! `medconsult-types` -- never on `medconsult-infra` or any database/IO crate.

pub mod llm;
pub mod memory;
pub mod prompt;
pub mod repository;
pub mod retrieval;
pub mod service;
pub mod vector;

#[cfg(test)]
pub(crate) mod testing;
