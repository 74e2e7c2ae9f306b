//! Shared domain types for MedConsult.
//!
//! This crate contains the domain types used across the consultation
//! assistant: users, consultations and their timeline, extracted clinical
//! conditions, vitals, retrieval results, pipeline outcomes, configuration,
//! and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror, schemars.

pub mod condition;
pub mod config;
pub mod consultation;
pub mod error;
pub mod llm;
pub mod memory;
pub mod retrieval;
pub mod turn;
pub mod user;
pub mod vitals;
