//! Infrastructure layer for MedConsult.
//!
//! Contains implementations of the ports defined in `medconsult-core`:
//! SQLite repositories, the OpenAI-compatible generation provider, the
//! HTTP embedding client, and the config file loader.

pub mod config;
pub mod embedding;
pub mod llm;
pub mod sqlite;
