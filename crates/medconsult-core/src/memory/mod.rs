//! Memory pipeline for MedConsult.
//!
//! - `Embedder` / `BoxEmbedder`: text-to-vector port
//! - `InsightExtractor`: per-turn compressed insight
//! - `MemoryConsolidator`: periodic rolling-summary rewrite
//! - `ConditionReconciler` / `ConditionResolver`: periodic condition diffing

pub mod box_embedder;
pub mod consolidation;
pub mod embedder;
pub mod insight;
pub mod reconciliation;
pub mod resolver;
