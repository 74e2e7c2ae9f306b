//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (medconsult-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod condition;
pub mod consultation;
pub mod timeline;
pub mod user;
pub mod vitals;
