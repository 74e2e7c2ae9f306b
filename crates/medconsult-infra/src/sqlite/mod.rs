//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools. Nearest-neighbour queries load the user's
//! candidate vectors and rank them in-process with
//! `medconsult_core::vector`.

pub mod codec;
pub mod condition;
pub mod consultation;
pub mod pool;
pub mod timeline;
pub mod user;
pub mod vitals;
