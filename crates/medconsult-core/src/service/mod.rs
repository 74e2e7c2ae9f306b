//! Business logic services (use cases).
//!
//! Services orchestrate repository and provider calls and enforce business
//! rules. They depend on traits (ports) -- never on concrete infrastructure
//! implementations.

pub mod consultation;
pub mod records;
