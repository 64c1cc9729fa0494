//! Application handlers.
//!
//! Command and query handlers that orchestrate billing operations.

pub mod billing;
