//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `billing` - Tenant access, subscriptions and webhook reconciliation

pub mod billing;
pub mod foundation;
