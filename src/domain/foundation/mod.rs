//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps and error types shared by the billing domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{SubscriptionId, TenantId};
pub use timestamp::Timestamp;
