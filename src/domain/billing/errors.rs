//! Billing-specific error types for the provisioning flows.
//!
//! Business-rule violations get their own variants so callers can show a
//! specific message instead of a generic failure.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | ValidationFailed | 400 |
//! | CustomerRequired | 400 |
//! | AlreadySubscribed | 400 |
//! | EntryFeeUnpaid | 403 |
//! | TenantNotFound | 404 |
//! | CustomerNotFound | 404 |
//! | Gateway | 502 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, TenantId, ValidationError};
use crate::ports::PaymentError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// Request is missing a field or carries an invalid value.
    ValidationFailed { field: String, message: String },

    /// No tenant with this id.
    TenantNotFound(TenantId),

    /// No tenant owns this gateway customer reference.
    CustomerNotFound(String),

    /// Tenant has no gateway customer yet.
    CustomerRequired(TenantId),

    /// Tenant has not paid the entry fee.
    EntryFeeUnpaid(TenantId),

    /// Tenant already has an active or trialing subscription.
    AlreadySubscribed(TenantId),

    /// Gateway rejected or failed the call.
    Gateway(String),

    /// Local persistence failed.
    Infrastructure(String),
}

impl BillingError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn tenant_not_found(id: TenantId) -> Self {
        BillingError::TenantNotFound(id)
    }

    pub fn customer_not_found(customer_ref: impl Into<String>) -> Self {
        BillingError::CustomerNotFound(customer_ref.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Stable machine-checkable code, also used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::ValidationFailed { .. } => "VALIDATION_FAILED",
            BillingError::TenantNotFound(_) => "TENANT_NOT_FOUND",
            BillingError::CustomerNotFound(_) => "CUSTOMER_NOT_FOUND",
            BillingError::CustomerRequired(_) => "CUSTOMER_REQUIRED",
            BillingError::EntryFeeUnpaid(_) => "ENTRY_FEE_UNPAID",
            BillingError::AlreadySubscribed(_) => "ALREADY_SUBSCRIBED",
            BillingError::Gateway(_) => "GATEWAY_ERROR",
            BillingError::Infrastructure(_) => "INTERNAL_ERROR",
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> String {
        match self {
            BillingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            BillingError::TenantNotFound(id) => format!("Tenant not found: {}", id),
            BillingError::CustomerNotFound(customer) => {
                format!("No tenant owns customer {}", customer)
            }
            BillingError::CustomerRequired(id) => {
                format!("Tenant {} has no billing customer; create one first", id)
            }
            BillingError::EntryFeeUnpaid(id) => {
                format!("Tenant {} must pay the entry fee before subscribing", id)
            }
            BillingError::AlreadySubscribed(id) => {
                format!("Tenant {} already has an active subscription", id)
            }
            BillingError::Gateway(reason) => format!("Payment gateway error: {}", reason),
            BillingError::Infrastructure(reason) => format!("Internal error: {}", reason),
        }
    }

    /// True when the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BillingError::Gateway(_) | BillingError::Infrastructure(_))
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => BillingError::ValidationFailed {
                field: err.details.get("field").cloned().unwrap_or_default(),
                message: err.message,
            },
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::validation(err.field().to_string(), err.to_string())
    }
}

impl From<PaymentError> for BillingError {
    fn from(err: PaymentError) -> Self {
        BillingError::Gateway(err.to_string())
    }
}
