//! Request and response bodies for the billing endpoints.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::application::{CreateSubscriptionResult, GetTenantAccessResult};
use crate::domain::billing::{AccessStatus, BillingCycle, PlanType, SubscriptionStatus};
use crate::domain::foundation::{TenantId, Timestamp};

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCustomerRequest {
    pub tenant_id: TenantId,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub tenant_id: TenantId,
    pub plan_type: PlanType,
    pub billing_cycle: BillingCycle,
    #[serde(default)]
    pub extra_users_count: u32,
    #[serde(default)]
    pub trial_days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenPortalRequest {
    pub customer_id: String,
    pub return_url: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerResponse {
    pub customer_id: String,
    pub existing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub subscription_id: String,
    /// Always present, `null` when no payment confirmation is due.
    pub client_secret: Option<String>,
    pub status: SubscriptionStatus,
    pub access_status: AccessStatus,
    pub current_period_end: Option<Timestamp>,
}

impl From<CreateSubscriptionResult> for SubscriptionResponse {
    fn from(result: CreateSubscriptionResult) -> Self {
        Self {
            subscription_id: result.subscription_id,
            client_secret: result.client_secret,
            status: result.status,
            access_status: result.access,
            current_period_end: result.current_period_end,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalResponse {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantAccessResponse {
    pub tenant_id: TenantId,
    pub access_status: AccessStatus,
    pub has_paid_entry_fee: bool,
}

impl From<GetTenantAccessResult> for TenantAccessResponse {
    fn from(result: GetTenantAccessResult) -> Self {
        Self {
            tenant_id: result.tenant_id,
            access_status: result.access_status,
            has_paid_entry_fee: result.has_paid_entry_fee,
        }
    }
}

/// Webhook acknowledgement. `skipped` only appears for duplicates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
}

impl WebhookAck {
    pub fn processed() -> Self {
        Self {
            received: true,
            skipped: None,
        }
    }

    pub fn duplicate() -> Self {
        Self {
            received: true,
            skipped: Some(true),
        }
    }
}

/// Error body for the provisioning endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Error body for the webhook endpoint; the gateway only looks at the status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscription_request_defaults_optional_fields() {
        let request: CreateSubscriptionRequest = serde_json::from_value(json!({
            "tenant_id": TenantId::new(),
            "plan_type": "premium",
            "billing_cycle": "yearly"
        }))
        .unwrap();

        assert_eq!(request.plan_type, PlanType::Premium);
        assert_eq!(request.extra_users_count, 0);
        assert!(request.trial_days.is_none());
    }

    #[test]
    fn unknown_plan_is_rejected() {
        let result = serde_json::from_value::<CreateSubscriptionRequest>(json!({
            "tenant_id": TenantId::new(),
            "plan_type": "enterprise",
            "billing_cycle": "monthly"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn null_client_secret_is_serialized() {
        let response = SubscriptionResponse {
            subscription_id: "sub_1".to_string(),
            client_secret: None,
            status: SubscriptionStatus::Active,
            access_status: AccessStatus::Active,
            current_period_end: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("client_secret").unwrap().is_null());
        assert_eq!(value["status"], "active");
    }

    #[test]
    fn webhook_ack_shapes() {
        assert_eq!(
            serde_json::to_value(WebhookAck::processed()).unwrap(),
            json!({ "received": true })
        );
        assert_eq!(
            serde_json::to_value(WebhookAck::duplicate()).unwrap(),
            json!({ "received": true, "skipped": true })
        );
    }
}
