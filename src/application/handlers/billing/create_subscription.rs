//! CreateSubscriptionHandler - Starts a paid subscription for a tenant.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::billing::{
    map_gateway_status, AccessStatus, BillingCycle, BillingError, GatewaySubscription, LineItem,
    PlanType, PriceTable, Subscription, SubscriptionStatus, CYCLE_METADATA_KEY, MAX_EXTRA_SEATS,
    PLAN_METADATA_KEY, TENANT_METADATA_KEY,
};
use crate::domain::foundation::{DomainError, ErrorCode, TenantId, Timestamp};
use crate::ports::{
    CreateSubscriptionRequest, PaymentGateway, ReconciliationStore, ReconciliationWrite,
    SubscriptionRepository, TenantRepository,
};

#[derive(Debug, Clone)]
pub struct CreateSubscriptionCommand {
    pub tenant_id: TenantId,
    pub plan: PlanType,
    pub cycle: BillingCycle,
    pub extra_seats: u32,
    /// Overrides the configured trial length when present.
    pub trial_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSubscriptionResult {
    /// Gateway subscription reference.
    pub subscription_id: String,
    /// Secret the client uses to confirm the first payment, when one is due.
    pub client_secret: Option<String>,
    pub status: SubscriptionStatus,
    pub access: AccessStatus,
    pub current_period_end: Option<Timestamp>,
}

/// Creates the gateway subscription, then records it locally.
///
/// The initial local status comes from the same status mapping the webhook
/// reconciler uses, so both paths agree on what a gateway status means.
pub struct CreateSubscriptionHandler {
    tenants: Arc<dyn TenantRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    store: Arc<dyn ReconciliationStore>,
    gateway: Arc<dyn PaymentGateway>,
    prices: PriceTable,
    default_trial_days: u32,
}

impl CreateSubscriptionHandler {
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        store: Arc<dyn ReconciliationStore>,
        gateway: Arc<dyn PaymentGateway>,
        prices: PriceTable,
    ) -> Self {
        Self {
            tenants,
            subscriptions,
            store,
            gateway,
            prices,
            default_trial_days: 0,
        }
    }

    pub fn with_default_trial_days(mut self, days: u32) -> Self {
        self.default_trial_days = days;
        self
    }

    pub async fn handle(
        &self,
        cmd: CreateSubscriptionCommand,
    ) -> Result<CreateSubscriptionResult, BillingError> {
        // 1. Preconditions, in the order callers should fix them
        if cmd.extra_seats > MAX_EXTRA_SEATS {
            return Err(BillingError::validation(
                "extra_seats",
                format!("At most {} extra seats are supported", MAX_EXTRA_SEATS),
            ));
        }
        let tenant = self
            .tenants
            .find_by_id(&cmd.tenant_id)
            .await?
            .ok_or(BillingError::TenantNotFound(cmd.tenant_id))?;

        if !tenant.has_paid_entry_fee {
            return Err(BillingError::EntryFeeUnpaid(cmd.tenant_id));
        }
        let customer_ref = tenant
            .customer_ref
            .clone()
            .ok_or(BillingError::CustomerRequired(cmd.tenant_id))?;

        let current = self.subscriptions.find_current_by_tenant(&cmd.tenant_id).await?;
        if current.as_ref().is_some_and(|s| s.status.grants_access()) {
            return Err(BillingError::AlreadySubscribed(cmd.tenant_id));
        }

        // 2. Gateway subscription
        let trial_days = cmd.trial_days.unwrap_or(self.default_trial_days);
        let idempotency_key = subscription_idempotency_key(&cmd, current.as_ref(), trial_days);
        let metadata = HashMap::from([
            (TENANT_METADATA_KEY.to_string(), cmd.tenant_id.to_string()),
            (PLAN_METADATA_KEY.to_string(), cmd.plan.to_string()),
            (CYCLE_METADATA_KEY.to_string(), cmd.cycle.to_string()),
        ]);
        let created = self
            .gateway
            .create_subscription(CreateSubscriptionRequest {
                customer_id: customer_ref.clone(),
                items: LineItem::build_order(&self.prices, cmd.plan, cmd.cycle, cmd.extra_seats),
                trial_days,
                metadata,
                idempotency_key: Some(idempotency_key),
            })
            .await?;

        // 3. Local record: reuse a non-terminal row, otherwise start a new one
        let mut record = match current {
            Some(row) if !row.status.is_terminal() => row,
            _ => Subscription::new(cmd.tenant_id, customer_ref.clone(), cmd.plan, cmd.cycle, 0),
        };
        let mapping = map_gateway_status(&created.status);
        record.customer_ref = customer_ref;
        record.external_ref = Some(created.id.clone());
        record.plan = cmd.plan;
        record.cycle = cmd.cycle;
        record.extra_seats = cmd.extra_seats;
        record.current_period_end = created
            .current_period_end
            .and_then(Timestamp::from_unix_secs);
        record.transition_to(mapping.status, Timestamp::now());

        let write = ReconciliationWrite {
            access: tenant.effective_access(mapping.access),
            subscription: record,
        };

        match self.store.apply(&write, None).await {
            Ok(_) => {}
            Err(e) if e.code == ErrorCode::Conflict => {
                return self.adopt_webhook_row(&cmd.tenant_id, &created, e).await;
            }
            Err(e) => return Err(self.partial_write(&cmd.tenant_id, &created.id, e)),
        }

        tracing::info!(
            tenant_id = %cmd.tenant_id,
            subscription = %created.id,
            status = %write.subscription.status,
            access = %write.access,
            "Created subscription"
        );

        Ok(CreateSubscriptionResult {
            subscription_id: created.id.clone(),
            client_secret: created.client_secret(),
            status: write.subscription.status,
            access: write.access,
            current_period_end: write.subscription.current_period_end,
        })
    }

    /// A webhook for the new subscription can commit before this handler does.
    /// When the live row it wrote is ours, report it instead of failing.
    async fn adopt_webhook_row(
        &self,
        tenant_id: &TenantId,
        created: &GatewaySubscription,
        conflict: DomainError,
    ) -> Result<CreateSubscriptionResult, BillingError> {
        let row = self.subscriptions.find_current_by_tenant(tenant_id).await?;
        let tenant = self.tenants.find_by_id(tenant_id).await?;
        match (row, tenant) {
            (Some(row), Some(tenant)) if row.external_ref.as_deref() == Some(created.id.as_str()) => {
                tracing::info!(
                    tenant_id = %tenant_id,
                    subscription = %created.id,
                    "Subscription already recorded by webhook"
                );
                Ok(CreateSubscriptionResult {
                    subscription_id: created.id.clone(),
                    client_secret: created.client_secret(),
                    status: row.status,
                    access: tenant.access_status,
                    current_period_end: row.current_period_end,
                })
            }
            _ => Err(self.partial_write(tenant_id, &created.id, conflict)),
        }
    }

    fn partial_write(&self, tenant_id: &TenantId, subscription: &str, err: DomainError) -> BillingError {
        tracing::error!(
            critical = true,
            tenant_id = %tenant_id,
            subscription = %subscription,
            error = %err,
            "Gateway subscription created but not recorded locally, manual reconciliation required"
        );
        BillingError::infrastructure(err.to_string())
    }
}

/// Same tenant, same prior row and same order give the same key, so a retried
/// request cannot open a second gateway subscription.
fn subscription_idempotency_key(
    cmd: &CreateSubscriptionCommand,
    current: Option<&Subscription>,
    trial_days: u32,
) -> String {
    let prior = current.map_or_else(|| "none".to_string(), |row| row.id.to_string());
    format!(
        "subscription-{}-{}-{}-{}-{}-{}",
        cmd.tenant_id, prior, cmd.plan, cmd.cycle, cmd.extra_seats, trial_days
    )
}
