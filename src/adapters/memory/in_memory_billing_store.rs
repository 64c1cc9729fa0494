//! In-memory billing store.
//!
//! Implements every billing persistence port over one mutex-guarded state, so
//! each `apply` is trivially atomic. Used by tests and for running the service
//! without a database.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::billing::{Subscription, Tenant, MAX_EXTRA_SEATS};
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, TenantId, Timestamp};
use crate::ports::{
    ApplyResult, MarkResult, ProcessedEvent, ProcessedEventLedger, ReconciliationStore,
    ReconciliationWrite, SubscriptionRepository, TenantRepository,
};

#[derive(Default)]
struct State {
    tenants: HashMap<TenantId, Tenant>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    processed: HashMap<String, ProcessedEvent>,
    /// Count of subscription and tenant row writes made by `apply`.
    row_writes: usize,
    /// Number of upcoming `apply` calls that fail before writing anything.
    failing_applies: usize,
}

#[derive(Default)]
pub struct InMemoryBillingStore {
    state: Mutex<State>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a tenant directly.
    pub fn insert_tenant(&self, tenant: Tenant) {
        self.state().tenants.insert(tenant.id, tenant);
    }

    /// Seed a subscription row directly.
    pub fn insert_subscription(&self, subscription: Subscription) {
        self.state()
            .subscriptions
            .insert(subscription.id, subscription);
    }

    pub fn tenant(&self, id: &TenantId) -> Option<Tenant> {
        self.state().tenants.get(id).cloned()
    }

    pub fn subscriptions_for(&self, tenant_id: &TenantId) -> Vec<Subscription> {
        let mut rows: Vec<Subscription> = self
            .state()
            .subscriptions
            .values()
            .filter(|s| s.tenant_id == *tenant_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.created_at);
        rows
    }

    pub fn processed_event(&self, event_id: &str) -> Option<ProcessedEvent> {
        self.state().processed.get(event_id).cloned()
    }

    pub fn processed_count(&self) -> usize {
        self.state().processed.len()
    }

    /// Subscription and tenant row writes performed through `apply`.
    pub fn row_writes(&self) -> usize {
        self.state().row_writes
    }

    /// Make the next `count` calls to `apply` fail with a database error.
    pub fn fail_next_applies(&self, count: usize) {
        self.state().failing_applies = count;
    }
}

#[async_trait]
impl TenantRepository for InMemoryBillingStore {
    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError> {
        Ok(self.state().tenants.get(id).cloned())
    }

    async fn find_by_customer_ref(
        &self,
        customer_ref: &str,
    ) -> Result<Option<Tenant>, DomainError> {
        Ok(self
            .state()
            .tenants
            .values()
            .find(|t| t.customer_ref.as_deref() == Some(customer_ref))
            .cloned())
    }

    async fn set_customer_ref(&self, id: &TenantId, customer_ref: &str) -> Result<(), DomainError> {
        let mut state = self.state();
        let tenant = state.tenants.get_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::TenantNotFound, format!("Tenant {} not found", id))
        })?;
        match tenant.customer_ref.as_deref() {
            Some(existing) if existing != customer_ref => Err(DomainError::new(
                ErrorCode::Conflict,
                format!("Tenant {} already has customer {}", id, existing),
            )),
            _ => {
                tenant.customer_ref = Some(customer_ref.to_string());
                tenant.updated_at = Timestamp::now();
                Ok(())
            }
        }
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryBillingStore {
    async fn find_current_by_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<Subscription>, DomainError> {
        let state = self.state();
        let rows = state
            .subscriptions
            .values()
            .filter(|s| s.tenant_id == *tenant_id);
        Ok(rows
            .max_by_key(|s| (!s.status.is_terminal(), s.created_at))
            .cloned())
    }

    async fn find_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .state()
            .subscriptions
            .values()
            .find(|s| s.external_ref.as_deref() == Some(external_ref))
            .cloned())
    }
}

#[async_trait]
impl ProcessedEventLedger for InMemoryBillingStore {
    async fn has_processed(&self, event_id: &str) -> Result<bool, DomainError> {
        Ok(self.state().processed.contains_key(event_id))
    }

    async fn mark_processed(&self, event: &ProcessedEvent) -> Result<MarkResult, DomainError> {
        let mut state = self.state();
        if state.processed.contains_key(&event.event_id) {
            return Ok(MarkResult::AlreadyExists);
        }
        state
            .processed
            .insert(event.event_id.clone(), event.clone());
        Ok(MarkResult::Inserted)
    }
}

#[async_trait]
impl ReconciliationStore for InMemoryBillingStore {
    async fn apply(
        &self,
        write: &ReconciliationWrite,
        event: Option<&ProcessedEvent>,
    ) -> Result<ApplyResult, DomainError> {
        let mut state = self.state();

        if state.failing_applies > 0 {
            state.failing_applies -= 1;
            return Err(DomainError::database("injected apply failure"));
        }
        if let Some(event) = event {
            if state.processed.contains_key(&event.event_id) {
                return Ok(ApplyResult::DuplicateEvent);
            }
        }

        if write.subscription.extra_seats > MAX_EXTRA_SEATS {
            return Err(DomainError::validation(
                "extra_seats",
                format!("{} extra seats exceeds the storable maximum", write.subscription.extra_seats),
            ));
        }
        let tenant_id = write.subscription.tenant_id;
        if !state.tenants.contains_key(&tenant_id) {
            return Err(DomainError::new(
                ErrorCode::TenantNotFound,
                format!("Tenant {} not found", tenant_id),
            ));
        }
        let conflicting_live_row = state.subscriptions.values().any(|s| {
            s.tenant_id == tenant_id
                && s.id != write.subscription.id
                && !s.status.is_terminal()
                && !write.subscription.status.is_terminal()
        });
        if conflicting_live_row {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("Tenant {} already has a live subscription", tenant_id),
            ));
        }

        if let Some(event) = event {
            state
                .processed
                .insert(event.event_id.clone(), event.clone());
        }
        let mut subscription = write.subscription.clone();
        if let Some(stored) = state.subscriptions.get(&subscription.id) {
            // First activation time is kept once recorded.
            subscription.activated_at = stored.activated_at.or(subscription.activated_at);
        }
        state.subscriptions.insert(subscription.id, subscription);
        if let Some(tenant) = state.tenants.get_mut(&tenant_id) {
            tenant.access_status = write.access;
            tenant.updated_at = Timestamp::now();
        }
        state.row_writes += 2;

        Ok(ApplyResult::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{AccessStatus, BillingCycle, PlanType, SubscriptionStatus};
    use serde_json::json;

    fn seeded() -> (InMemoryBillingStore, Tenant) {
        let store = InMemoryBillingStore::new();
        let tenant = Tenant::new("Acme", "a@acme.test", true);
        store.insert_tenant(tenant.clone());
        (store, tenant)
    }

    fn write_for(tenant: &Tenant, status: SubscriptionStatus) -> ReconciliationWrite {
        let mut sub = Subscription::new(
            tenant.id,
            "cus_1",
            PlanType::Standard,
            BillingCycle::Monthly,
            0,
        );
        sub.transition_to(status, Timestamp::now());
        ReconciliationWrite {
            subscription: sub,
            access: AccessStatus::Active,
        }
    }

    #[tokio::test]
    async fn apply_writes_subscription_and_access() {
        let (store, tenant) = seeded();

        let result = store
            .apply(&write_for(&tenant, SubscriptionStatus::Active), None)
            .await
            .unwrap();

        assert_eq!(result, ApplyResult::Applied);
        assert_eq!(store.tenant(&tenant.id).unwrap().access_status, AccessStatus::Active);
        assert_eq!(store.subscriptions_for(&tenant.id).len(), 1);
        assert_eq!(store.row_writes(), 2);
    }

    #[tokio::test]
    async fn apply_refuses_unstorable_seat_count() {
        let (store, tenant) = seeded();
        let mut write = write_for(&tenant, SubscriptionStatus::Active);
        write.subscription.extra_seats = MAX_EXTRA_SEATS + 1;

        let err = store.apply(&write, None).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(store.row_writes(), 0);
    }

    #[tokio::test]
    async fn apply_keeps_first_activation_time() {
        let (store, tenant) = seeded();
        let first = write_for(&tenant, SubscriptionStatus::Active);
        let activated_at = first.subscription.activated_at;
        assert!(activated_at.is_some());
        store.apply(&first, None).await.unwrap();

        let mut later = first.clone();
        later.subscription.activated_at = None;
        later.subscription.status = SubscriptionStatus::PastDue;
        store.apply(&later, None).await.unwrap();

        let stored = store.subscriptions_for(&tenant.id);
        assert_eq!(stored[0].status, SubscriptionStatus::PastDue);
        assert_eq!(stored[0].activated_at, activated_at);
    }

    #[tokio::test]
    async fn apply_with_known_event_writes_nothing() {
        let (store, tenant) = seeded();
        let event = ProcessedEvent::new("evt_1", "invoice.paid", json!({}));
        store.mark_processed(&event).await.unwrap();

        let result = store
            .apply(&write_for(&tenant, SubscriptionStatus::Active), Some(&event))
            .await
            .unwrap();

        assert_eq!(result, ApplyResult::DuplicateEvent);
        assert_eq!(store.row_writes(), 0);
        assert!(store.subscriptions_for(&tenant.id).is_empty());
    }

    #[tokio::test]
    async fn apply_records_event_with_rows() {
        let (store, tenant) = seeded();
        let event = ProcessedEvent::new("evt_1", "invoice.paid", json!({}));

        store
            .apply(&write_for(&tenant, SubscriptionStatus::Active), Some(&event))
            .await
            .unwrap();

        assert!(store.has_processed("evt_1").await.unwrap());
    }

    #[tokio::test]
    async fn injected_failure_leaves_state_untouched() {
        let (store, tenant) = seeded();
        store.fail_next_applies(1);
        let event = ProcessedEvent::new("evt_1", "invoice.paid", json!({}));

        let result = store
            .apply(&write_for(&tenant, SubscriptionStatus::Active), Some(&event))
            .await;

        assert!(result.is_err());
        assert!(!store.has_processed("evt_1").await.unwrap());
        assert_eq!(store.row_writes(), 0);
    }

    #[tokio::test]
    async fn second_live_row_for_tenant_is_rejected() {
        let (store, tenant) = seeded();
        store
            .apply(&write_for(&tenant, SubscriptionStatus::Active), None)
            .await
            .unwrap();

        let err = store
            .apply(&write_for(&tenant, SubscriptionStatus::Trial), None)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn mark_processed_detects_duplicates() {
        let store = InMemoryBillingStore::new();
        let event = ProcessedEvent::new("evt_1", "invoice.paid", json!({}));

        assert_eq!(store.mark_processed(&event).await.unwrap(), MarkResult::Inserted);
        assert_eq!(
            store.mark_processed(&event).await.unwrap(),
            MarkResult::AlreadyExists
        );
    }

    #[tokio::test]
    async fn current_subscription_prefers_live_row() {
        let (store, tenant) = seeded();
        let mut old = Subscription::new(tenant.id, "cus_1", PlanType::Standard, BillingCycle::Monthly, 0);
        old.transition_to(SubscriptionStatus::Canceled, Timestamp::now());
        let live = Subscription::new(tenant.id, "cus_1", PlanType::Premium, BillingCycle::Monthly, 0);
        store.insert_subscription(live.clone());
        store.insert_subscription(old);

        let current = store.find_current_by_tenant(&tenant.id).await.unwrap().unwrap();

        assert_eq!(current.id, live.id);
    }

    #[tokio::test]
    async fn set_customer_ref_is_idempotent_for_same_value() {
        let (store, tenant) = seeded();
        store.set_customer_ref(&tenant.id, "cus_1").await.unwrap();
        store.set_customer_ref(&tenant.id, "cus_1").await.unwrap();

        let err = store.set_customer_ref(&tenant.id, "cus_2").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }
}
