//! Billing Reconciler - Keeps tenant access in step with Stripe subscriptions.
//!
//! Ingests signed Stripe webhooks, applies each event at most once, and
//! re-derives a tenant's subscription record and access flag from the
//! gateway's current view. Also provisions customers, subscriptions and
//! billing portal sessions.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
