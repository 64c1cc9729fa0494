//! Stripe payment gateway adapter.
//!
//! Implements the `PaymentGateway` port for Stripe:
//! - Customer creation
//! - Subscription creation and re-fetch
//! - Billing portal sessions
//!
//! Webhook verification lives in the billing domain; this adapter only talks
//! to the REST API. The secret key is held as `secrecy::SecretString`.

mod mock_payment_gateway;
mod stripe_gateway;

pub use mock_payment_gateway::{MethodCall, MockPaymentGateway};
pub use stripe_gateway::{StripeConfig, StripeGateway};
