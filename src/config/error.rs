//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is missing or does not parse into its field type.
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A loaded value that is well-typed but unusable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is not set")]
    MissingRequired(&'static str),

    // server
    #[error("Port must be non-zero")]
    InvalidPort,
    #[error("Request timeout out of range")]
    InvalidTimeout,
    #[error("Bind host is not an IP address: {0}")]
    InvalidBindAddress(String),

    // database
    #[error("Database URL must use the postgres:// or postgresql:// scheme")]
    InvalidDatabaseUrl,
    #[error("Pool bounds are inconsistent")]
    InvalidPoolSize,
    #[error("Pool size exceeds 100 connections")]
    PoolSizeTooLarge,

    // payment
    #[error("Stripe secret key must start with sk_")]
    InvalidStripeKey,
    #[error("Stripe webhook secret must start with whsec_")]
    InvalidStripeWebhookSecret,
    #[error("Signature tolerance must be between 1 and 3600 seconds")]
    InvalidSignatureTolerance,
    #[error("No price configured for {0}")]
    MissingPrice(&'static str),

    // auth
    #[error("Production requires at least one API token")]
    NoApiTokens,
    #[error("API tokens must be at least 32 characters")]
    WeakApiToken,
}
