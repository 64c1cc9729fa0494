//! HTTP middleware for axum.
//!
//! - `auth` - Bearer token check for the provisioning endpoints

pub mod auth;

pub use auth::{bearer_auth, ApiTokens};
