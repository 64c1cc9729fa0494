//! Bearer token middleware for the provisioning endpoints.
//!
//! Callers are trusted services, so authentication is a shared-token check:
//!
//! ```text
//! Authorization: Bearer <token>
//! ```
//!
//! ```ignore
//! let tokens = ApiTokens::new(config.auth.tokens());
//! let app = Router::new()
//!     .route("/api/billing/customers", post(create_customer))
//!     .route_layer(middleware::from_fn_with_state(tokens, bearer_auth));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;

/// Accepted bearer tokens. An empty set rejects every request.
#[derive(Clone, Default)]
pub struct ApiTokens(Arc<Vec<String>>);

impl ApiTokens {
    pub fn new(tokens: Vec<String>) -> Self {
        Self(Arc::new(tokens))
    }

    /// Compares against every configured token in constant time.
    pub fn accepts(&self, candidate: &str) -> bool {
        self.0
            .iter()
            .fold(false, |found, token| {
                found | bool::from(token.as_bytes().ct_eq(candidate.as_bytes()))
            })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for ApiTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiTokens").field("count", &self.0.len()).finish()
    }
}

/// Rejects requests without a configured bearer token.
pub async fn bearer_auth(State(tokens): State<ApiTokens>, request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match token {
        Some(token) if tokens.accepts(token) => next.run(request).await,
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "Rejected unknown API token");
            unauthorized("Invalid token")
        }
        None => unauthorized("Missing bearer token"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": message,
            "code": "AUTH_ERROR"
        })),
    )
        .into_response()
}
