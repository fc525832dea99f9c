//! Token providers for authenticating against the two API surfaces.
//!
//! The Data API expects the raw token in a dedicated header (`Token` by
//! default); the DevOps API expects `Authorization: Bearer <token>`. Both
//! header values are derived from a [`TokenProvider`], the seam through
//! which callers plug in their own credential sources (vaults, rotating
//! credentials, and so on).

use std::fmt;

use crate::config::DEFAULT_DEV_OPS_AUTH_PREFIX;

/// A source of authentication tokens.
///
/// Implementations must be cheap to call: the token is requested once per
/// commander construction, not per HTTP request.
pub trait TokenProvider: Send + Sync {
    /// Returns the current token, or `None` for unauthenticated access
    /// (e.g. a local self-hosted deployment with auth disabled).
    fn token(&self) -> Option<String>;
}

/// A fixed token known at construction time.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Wraps a literal token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn token(&self) -> Option<String> {
        Some(self.token.clone())
    }
}

// the token is a secret: never expose it through Debug output
impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticTokenProvider(***)")
    }
}

impl From<&str> for StaticTokenProvider {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for StaticTokenProvider {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

/// Renders the DevOps API `Authorization` header value for a token.
pub fn dev_ops_auth_value(token: &str) -> String {
    format!("{DEFAULT_DEV_OPS_AUTH_PREFIX}{token}")
}
