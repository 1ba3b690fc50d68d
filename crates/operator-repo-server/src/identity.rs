//! Caller identity resolution.
//!
//! The identity is an opaque string trusted as-is from a request header.
//! There is no authentication; a missing header falls back to a configured
//! default user for local use.

use std::convert::Infallible;
use std::fmt;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName};

use crate::config::IdentityConfig;
use crate::server::AppState;

/// Identity of the caller a request is executed for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    pub fn new(user: impl Into<String>) -> Self {
        Self(user.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads the caller identity header, falling back to the default user.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    header: HeaderName,
    default_user: String,
}

impl IdentityResolver {
    pub fn from_config(cfg: &IdentityConfig) -> Result<Self, String> {
        let header = HeaderName::from_bytes(cfg.header.as_bytes())
            .map_err(|e| format!("invalid identity header '{}': {e}", cfg.header))?;
        Ok(Self {
            header,
            default_user: cfg.default_user.clone(),
        })
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Missing, empty and non-UTF-8 values all resolve to the default user.
    pub fn resolve(&self, headers: &HeaderMap) -> CallerIdentity {
        headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(CallerIdentity::new)
            .unwrap_or_else(|| CallerIdentity::new(self.default_user.clone()))
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self {
            header: HeaderName::from_static("x-userid"),
            default_user: "test".into(),
        }
    }
}

impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(state.identity.resolve(&parts.headers))
    }
}
