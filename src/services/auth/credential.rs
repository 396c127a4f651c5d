//! Bearer credential extraction from the `Authorization` header.

use std::fmt;

use axum::http::{HeaderMap, header};

/// Opaque bearer credential (the part after the scheme prefix).
///
/// Debug output is redacted so the raw token never reaches the logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Reads the first `Authorization` value and strips `prefix`.
///
/// Returns `None` when the header is missing, not valid visible ASCII,
/// uses another scheme, or carries nothing after the prefix. Absence is not
/// an error here; the caller decides whether the path needed a credential.
pub fn extract(headers: &HeaderMap, prefix: &str) -> Option<Credential> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(prefix)?;

    if token.trim().is_empty() {
        return None;
    }

    Some(Credential::new(token))
}
