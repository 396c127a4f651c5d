//! Trusted header injection.
//!
//! Every passport entry becomes one `<prefix><key>` header on the request
//! that is forwarded downstream. Client-supplied headers under the prefix
//! are dropped before anything is forwarded (`strip`); headers outside the
//! prefix are never touched.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

use crate::services::passport::Passport;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectError {
    #[error("invalid trusted header prefix: {0}")]
    InvalidPrefix(String),
    #[error("passport key cannot be used as a header name: {0}")]
    InvalidClaimKey(String),
    #[error("passport value for '{0}' cannot be used as a header value")]
    InvalidClaimValue(String),
}

/// Validated header-name prefix (default `X-PP-`), kept lowercase since
/// header names compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedHeaderPrefix(String);

impl TrustedHeaderPrefix {
    pub fn new(prefix: impl Into<String>) -> Result<Self, InjectError> {
        let prefix = prefix.into();
        // A prefix is valid if it yields a valid header name once a key is appended.
        if prefix.is_empty() || HeaderName::from_bytes(format!("{prefix}k").as_bytes()).is_err() {
            return Err(InjectError::InvalidPrefix(prefix));
        }
        Ok(Self(prefix.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn header_name(&self, key: &str) -> Result<HeaderName, InjectError> {
        if key.is_empty() {
            return Err(InjectError::InvalidClaimKey(key.to_string()));
        }
        HeaderName::from_bytes(format!("{}{}", self.0, key).as_bytes())
            .map_err(|_| InjectError::InvalidClaimKey(key.to_string()))
    }

    pub fn covers(&self, name: &HeaderName) -> bool {
        name.as_str().starts_with(&self.0)
    }
}

impl Default for TrustedHeaderPrefix {
    fn default() -> Self {
        Self("x-pp-".to_string())
    }
}

/// Drops every header under `prefix`, returning how many names were removed.
pub fn strip(headers: &mut HeaderMap, prefix: &TrustedHeaderPrefix) -> usize {
    let spoofed: Vec<HeaderName> = headers
        .keys()
        .filter(|name| prefix.covers(name))
        .cloned()
        .collect();

    for name in &spoofed {
        headers.remove(name);
    }
    spoofed.len()
}

/// Returns a copy of `headers` with one trusted header per passport entry.
///
/// All entries are converted before anything is written, so an invalid
/// entry leaves no partially injected header set behind. Trusted headers
/// are inserted (not appended), so injecting the same passport twice gives
/// the same result as injecting it once.
pub fn inject(
    headers: &HeaderMap,
    passport: &Passport,
    prefix: &TrustedHeaderPrefix,
) -> Result<HeaderMap, InjectError> {
    let entries = passport
        .iter()
        .map(|(key, value)| {
            let name = prefix.header_name(key)?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| InjectError::InvalidClaimValue(key.to_string()))?;
            Ok((name, value))
        })
        .collect::<Result<Vec<_>, InjectError>>()?;

    let mut injected = headers.clone();
    for (name, value) in entries {
        injected.insert(name, value);
    }

    Ok(injected)
}
