//! Passport issuance client.
//!
//! One `POST <issuer>/api/passport` per request, with the caller's
//! credential forwarded as the bearer token. No retries: a retried call
//! could make the issuer mint two passports for one logical request.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::header;
use chrono::TimeDelta;
use reqwest::Client as HttpClient;
use thiserror::Error;
use url::Url;

use crate::services::auth::Credential;
use crate::services::passport::types::{Passport, PassportRequest};

pub const PASSPORT_ENDPOINT: &[&str] = &["api", "passport"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PassportError {
    #[error("passport issuer timed out")]
    Timeout,
    #[error("passport request failed: {0}")]
    Request(String),
    #[error("passport issuer returned status {0}")]
    UnexpectedStatus(u16),
    #[error("passport response could not be parsed: {0}")]
    InvalidBody(String),
    #[error("passport client setup failed: {0}")]
    Setup(String),
}

impl From<reqwest::Error> for PassportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::InvalidBody(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Exchanges a credential for the claims of the requested destination.
///
/// Implementations must be cancel-safe: dropping the returned future aborts
/// the exchange and releases its connection.
#[async_trait]
pub trait PassportClient: Send + Sync {
    async fn exchange(
        &self,
        credential: &Credential,
        destination: &str,
    ) -> Result<Passport, PassportError>;
}

#[derive(Debug, Clone)]
pub struct IssuerSettings {
    pub base_url: Url,
    pub bearer_prefix: String,
    pub passport_lifetime: TimeDelta,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
}

/// `reqwest`-backed client. The connection pool is created once and shared.
#[derive(Debug, Clone)]
pub struct HttpPassportClient {
    http_client: HttpClient,
    endpoint: Url,
    bearer_prefix: String,
    passport_lifetime: TimeDelta,
}

impl HttpPassportClient {
    pub fn new(settings: IssuerSettings) -> Result<Self, PassportError> {
        let http_client = HttpClient::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.response_timeout)
            .build()
            .map_err(|e| PassportError::Setup(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: passport_endpoint(&settings.base_url)?,
            bearer_prefix: settings.bearer_prefix,
            passport_lifetime: settings.passport_lifetime,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl PassportClient for HttpPassportClient {
    async fn exchange(
        &self,
        credential: &Credential,
        destination: &str,
    ) -> Result<Passport, PassportError> {
        let request = PassportRequest::new(destination, self.passport_lifetime);
        tracing::debug!(
            passport_id = %request.passport_id,
            destination = %request.destination,
            "requesting passport"
        );

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .header(
                header::AUTHORIZATION,
                format!("{}{}", self.bearer_prefix, credential.as_str()),
            )
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PassportError::UnexpectedStatus(status.as_u16()));
        }

        let body = response.bytes().await?;
        serde_json::from_slice::<Passport>(&body)
            .map_err(|e| PassportError::InvalidBody(e.to_string()))
    }
}

/// `<base>/api/passport`, keeping any path prefix the base URL carries.
pub fn passport_endpoint(base_url: &Url) -> Result<Url, PassportError> {
    let mut endpoint = base_url.clone();
    endpoint
        .path_segments_mut()
        .map_err(|_| PassportError::Setup(format!("cannot extend base url {}", base_url)))?
        .pop_if_empty()
        .extend(PASSPORT_ENDPOINT);
    endpoint.set_query(None);
    endpoint.set_fragment(None);
    Ok(endpoint)
}
