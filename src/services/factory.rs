/// Factory: build process-wide services from application `Config`.
///
/// Everything built here is immutable after startup and shared through
/// `Arc` between all in-flight requests.
use std::sync::Arc;

use reqwest::Client as HttpClient;

use crate::config::{Config, ConfigError};
use crate::error::ErrorResponder;
use crate::fabric::Upstream;
use crate::middleware::passport::PassportFilter;
use crate::middleware::passport::headers::TrustedHeaderPrefix;
use crate::services::auth::TokenValidator;
use crate::services::passport::{HttpPassportClient, IssuerSettings};
use crate::services::paths::PathClassifier;

pub fn build_passport_filter(config: &Config) -> Result<Arc<PassportFilter>, ConfigError> {
    let classifier = PathClassifier::new(&config.anonymous_paths, &config.validation_exempt_paths)
        .map_err(|e| {
            tracing::warn!(error = %e, "invalid path pattern");
            ConfigError::Invalid("ANONYMOUS_PATHS/VALIDATION_EXEMPT_PATHS")
        })?;

    let validator = TokenValidator::new(&config.jwt_secret_key, config.token_leeway_seconds);

    let passport_client = HttpPassportClient::new(IssuerSettings {
        base_url: config.passport_issuer_base_url.clone(),
        bearer_prefix: config.bearer_prefix.clone(),
        passport_lifetime: config.passport_lifetime,
        connect_timeout: config.issuer_connect_timeout,
        response_timeout: config.issuer_response_timeout,
    })
    .map_err(|e| {
        tracing::warn!(error = %e, "failed to build passport client");
        ConfigError::Invalid("PASSPORT_ISSUER_BASE_URL")
    })?;
    tracing::info!(endpoint = %passport_client.endpoint(), "passport issuer configured");

    let header_prefix = TrustedHeaderPrefix::new(config.trusted_header_prefix.clone())
        .map_err(|_| ConfigError::Invalid("TRUSTED_HEADER_PREFIX"))?;

    Ok(Arc::new(PassportFilter::new(
        classifier,
        validator,
        Arc::new(passport_client),
        config.bearer_prefix.clone(),
        header_prefix,
        ErrorResponder::new(config.auth_failure_status),
    )))
}

pub fn build_upstream(config: &Config) -> Result<Arc<Upstream>, ConfigError> {
    let http_client = HttpClient::builder()
        .build()
        .map_err(|_| ConfigError::Invalid("UPSTREAM_BASE_URL"))?;

    Ok(Arc::new(Upstream::new(
        http_client,
        config.upstream_base_url.clone(),
    )))
}
