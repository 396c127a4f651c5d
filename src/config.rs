/*
 * Responsibility
 * - Load gateway settings from the environment (.env supported)
 * - Validate values at startup (missing or malformed input aborts boot)
 * - Path pattern lists, issuer endpoint, signing secret, timeouts
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::http::StatusCode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::TimeDelta;
use url::Url;

use crate::services::paths::{DEFAULT_ANONYMOUS_PATHS, DEFAULT_VALIDATION_EXEMPT_PATHS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    // Passport issuance authority (POST <base>/api/passport)
    pub passport_issuer_base_url: Url,
    // Backend the prepared request is forwarded to
    pub upstream_base_url: Url,

    // HS256 secret, already base64-decoded
    pub jwt_secret_key: Vec<u8>,
    pub token_leeway_seconds: u64,

    pub bearer_prefix: String,
    pub trusted_header_prefix: String,
    pub passport_lifetime: TimeDelta,

    pub issuer_connect_timeout: Duration,
    pub issuer_response_timeout: Duration,
    pub request_timeout: Duration,

    pub auth_failure_status: StatusCode,

    pub anonymous_paths: Vec<String>,
    pub validation_exempt_paths: Vec<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("passport_issuer_base_url", &self.passport_issuer_base_url.as_str())
            .field("upstream_base_url", &self.upstream_base_url.as_str())
            .field("bearer_prefix", &self.bearer_prefix)
            .field("trusted_header_prefix", &self.trusted_header_prefix)
            .field("passport_lifetime", &self.passport_lifetime)
            .field("issuer_connect_timeout", &self.issuer_connect_timeout)
            .field("issuer_response_timeout", &self.issuer_response_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("auth_failure_status", &self.auth_failure_status)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// `from_env` is the production entry point; tests feed a map instead of
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = lookup("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(8000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let cors_allowed_origins = split_list(lookup("CORS_ALLOWED_ORIGINS").unwrap_or_default());

        let passport_issuer_base_url = parse_base_url(&lookup, "PASSPORT_ISSUER_BASE_URL")?;
        let upstream_base_url = parse_base_url(&lookup, "UPSTREAM_BASE_URL")?;

        let jwt_secret_key = lookup("JWT_SECRET_KEY")
            .ok_or(ConfigError::Missing("JWT_SECRET_KEY"))
            .and_then(|raw| {
                STANDARD
                    .decode(raw.trim())
                    .map_err(|_| ConfigError::Invalid("JWT_SECRET_KEY"))
            })?;
        if jwt_secret_key.is_empty() {
            return Err(ConfigError::Invalid("JWT_SECRET_KEY"));
        }

        let token_leeway_seconds = parse_or(&lookup, "TOKEN_LEEWAY_SECONDS", 0u64);

        let bearer_prefix = lookup("BEARER_PREFIX").unwrap_or_else(|| "Bearer ".to_string());
        if bearer_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("BEARER_PREFIX"));
        }

        let trusted_header_prefix =
            lookup("TRUSTED_HEADER_PREFIX").unwrap_or_else(|| "X-PP-".to_string());

        let passport_lifetime =
            TimeDelta::try_minutes(parse_or(&lookup, "PASSPORT_LIFETIME_MINUTES", 30i64))
                .filter(|d| *d > TimeDelta::zero())
                .ok_or(ConfigError::Invalid("PASSPORT_LIFETIME_MINUTES"))?;

        let issuer_connect_timeout =
            Duration::from_millis(parse_or(&lookup, "ISSUER_CONNECT_TIMEOUT_MS", 1_000u64));
        let issuer_response_timeout =
            Duration::from_millis(parse_or(&lookup, "ISSUER_RESPONSE_TIMEOUT_MS", 10_000u64));
        let request_timeout =
            Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECONDS", 30u64));

        // The issuer call must give up before the end-to-end deadline does,
        // otherwise a slow issuer surfaces as a 408 instead of UNAUTHORIZED.
        if issuer_connect_timeout >= request_timeout || issuer_response_timeout >= request_timeout
        {
            return Err(ConfigError::Invalid("REQUEST_TIMEOUT_SECONDS"));
        }

        let auth_failure_status = match parse_or(&lookup, "AUTH_FAILURE_STATUS", 401u16) {
            401 => StatusCode::UNAUTHORIZED,
            403 => StatusCode::FORBIDDEN,
            _ => return Err(ConfigError::Invalid("AUTH_FAILURE_STATUS")),
        };

        let anonymous_paths = lookup("ANONYMOUS_PATHS")
            .map(split_list)
            .unwrap_or_else(|| to_owned_list(DEFAULT_ANONYMOUS_PATHS));
        let validation_exempt_paths = lookup("VALIDATION_EXEMPT_PATHS")
            .map(split_list)
            .unwrap_or_else(|| to_owned_list(DEFAULT_VALIDATION_EXEMPT_PATHS));

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            passport_issuer_base_url,
            upstream_base_url,
            jwt_secret_key,
            token_leeway_seconds,
            bearer_prefix,
            trusted_header_prefix,
            passport_lifetime,
            issuer_connect_timeout,
            issuer_response_timeout,
            request_timeout,
            auth_failure_status,
            anonymous_paths,
            validation_exempt_paths,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_base_url<F>(lookup: &F, key: &'static str) -> Result<Url, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).ok_or(ConfigError::Missing(key))?;
    let url = Url::parse(raw.trim()).map_err(|_| ConfigError::Invalid(key))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::Invalid(key)),
    }
}

fn split_list(raw: String) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
