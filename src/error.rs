/*
 * Responsibility
 * - Gateway failure taxonomy (one variant per failure kind)
 * - Mapping to HTTP status + stable error code + JSON body
 * - Conversion from component errors (token / passport / header injection)
 */
use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::middleware::passport::headers::InjectError;
use crate::services::auth::TokenError;
use crate::services::passport::PassportError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("no credential presented")]
    MissingCredential,
    #[error("credential is malformed or could not be verified")]
    InvalidCredential,
    #[error("credential has expired")]
    ExpiredCredential,
    #[error("passport issuance failed")]
    IssuanceUnavailable,
    #[error("request path contains dot segments or backslashes")]
    NonCanonicalPath,
    #[error("unexpected gateway failure: {0}")]
    Unclassified(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    EmptyToken,
    InvalidToken,
    ExpiredToken,
    Unauthorized,
    BadRequest,
    InternalServerError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::EmptyToken => "EMPTY_TOKEN",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::ExpiredToken => "EXPIRED_TOKEN",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::EmptyToken => "access token is empty.",
            ErrorCode::InvalidToken => "access token is invalid.",
            ErrorCode::ExpiredToken => "access token has expired.",
            ErrorCode::Unauthorized => "authentication is required.",
            ErrorCode::BadRequest => "request path is not allowed.",
            ErrorCode::InternalServerError => "internal server error.",
        }
    }
}

impl GatewayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::MissingCredential => ErrorCode::EmptyToken,
            GatewayError::InvalidCredential => ErrorCode::InvalidToken,
            GatewayError::ExpiredCredential => ErrorCode::ExpiredToken,
            GatewayError::IssuanceUnavailable => ErrorCode::Unauthorized,
            GatewayError::NonCanonicalPath => ErrorCode::BadRequest,
            GatewayError::Unclassified(_) => ErrorCode::InternalServerError,
        }
    }

    /// Failures caused by the caller's credential (as opposed to the
    /// issuer or the gateway itself).
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            GatewayError::MissingCredential
                | GatewayError::InvalidCredential
                | GatewayError::ExpiredCredential
        )
    }
}

/// Client-facing envelope: `{ isSuccess, code, message, result }`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub is_success: bool,
    pub code: &'static str,
    pub message: String,
    pub result: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn failure(code: ErrorCode, result: Option<T>) -> Self {
        Self {
            is_success: false,
            code: code.as_str(),
            message: code.message().to_string(),
            result,
        }
    }
}

/// Writes the response for a failed request.
///
/// Credential failures use `auth_failure_status` (401 unless configured to
/// 403); issuance failures are always 401; a non-canonical path is 400;
/// anything unclassified is 500.
/// The body never carries internal detail; `Unclassified` detail goes to
/// the log only.
#[derive(Debug, Clone, Copy)]
pub struct ErrorResponder {
    auth_failure_status: StatusCode,
}

impl Default for ErrorResponder {
    fn default() -> Self {
        Self::new(StatusCode::UNAUTHORIZED)
    }
}

impl ErrorResponder {
    pub fn new(auth_failure_status: StatusCode) -> Self {
        Self {
            auth_failure_status,
        }
    }

    pub fn status_for(&self, err: &GatewayError) -> StatusCode {
        if err.is_credential_failure() {
            return self.auth_failure_status;
        }
        match err {
            GatewayError::NonCanonicalPath => StatusCode::BAD_REQUEST,
            GatewayError::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn respond(&self, err: &GatewayError) -> Response {
        let code = err.code();
        let body = ApiResponse::<serde_json::Value>::failure(code, None);

        let bytes = serde_json::to_vec(&body).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to serialize error response");
            code.message().as_bytes().to_vec()
        });

        (
            self.status_for(err),
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )],
            bytes,
        )
            .into_response()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        ErrorResponder::default().respond(&self)
    }
}

impl From<TokenError> for GatewayError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Empty => GatewayError::MissingCredential,
            TokenError::Invalid(_) => GatewayError::InvalidCredential,
            TokenError::Expired { .. } => GatewayError::ExpiredCredential,
        }
    }
}

impl From<PassportError> for GatewayError {
    fn from(e: PassportError) -> Self {
        match e {
            // Misconfigured client, not an issuer outage
            PassportError::Setup(detail) => GatewayError::Unclassified(detail),
            _ => GatewayError::IssuanceUnavailable,
        }
    }
}

impl From<InjectError> for GatewayError {
    fn from(e: InjectError) -> Self {
        match e {
            // The issuer handed back a key/value that cannot be a header
            InjectError::InvalidClaimKey(_) | InjectError::InvalidClaimValue(_) => {
                GatewayError::IssuanceUnavailable
            }
            InjectError::InvalidPrefix(prefix) => {
                GatewayError::Unclassified(format!("invalid trusted header prefix: {prefix}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn credential_failures_map_to_their_codes() {
        let responder = ErrorResponder::default();

        for (err, code) in [
            (GatewayError::MissingCredential, "EMPTY_TOKEN"),
            (GatewayError::InvalidCredential, "INVALID_TOKEN"),
            (GatewayError::ExpiredCredential, "EXPIRED_TOKEN"),
        ] {
            let response = responder.respond(&err);
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                response.headers().get(header::CONTENT_TYPE).unwrap(),
                "application/json"
            );

            let body = body_json(response).await;
            assert_eq!(body["isSuccess"], json!(false));
            assert_eq!(body["code"], json!(code));
            assert_eq!(body["result"], Value::Null);
            assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
        }
    }

    #[tokio::test]
    async fn credential_failure_status_is_configurable() {
        let responder = ErrorResponder::new(StatusCode::FORBIDDEN);

        assert_eq!(
            responder.respond(&GatewayError::ExpiredCredential).status(),
            StatusCode::FORBIDDEN
        );
        // issuance failures keep 401 regardless
        assert_eq!(
            responder.respond(&GatewayError::IssuanceUnavailable).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn issuance_failure_is_unauthorized() {
        let response = GatewayError::IssuanceUnavailable.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], json!("UNAUTHORIZED"));
    }

    #[tokio::test]
    async fn unclassified_does_not_leak_detail() {
        let response =
            GatewayError::Unclassified("connection pool poisoned at 0xdeadbeef".to_string())
                .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["code"], json!("INTERNAL_SERVER_ERROR"));
        assert!(!body.to_string().contains("deadbeef"));
    }

    #[tokio::test]
    async fn non_canonical_path_is_bad_request_even_with_403_configured() {
        let response =
            ErrorResponder::new(StatusCode::FORBIDDEN).respond(&GatewayError::NonCanonicalPath);

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], json!("BAD_REQUEST"));
    }

    #[test]
    fn status_follows_credential_failure_classification() {
        let responder = ErrorResponder::new(StatusCode::FORBIDDEN);

        for err in [
            GatewayError::MissingCredential,
            GatewayError::InvalidCredential,
            GatewayError::ExpiredCredential,
            GatewayError::IssuanceUnavailable,
            GatewayError::NonCanonicalPath,
            GatewayError::Unclassified(String::new()),
        ] {
            assert_eq!(
                responder.status_for(&err) == StatusCode::FORBIDDEN,
                err.is_credential_failure(),
                "{err:?}"
            );
        }
    }

    #[test]
    fn component_errors_convert() {
        assert_eq!(
            GatewayError::from(TokenError::Empty),
            GatewayError::MissingCredential
        );
        assert_eq!(
            GatewayError::from(TokenError::Invalid("bad".into())),
            GatewayError::InvalidCredential
        );
        assert_eq!(
            GatewayError::from(TokenError::Expired { exp: 1 }),
            GatewayError::ExpiredCredential
        );
        assert_eq!(
            GatewayError::from(PassportError::Timeout),
            GatewayError::IssuanceUnavailable
        );
        assert_eq!(
            GatewayError::from(PassportError::UnexpectedStatus(503)),
            GatewayError::IssuanceUnavailable
        );
        assert_eq!(
            GatewayError::from(InjectError::InvalidClaimKey("bad key".into())),
            GatewayError::IssuanceUnavailable
        );
        assert!(matches!(
            GatewayError::from(PassportError::Setup("x".into())),
            GatewayError::Unclassified(_)
        ));
    }

    #[test]
    fn only_token_failures_are_credential_failures() {
        assert!(GatewayError::MissingCredential.is_credential_failure());
        assert!(GatewayError::ExpiredCredential.is_credential_failure());
        assert!(!GatewayError::IssuanceUnavailable.is_credential_failure());
        assert!(!GatewayError::NonCanonicalPath.is_credential_failure());
        assert!(!GatewayError::Unclassified(String::new()).is_credential_failure());
    }
}
