use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response};

use crate::error::{ErrorResponder, GatewayError};
use crate::middleware::passport::headers::{self, TrustedHeaderPrefix};
use crate::services::auth::{TokenValidator, credential};
use crate::services::passport::PassportClient;
use crate::services::paths::{self, PathCategory, PathClassifier};

/// Per-request authentication pipeline:
/// canonical check → strip spoofed headers → classify → extract →
/// validate (protected only) → exchange → inject.
///
/// Holds only read-only collaborators; one instance serves every request.
pub struct PassportFilter {
    classifier: PathClassifier,
    validator: TokenValidator,
    passport_client: Arc<dyn PassportClient>,
    bearer_prefix: String,
    header_prefix: TrustedHeaderPrefix,
    responder: ErrorResponder,
}

impl std::fmt::Debug for PassportFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassportFilter")
            .field("classifier", &self.classifier)
            .field("validator", &self.validator)
            .field("bearer_prefix", &self.bearer_prefix)
            .field("header_prefix", &self.header_prefix)
            .field("responder", &self.responder)
            .finish_non_exhaustive()
    }
}

impl PassportFilter {
    pub fn new(
        classifier: PathClassifier,
        validator: TokenValidator,
        passport_client: Arc<dyn PassportClient>,
        bearer_prefix: impl Into<String>,
        header_prefix: TrustedHeaderPrefix,
        responder: ErrorResponder,
    ) -> Self {
        Self {
            classifier,
            validator,
            passport_client,
            bearer_prefix: bearer_prefix.into(),
            header_prefix,
            responder,
        }
    }

    /// Runs the pipeline up to (not including) forwarding.
    ///
    /// `Ok` carries the request to hand to the fabric. Client-supplied
    /// trusted headers are always gone; anonymous requests are otherwise
    /// untouched, the rest carry the passport headers. `Err` means the
    /// request must be answered directly and never forwarded.
    pub async fn prepare(&self, mut req: Request<Body>) -> Result<Request<Body>, GatewayError> {
        let path = req.uri().path().to_owned();
        if !paths::is_canonical(&path) {
            tracing::warn!(%path, "rejecting non-canonical request path");
            return Err(GatewayError::NonCanonicalPath);
        }

        let dropped = headers::strip(req.headers_mut(), &self.header_prefix);
        if dropped > 0 {
            tracing::warn!(
                %path,
                prefix = self.header_prefix.as_str(),
                dropped,
                "dropped client-supplied trusted headers"
            );
        }

        let category = self.classifier.classify(&path);

        let credential = credential::extract(req.headers(), &self.bearer_prefix);

        match category {
            PathCategory::Anonymous => {
                tracing::debug!(%path, "anonymous endpoint, skipping authentication");
                return Ok(req);
            }
            PathCategory::ValidationExempt => {
                tracing::debug!(%path, "validation-exempt endpoint, skipping token validation");
            }
            PathCategory::Protected => {
                let claims = self.validator.validate(credential.as_ref()).map_err(|err| {
                    tracing::warn!(%path, error = %err, "access token verification failed");
                    GatewayError::from(err)
                })?;
                tracing::debug!(%path, subject = %claims.sub, "access token verified");
            }
        }

        let credential = credential.ok_or_else(|| {
            tracing::warn!(%path, "access token missing");
            GatewayError::MissingCredential
        })?;

        let passport = self
            .passport_client
            .exchange(&credential, &path)
            .await
            .map_err(|err| {
                tracing::warn!(%path, error = %err, "passport issuance failed");
                GatewayError::from(err)
            })?;

        let injected = headers::inject(req.headers(), &passport, &self.header_prefix)
            .map_err(|err| {
                tracing::warn!(%path, error = %err, "passport could not be turned into headers");
                GatewayError::from(err)
            })?;

        let (mut parts, body) = req.into_parts();
        parts.headers = injected;
        Ok(Request::from_parts(parts, body))
    }

    /// Builds the direct response for a failed request.
    pub fn reject(&self, err: &GatewayError) -> Response {
        if let GatewayError::Unclassified(detail) = err {
            tracing::error!(%detail, "unclassified failure in passport filter");
        }
        self.responder.respond(err)
    }
}
