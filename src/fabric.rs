/*
 * Responsibility
 * - Stand-in for the routing fabric: forward an already-prepared request
 *   to a single upstream and relay the answer
 * - No routing decisions, no auth logic (the passport filter runs before this)
 */
use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
};
use reqwest::Client as HttpClient;
use url::Url;

use crate::middleware::http::BODY_LIMIT_BYTES;
use crate::services::paths;
use crate::state::AppState;

// Connection-scoped headers that must not be relayed (RFC 9110 §7.6.1),
// plus the ones reqwest/hyper recompute.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

#[derive(Debug, Clone)]
pub struct Upstream {
    http_client: HttpClient,
    base_url: Url,
}

impl Upstream {
    pub fn new(http_client: HttpClient, base_url: Url) -> Self {
        Self {
            http_client,
            base_url,
        }
    }

    /// Target URL for `path_and_query`, keeping the base URL's own path prefix.
    pub fn target(&self, path_and_query: &str) -> Result<Url, url::ParseError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{}{}", base, path_and_query))
    }
}

pub async fn forward(State(state): State<AppState>, req: Request<Body>) -> Response {
    let upstream = &state.upstream;
    let (parts, body) = req.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    // Url::parse resolves dot segments; never forward a path other than
    // the one the filter classified.
    if !paths::is_canonical(parts.uri.path()) {
        tracing::warn!(path = %parts.uri.path(), "refusing to forward non-canonical path");
        return StatusCode::BAD_REQUEST.into_response();
    }

    let target = match upstream.target(path_and_query) {
        Ok(url) => url,
        Err(err) => {
            tracing::warn!(error = %err, path = %path_and_query, "unroutable request path");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let body = match to_bytes(body, BODY_LIMIT_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, "failed to read request body");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let result = upstream
        .http_client
        .request(parts.method, target)
        .headers(strip_hop_by_hop(parts.headers))
        .body(body)
        .send()
        .await;

    let response = match result {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(error = %err, "upstream request failed");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let status = response.status();
    let headers = strip_hop_by_hop(response.headers().clone());

    match response.bytes().await {
        Ok(bytes) => (status, headers, bytes).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "failed to read upstream response");
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

fn strip_hop_by_hop(mut headers: HeaderMap) -> HeaderMap {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
    headers
}
