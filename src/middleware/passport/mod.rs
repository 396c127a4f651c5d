//! Authentication edge filter: bearer token → passport → trusted headers.
//!
//! Exactly one outcome per request: the prepared request goes to the inner
//! service (the routing fabric), or an error response is written directly.
//! If the client goes away mid-exchange, axum drops this future, which
//! cancels the issuer call and frees its connection; nothing is written.

pub mod headers;
mod pipeline;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

pub use pipeline::PassportFilter;

/// Puts the passport filter in front of every route (and the fallback) of
/// `router`.
///
/// ```ignore
/// let fabric = Router::new().fallback(fabric::forward).with_state(state.clone());
/// let app = middleware::passport::apply(fabric, state.filter.clone());
/// ```
pub fn apply<S>(router: Router<S>, filter: Arc<PassportFilter>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(filter, passport_middleware))
}

async fn passport_middleware(
    State(filter): State<Arc<PassportFilter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    match filter.prepare(req).await {
        Ok(req) => next.run(req).await,
        Err(err) => filter.reject(&err),
    }
}
