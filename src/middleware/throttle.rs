use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use clap::ValueEnum;
use serde_json::json;

use crate::metrics::RATE_LIMITED_TOTAL;
use crate::middleware::identity;
use crate::rate_limit::{Decision, UNKNOWN_CLIENT};
use crate::state::AppState;

// Which requests are subject to rate limiting: write methods on paths
// under the prefix that carry one of the markers. Everything else
// bypasses the limiter and is never recorded.
#[derive(Debug, Clone)]
pub struct RoutePredicate {
    pub path_prefix: String,
    pub path_markers: Vec<String>,
}

impl RoutePredicate {
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        is_write(method)
            && path.starts_with(&self.path_prefix)
            && self
                .path_markers
                .iter()
                .any(|marker| path.contains(marker.as_str()))
    }
}

fn is_write(method: &Method) -> bool {
    *method == Method::POST
        || *method == Method::PUT
        || *method == Method::PATCH
        || *method == Method::DELETE
}

// How the per-client bucket key is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeyStrategy {
    // network origin address (first X-Forwarded-For hop, else peer address)
    ClientIp,
    // authenticated user, falling back to the address for anonymous clients
    User,
}

// Resolution order: user (if the strategy asks for one and the request
// carries an identity), first X-Forwarded-For hop, peer address, and
// finally the shared unknown-client bucket.
pub fn client_key(
    strategy: KeyStrategy,
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
) -> String {
    if strategy == KeyStrategy::User {
        if let Some(user) = identity::username(headers) {
            return user.to_string();
        }
    }

    forwarded_client(headers)
        .map(str::to_owned)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

// First hop of X-Forwarded-For, if present and non-empty
fn forwarded_client(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|client| !client.is_empty())
}

// Caps write requests per client inside a sliding window. Rejections
// short-circuit with 429 and never reach the handler.
pub async fn throttle_writes(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    if !state.route_predicate.matches(req.method(), req.uri().path()) {
        return next.run(req).await;
    }

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let key = client_key(state.key_strategy, req.headers(), peer);

    match state.limiter.check_and_record(&key, Instant::now()) {
        Decision::Admit => next.run(req).await,
        Decision::Reject { retry_after } => {
            RATE_LIMITED_TOTAL.inc();
            tracing::warn!(client = key.as_str(), "rate limit exceeded");

            let retry_secs = retry_after.as_secs();
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_secs.to_string())],
                Json(json!({
                    "error": "Rate limit exceeded",
                    "message": format!(
                        "You can only send {} messages per {} seconds",
                        state.limiter.max_requests(),
                        state.limiter.window().as_secs()
                    ),
                    "retry_after": retry_secs,
                })),
            )
                .into_response()
        }
    }
}
