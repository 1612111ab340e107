use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};
use crate::middleware::identity;

// Logs every request with its user, method, path and final status, and
// feeds the request counter and latency histogram.
pub async fn log_requests(req: Request, next: Next) -> Response {
    REQUEST_TOTAL.inc();
    let start = Instant::now();

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user = identity::username(req.headers())
        .unwrap_or("anonymous")
        .to_string();

    let response = next.run(req).await;

    REQUEST_LATENCY.observe(start.elapsed().as_secs_f64());
    tracing::info!(
        %method,
        path = path.as_str(),
        user = user.as_str(),
        status = response.status().as_u16(),
        "request"
    );

    response
}
