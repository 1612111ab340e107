use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("gateway_requests_total", "Total number of requests").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter = register_counter!(
        "gateway_rate_limited_total",
        "Requests rejected by the rate limiter"
    )
    .unwrap();
    pub static ref DENIED_TOTAL: Counter = register_counter!(
        "gateway_denied_total",
        "Requests denied by access hour or role checks"
    )
    .unwrap();
    pub static ref MESSAGES_TOTAL: Counter =
        register_counter!("gateway_messages_total", "Messages stored").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "gateway_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
    pub static ref TRACKED_CLIENTS: Gauge = register_gauge!(
        "gateway_tracked_clients",
        "Client keys currently tracked by the rate limiter"
    )
    .unwrap();
}
