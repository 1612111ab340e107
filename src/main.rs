mod config;
mod handlers;
mod metrics;
mod middleware;
mod models;
mod rate_limit;
mod state;
mod store;
mod worker;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::config::{Args, Settings};
use crate::rate_limit::{RateLimiter, purge_task};
use crate::state::AppState;
use crate::store::ChatStore;
use crate::worker::delivery_worker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "chat_gateway=info".into()),
        )
        .init();

    let args = Args::parse();
    let settings = Settings::from_args(args)?;

    let limiter = Arc::new(RateLimiter::new(settings.policy.clone()));
    let store = Arc::new(ChatStore::new());
    let (delivery_tx, delivery_rx) = mpsc::channel(settings.queue_depth);

    let state = Arc::new(AppState {
        limiter: Arc::clone(&limiter),
        route_predicate: settings.predicate.clone(),
        key_strategy: settings.key_strategy,
        access_hours: settings.access_hours,
        store: Arc::clone(&store),
        delivery_tx,
    });

    // spawn the background delivery worker
    tokio::spawn(delivery_worker(delivery_rx, Arc::clone(&store)));

    // spawn the idle-key purge
    tokio::spawn(purge_task(Arc::clone(&limiter), settings.purge_interval));

    // stages run outermost first: request log, security headers, access
    // hours, rate limit, role check - same order the checks gate a request
    let app = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route(
            "/api/conversations",
            post(handlers::create_conversation).get(handlers::list_conversations),
        )
        .route(
            "/api/conversations/{id}/messages",
            get(handlers::conversation_messages),
        )
        .route("/api/messages", post(handlers::send_message))
        .route("/api/admin/stats", get(handlers::admin_stats))
        .layer(from_fn(middleware::require_role))
        .layer(from_fn_with_state(
            Arc::clone(&state),
            middleware::throttle_writes,
        ))
        .layer(from_fn_with_state(
            Arc::clone(&state),
            middleware::restrict_hours,
        ))
        .layer(from_fn(middleware::security_headers))
        .layer(from_fn(middleware::log_requests))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", settings.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(port = settings.port, "gateway listening");
    tracing::info!(
        max_requests = settings.policy.max_requests,
        window_secs = settings.policy.window.as_secs(),
        allowed_hours = settings.access_hours.describe().as_str(),
        "write limit policy"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
