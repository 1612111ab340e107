use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::middleware::{AccessHours, KeyStrategy, RoutePredicate};
use crate::rate_limit::RateLimitPolicy;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "chat-gateway")]
#[command(about = "Rate limiting gateway for a messaging API")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Max write requests per client per window
    #[arg(long, default_value_t = 5)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60)]
    pub rate_window: u64,

    // Path prefix of rate limited routes
    #[arg(long, default_value = "/api/")]
    pub limited_path_prefix: String,

    // Path markers of rate limited routes (repeatable)
    #[arg(long, default_values_t = ["messages".to_string()])]
    pub limited_path_marker: Vec<String>,

    // What identifies a client bucket
    #[arg(long, value_enum, default_value_t = KeyStrategy::ClientIp)]
    pub key_strategy: KeyStrategy,

    // Daily hours chat endpoints are served, "HH:MM-HH:MM" or "always"
    #[arg(long, default_value = "18:00-21:00")]
    pub allowed_hours: String,

    // Seconds between idle client purges
    #[arg(long, default_value_t = 300)]
    pub purge_interval: u64,

    // Delivery queue capacity
    #[arg(long, default_value_t = 100)]
    pub queue_depth: usize,
}

// Bad policy parameters abort startup before the listener binds
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rate limit must be at least 1")]
    ZeroRateLimit,
    #[error("rate window must be at least 1 second")]
    ZeroRateWindow,
    #[error("purge interval must be at least 1 second")]
    ZeroPurgeInterval,
    #[error("queue depth must be at least 1")]
    ZeroQueueDepth,
    #[error("invalid allowed hours {0:?}, expected \"HH:MM-HH:MM\" or \"always\"")]
    InvalidAccessHours(String),
}

// Validated runtime settings derived from the CLI
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub policy: RateLimitPolicy,
    pub predicate: RoutePredicate,
    pub key_strategy: KeyStrategy,
    pub access_hours: AccessHours,
    pub purge_interval: Duration,
    pub queue_depth: usize,
}

impl Settings {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        if args.rate_limit == 0 {
            return Err(ConfigError::ZeroRateLimit);
        }
        if args.rate_window == 0 {
            return Err(ConfigError::ZeroRateWindow);
        }
        if args.purge_interval == 0 {
            return Err(ConfigError::ZeroPurgeInterval);
        }
        if args.queue_depth == 0 {
            return Err(ConfigError::ZeroQueueDepth);
        }
        let access_hours = AccessHours::parse(&args.allowed_hours)?;

        Ok(Settings {
            port: args.port,
            policy: RateLimitPolicy {
                max_requests: args.rate_limit as usize,
                window: Duration::from_secs(args.rate_window),
            },
            predicate: RoutePredicate {
                path_prefix: args.limited_path_prefix,
                path_markers: args.limited_path_marker,
            },
            key_strategy: args.key_strategy,
            access_hours,
            purge_interval: Duration::from_secs(args.purge_interval),
            queue_depth: args.queue_depth,
        })
    }
}
