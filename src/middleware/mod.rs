pub mod identity;
mod request_log;
mod roles;
mod security;
mod throttle;
mod time_window;

pub use request_log::log_requests;
pub use roles::require_role;
pub use security::security_headers;
pub use throttle::{KeyStrategy, RoutePredicate, throttle_writes};
pub use time_window::{AccessHours, restrict_hours};
