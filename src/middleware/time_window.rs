use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Local, NaiveTime};
use serde_json::json;

use crate::config::ConfigError;
use crate::metrics::DENIED_TOTAL;
use crate::state::AppState;

// Paths subject to the access-hours restriction
const RESTRICTED_MARKERS: [&str; 3] = ["messages", "conversations", "chats"];

// Daily window during which chat endpoints are served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessHours {
    Always,
    Between { open: NaiveTime, close: NaiveTime },
}

impl AccessHours {
    // Accepts "HH:MM-HH:MM" (same-day window, inclusive on both ends)
    // or "always" to disable the restriction.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if raw.eq_ignore_ascii_case("always") {
            return Ok(AccessHours::Always);
        }

        let invalid = || ConfigError::InvalidAccessHours(raw.to_string());
        let (open, close) = raw.split_once('-').ok_or_else(invalid)?;
        let open = NaiveTime::parse_from_str(open.trim(), "%H:%M").map_err(|_| invalid())?;
        let close = NaiveTime::parse_from_str(close.trim(), "%H:%M").map_err(|_| invalid())?;
        if close <= open {
            return Err(invalid());
        }

        Ok(AccessHours::Between { open, close })
    }

    pub fn admits(&self, now: NaiveTime) -> bool {
        match *self {
            AccessHours::Always => true,
            AccessHours::Between { open, close } => open <= now && now <= close,
        }
    }

    pub fn describe(&self) -> String {
        match *self {
            AccessHours::Always => "always".to_string(),
            AccessHours::Between { open, close } => {
                format!("{} - {}", open.format("%H:%M"), close.format("%H:%M"))
            }
        }
    }
}

fn is_restricted(path: &str) -> bool {
    path.starts_with("/api/") && RESTRICTED_MARKERS.iter().any(|marker| path.contains(marker))
}

// Rejects chat endpoints outside the configured daily hours
pub async fn restrict_hours(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    if is_restricted(req.uri().path()) {
        let now = Local::now().time();
        if !state.access_hours.admits(now) {
            DENIED_TOTAL.inc();
            return (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "Access denied",
                    "message": format!(
                        "Messaging service is only available between {}",
                        state.access_hours.describe()
                    ),
                    "current_time": now.format("%H:%M:%S").to_string(),
                    "allowed_hours": state.access_hours.describe(),
                })),
            )
                .into_response();
        }
    }

    next.run(req).await
}
