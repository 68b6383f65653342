//! Server configuration from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_path: String,
    pub database_max_connections: u32,
    pub admin_token: String,
    /// Webhook signing secret; signature checks are skipped when unset
    pub stripe_webhook_secret: Option<String>,
    pub stripe_webhook_tolerance_secs: i64,
    /// API key for creating checkout sessions
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
    pub checkout_success_url: String,
    pub checkout_cancel_url: String,
    /// HTTP mail relay endpoint; notifications are only logged when unset
    pub mail_relay_url: Option<String>,
    pub mail_relay_token: Option<String>,
    pub mail_from: String,
    pub notify_timeout_ms: u64,
    /// Delivery attempts per notification (1 = fire-and-forget)
    pub notify_max_attempts: u32,
    pub notify_retry_base_ms: u64,
    pub notify_queue_capacity: usize,
    /// Processed webhook ids older than this are pruned at startup (0 keeps all)
    pub event_retention_days: i64,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: parse_or("WAYPOINT_PORT", 3000),
            database_path: env::var("WAYPOINT_DB_PATH")
                .unwrap_or_else(|_| "data/waypoint.db".to_string()),
            database_max_connections: parse_or("WAYPOINT_DB_MAX_CONNECTIONS", 5),
            admin_token: env::var("WAYPOINT_ADMIN_TOKEN")
                .unwrap_or_else(|_| "change-me-admin".to_string()),
            stripe_webhook_secret: non_empty("STRIPE_WEBHOOK_SECRET"),
            stripe_webhook_tolerance_secs: parse_or("STRIPE_WEBHOOK_TOLERANCE_SECS", 300),
            stripe_secret_key: non_empty("STRIPE_SECRET_KEY"),
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            checkout_success_url: env::var("WAYPOINT_CHECKOUT_SUCCESS_URL")
                .unwrap_or_else(|_| "http://localhost:5173/billing/success".to_string()),
            checkout_cancel_url: env::var("WAYPOINT_CHECKOUT_CANCEL_URL")
                .unwrap_or_else(|_| "http://localhost:5173/billing".to_string()),
            mail_relay_url: non_empty("WAYPOINT_MAIL_RELAY_URL"),
            mail_relay_token: non_empty("WAYPOINT_MAIL_RELAY_TOKEN"),
            mail_from: env::var("WAYPOINT_MAIL_FROM")
                .unwrap_or_else(|_| "Waypoint <billing@waypoint.local>".to_string()),
            notify_timeout_ms: parse_or("WAYPOINT_NOTIFY_TIMEOUT_MS", 5000),
            notify_max_attempts: parse_or::<u32>("WAYPOINT_NOTIFY_MAX_ATTEMPTS", 1).max(1),
            notify_retry_base_ms: parse_or("WAYPOINT_NOTIFY_RETRY_BASE_MS", 500),
            notify_queue_capacity: parse_or::<usize>("WAYPOINT_NOTIFY_QUEUE_CAPACITY", 256).max(1),
            event_retention_days: parse_or("WAYPOINT_EVENT_RETENTION_DAYS", 90),
            log_json: env::var("WAYPOINT_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}
