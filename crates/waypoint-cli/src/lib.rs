//! Waypoint CLI - command line tools for the Waypoint backend.
//!
//! Binaries:
//! - route_distance: route length from coordinates or a JSON file
//! - send_webhook: build, sign and deliver a provider webhook

pub mod points;
pub mod webhook;

pub use points::{load_points_file, parse_point, parse_points_json};
pub use webhook::{build_event_payload, EventParams, WebhookClient};
