//! Shared library surface for the Waypoint server and its tests.

pub mod api;
pub mod backoff;
pub mod checkout;
pub mod config;
pub mod loops;
pub mod mailer;
pub mod notify;
pub mod persistence;
pub mod state;
