//! Persistence layer for the Waypoint server.
//!
//! Provides SQLite-backed storage for users, processed billing events and
//! saved routes.

pub mod billing_store;
pub mod db;
pub mod events;
pub mod routes;
pub mod users;

pub use billing_store::SqliteBillingStore;
pub use db::{init_database, Database};
