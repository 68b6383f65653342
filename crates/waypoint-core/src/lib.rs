pub mod geo;
pub mod memory_store;
pub mod models;
pub mod provider;
pub mod reconciler;
pub mod signature;
pub mod store;
pub mod transition;

pub use geo::{haversine_km, round_km, route_distance_km, Coordinate, GeoError, Route};
pub use memory_store::InMemoryBillingStore;
pub use models::{
    BillingNotification, EventKind, SubscriptionEvent, SubscriptionStatus, SubscriptionUpdate,
    UserBillingState,
};
pub use provider::{parse_provider_event, PayloadError};
pub use reconciler::{ReconcileError, ReconcileOutcome, Reconciler, ReconcilerConfig};
pub use signature::{sign_payload, verify_signature, SignatureError};
pub use store::{BillingStore, NotificationError, Notifier, StoreError};
pub use transition::{transition, Transition, BILLING_PERIOD_DAYS};
