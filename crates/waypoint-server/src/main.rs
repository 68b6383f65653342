//! Waypoint Server - billing webhooks, notifications and route APIs

use anyhow::Result;
use axum::{middleware, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use waypoint_server::api;
use waypoint_server::checkout::CheckoutClient;
use waypoint_server::config::Config;
use waypoint_server::loops::notification_loop::{run_notification_loop, DeliverySettings};
use waypoint_server::mailer::{HttpMailer, LogMailer, Mailer};
use waypoint_server::notify::QueuedNotifier;
use waypoint_server::persistence::{events, init_database};
use waypoint_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("waypoint_server=debug".parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Waypoint Server...");

    let db = init_database(&config.database_path, config.database_max_connections).await?;

    let pruned = events::prune_processed(db.pool(), config.event_retention_days).await?;
    if pruned > 0 {
        tracing::info!(pruned, "Pruned old processed webhook events");
    }

    if config.stripe_webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set; webhook signatures will not be verified");
    }

    let mailer: Arc<dyn Mailer> = match &config.mail_relay_url {
        Some(url) => Arc::new(HttpMailer::new(
            url.clone(),
            config.mail_relay_token.clone(),
            config.notify_timeout(),
        )?),
        None => {
            tracing::warn!("WAYPOINT_MAIL_RELAY_URL not set; billing emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let checkout = CheckoutClient::from_config(&config)?;
    if checkout.is_none() {
        tracing::warn!("STRIPE_SECRET_KEY not set; checkout sessions are disabled");
    }

    let (notifier, notification_rx) = QueuedNotifier::new(config.notify_queue_capacity);
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start background loops
    let notification_handle = tokio::spawn(run_notification_loop(
        db.clone(),
        mailer,
        DeliverySettings::from_config(&config),
        notification_rx,
        shutdown_tx.subscribe(),
    ));

    let port = config.server_port;
    let state = Arc::new(AppState::new(
        db.clone(),
        config.clone(),
        Arc::new(notifier),
        checkout,
    ));

    // Build the app
    let app = api::routes(&config)
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(api::request_id::ensure_request_id))
        .layer(CorsLayer::permissive());

    // Run server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down background tasks");
    let _ = shutdown_tx.send(());
    if let Err(err) = notification_handle.await {
        tracing::warn!(error = %err, "Notification loop ended abnormally");
    }
    db.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
