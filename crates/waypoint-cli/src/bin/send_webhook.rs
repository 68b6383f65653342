//! CLI tool to send a signed billing webhook to a Waypoint server.

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use waypoint_cli::{build_event_payload, EventParams, WebhookClient};
use waypoint_core::EventKind;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Kind {
    Checkout,
    Update,
    Cancel,
    PaymentFailed,
}

impl From<Kind> for EventKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Checkout => EventKind::CheckoutCompleted,
            Kind::Update => EventKind::SubscriptionUpdated,
            Kind::Cancel => EventKind::SubscriptionCancelled,
            Kind::PaymentFailed => EventKind::PaymentFailed,
        }
    }
}

/// Build, sign and POST a billing provider webhook
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Event kind to send
    #[arg(value_enum)]
    kind: Kind,

    /// Webhook endpoint
    #[arg(long, default_value = "http://localhost:3000/v1/billing/webhook")]
    url: String,

    /// Webhook signing secret (unsigned when omitted)
    #[arg(long, env = "STRIPE_WEBHOOK_SECRET")]
    secret: Option<String>,

    #[arg(long, default_value = "demo-user")]
    user: String,

    #[arg(long, default_value = "price_premium_monthly")]
    plan: String,

    /// Amount in cents
    #[arg(long, default_value_t = 999)]
    amount: i64,

    /// Provider event id (generated when omitted; reuse one to test idempotency)
    #[arg(long)]
    event_id: Option<String>,

    /// Print the payload without sending it
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let now = Utc::now();

    let params = EventParams {
        kind: args.kind.into(),
        event_id: args
            .event_id
            .unwrap_or_else(|| format!("evt_cli_{}", now.timestamp_millis())),
        user_id: args.user,
        plan_id: args.plan,
        amount_cents: args.amount,
        created: now.timestamp(),
    };
    let payload = build_event_payload(&params);

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if args.secret.is_none() {
        eprintln!("warning: no --secret given, sending unsigned payload");
    }

    let event_type = payload["type"].as_str().unwrap_or_default();
    println!("Sending {} ({}) to {}...", event_type, params.event_id, args.url);
    let client = WebhookClient::new(&args.url, args.secret)?;
    let (status, body) = client.send(&payload, now.timestamp())?;
    println!("{} {}", status, body);
    Ok(())
}
