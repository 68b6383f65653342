//! Outbound email for billing notifications.
//!
//! `HttpMailer` posts JSON to a mail relay; `LogMailer` only logs and is used
//! when no relay is configured.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use waypoint_core::{BillingNotification, EventKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "mail relay not configured, logging email instead"
        );
        tracing::debug!(body = %message.text, "email body");
        Ok(())
    }
}

pub struct HttpMailer {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpMailer {
    pub fn new(url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            token,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let mut request = self.client.post(&self.url).json(message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("mail relay returned {}: {}", status, body);
        }
        Ok(())
    }
}

/// Build the email for a billing notification.
pub fn render_billing_email(
    from: &str,
    to: &str,
    display_name: Option<&str>,
    notification: &BillingNotification,
) -> EmailMessage {
    let greeting = format!("Hi {},", display_name.unwrap_or("there"));
    let plan = notification.plan_id.as_deref().unwrap_or("your plan");
    let amount = format_amount(notification.amount_cents);
    let next_date = notification
        .next_billing_date
        .map(|d| d.format("%B %-d, %Y").to_string());

    let (subject, body) = match notification.kind {
        EventKind::CheckoutCompleted => (
            "Welcome to Waypoint Premium".to_string(),
            format!(
                "Thanks for subscribing to {plan} ({amount}).{}",
                next_date
                    .map(|d| format!(" Your next billing date is {d}."))
                    .unwrap_or_default()
            ),
        ),
        EventKind::SubscriptionUpdated => (
            "Your Waypoint subscription was updated".to_string(),
            format!(
                "Your subscription is now on {plan}.{}",
                next_date
                    .map(|d| format!(" Your next billing date is {d}."))
                    .unwrap_or_default()
            ),
        ),
        EventKind::SubscriptionCancelled => (
            "Your Waypoint subscription was cancelled".to_string(),
            format!(
                "Your {plan} subscription has been cancelled. \
                 You can resubscribe at any time."
            ),
        ),
        EventKind::PaymentFailed => (
            "Action needed: payment failed".to_string(),
            format!(
                "We couldn't process your payment of {amount} for {plan}. \
                 Please update your payment method to keep your subscription active."
            ),
        ),
    };

    EmailMessage {
        from: from.to_string(),
        to: to.to_string(),
        subject,
        text: format!("{greeting}\n\n{body}\n\nThe Waypoint team"),
    }
}

fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}${}.{:02}", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use waypoint_core::SubscriptionStatus;

    fn notification(kind: EventKind) -> BillingNotification {
        BillingNotification {
            user_id: "u1".to_string(),
            kind,
            plan_id: Some("pro".to_string()),
            amount_cents: 1299,
            status: SubscriptionStatus::Active,
            next_billing_date: NaiveDate::from_ymd_opt(2024, 3, 31),
        }
    }

    #[test]
    fn checkout_email_mentions_plan_amount_and_date() {
        let email = render_billing_email(
            "billing@waypoint.test",
            "ann@example.com",
            Some("Ann"),
            &notification(EventKind::CheckoutCompleted),
        );
        assert_eq!(email.to, "ann@example.com");
        assert_eq!(email.subject, "Welcome to Waypoint Premium");
        assert!(email.text.starts_with("Hi Ann,"));
        assert!(email.text.contains("pro ($12.99)"));
        assert!(email.text.contains("March 31, 2024"));
    }

    #[test]
    fn cancellation_email_has_no_billing_date() {
        let mut cancelled = notification(EventKind::SubscriptionCancelled);
        cancelled.next_billing_date = None;
        let email = render_billing_email("from@x", "to@x", None, &cancelled);
        assert!(email.text.starts_with("Hi there,"));
        assert!(email.text.contains("cancelled"));
        assert!(!email.text.contains("billing date"));
    }

    #[test]
    fn amounts_are_formatted_in_dollars() {
        assert_eq!(format_amount(0), "$0.00");
        assert_eq!(format_amount(5), "$0.05");
        assert_eq!(format_amount(120_000), "$1200.00");
        assert_eq!(format_amount(-250), "-$2.50");
    }
}
