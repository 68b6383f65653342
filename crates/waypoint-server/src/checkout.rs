//! Billing provider client for hosted checkout sessions.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// The provider calls this `id`; we expose it as `session_id`.
    #[serde(rename(deserialize = "id"))]
    pub session_id: String,
    pub url: String,
}

#[derive(Clone)]
pub struct CheckoutClient {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
    success_url: String,
    cancel_url: String,
}

impl CheckoutClient {
    pub fn new(
        api_base: impl Into<String>,
        secret_key: impl Into<String>,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
        })
    }

    /// Build a client from config, `None` when no provider key is set.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        let Some(secret_key) = config.stripe_secret_key.clone() else {
            return Ok(None);
        };
        Self::new(
            config.stripe_api_base.clone(),
            secret_key,
            config.checkout_success_url.clone(),
            config.checkout_cancel_url.clone(),
        )
        .map(Some)
    }

    /// Create a subscription checkout session for `user_id` on `plan_id`.
    ///
    /// The user and plan ids travel in the session metadata so the
    /// completion webhook can be mapped back to the user.
    pub async fn create_session(&self, user_id: &str, plan_id: &str) -> Result<CheckoutSession> {
        let form = [
            ("mode", "subscription"),
            ("line_items[0][price]", plan_id),
            ("line_items[0][quantity]", "1"),
            ("client_reference_id", user_id),
            ("metadata[user_id]", user_id),
            ("metadata[plan_id]", plan_id),
            ("subscription_data[metadata][user_id]", user_id),
            ("subscription_data[metadata][plan_id]", plan_id),
            ("success_url", self.success_url.as_str()),
            ("cancel_url", self.cancel_url.as_str()),
        ];

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("checkout session request failed with {}: {}", status, body);
        }

        Ok(response.json::<CheckoutSession>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Form, http::HeaderMap, routing::post, Json, Router};
    use std::collections::HashMap;

    async fn fake_provider() -> String {
        async fn create(
            headers: HeaderMap,
            Form(form): Form<HashMap<String, String>>,
        ) -> Result<Json<serde_json::Value>, axum::http::StatusCode> {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if auth != "Bearer sk_test" {
                return Err(axum::http::StatusCode::UNAUTHORIZED);
            }
            Ok(Json(serde_json::json!({
                "id": format!("cs_{}_{}", form["client_reference_id"], form["metadata[plan_id]"]),
                "url": "https://checkout.example/session",
                "mode": form["mode"],
            })))
        }

        let app = Router::new().route("/v1/checkout/sessions", post(create));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn creates_session_with_user_metadata() {
        let base = fake_provider().await;
        let client = CheckoutClient::new(base, "sk_test", "http://ok", "http://cancel").unwrap();

        let session = client.create_session("u1", "price_pro").await.unwrap();

        assert_eq!(session.session_id, "cs_u1_price_pro");
        assert_eq!(session.url, "https://checkout.example/session");

        let wire = serde_json::to_value(&session).unwrap();
        assert_eq!(wire["session_id"], "cs_u1_price_pro");
        assert!(wire.get("id").is_none());
    }

    #[tokio::test]
    async fn provider_errors_are_surfaced() {
        let base = fake_provider().await;
        let client = CheckoutClient::new(base, "sk_wrong", "http://ok", "http://cancel").unwrap();

        let err = client.create_session("u1", "price_pro").await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
