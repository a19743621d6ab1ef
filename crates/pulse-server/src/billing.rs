//! Hosted billing-portal sessions.

use async_trait::async_trait;
use pulse_core::config::{BillingConfig, BillingProvider};
use reqwest::Client;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("billing provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("missing billing secret key: set {0}")]
    MissingSecretKey(String),
}

/// Creates a session on the provider's self-service portal.
#[async_trait]
pub trait BillingPortal: Send + Sync {
    /// Returns the URL the member should be redirected to.
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<String, BillingError>;
}

/// Build the portal named by the billing config.
pub fn portal_from_config(config: &BillingConfig) -> Result<Arc<dyn BillingPortal>, BillingError> {
    match config.provider {
        BillingProvider::Mock => Ok(Arc::new(MockPortal::default())),
        BillingProvider::Stripe => {
            let key = config
                .secret_key()
                .ok_or_else(|| BillingError::MissingSecretKey(config.secret_key_env.clone()))?;
            Ok(Arc::new(StripePortal::new(&config.api_base, key)?))
        }
    }
}

// ---------------------------------------------------------------------------
// Stripe
// ---------------------------------------------------------------------------

pub struct StripePortal {
    client: Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct PortalSession {
    url: String,
}

impl StripePortal {
    pub fn new(api_base: &str, secret_key: impl Into<String>) -> Result<Self, BillingError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }
}

#[async_trait]
impl BillingPortal for StripePortal {
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<String, BillingError> {
        let url = format!("{}/v1/billing_portal/sessions", self.api_base);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&[("customer", customer_id), ("return_url", return_url)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BillingError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let session: PortalSession = resp.json().await?;
        Ok(session.url)
    }
}

// ---------------------------------------------------------------------------
// Mock
// ---------------------------------------------------------------------------

/// Portal that sends the member straight back and records each customer id.
#[derive(Default)]
pub struct MockPortal {
    calls: Mutex<Vec<String>>,
}

impl MockPortal {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl BillingPortal for MockPortal {
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<String, BillingError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(customer_id.to_string());
        }
        Ok(return_url.to_string())
    }
}
