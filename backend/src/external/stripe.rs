//! Stripe billing client and webhook signature verification
//!
//! Checkout sessions are created against the Stripe REST API; subscription
//! state flows back through webhooks whose `Stripe-Signature` header is
//! verified with HMAC-SHA256 before any event is trusted.

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;

use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Stripe API client
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    base_url: String,
}

/// A created checkout session the app redirects to
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

impl StripeClient {
    /// Create a new StripeClient
    pub fn new(secret_key: String) -> Self {
        Self {
            client: Client::new(),
            secret_key,
            base_url: "https://api.stripe.com/v1".to_string(),
        }
    }

    /// Create a new StripeClient with custom base URL (for testing)
    pub fn with_base_url(secret_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            secret_key,
            base_url,
        }
    }

    /// Create a subscription checkout session for an organisation
    pub async fn create_checkout_session(
        &self,
        price_id: &str,
        org_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> AppResult<CheckoutSession> {
        let url = format!("{}/checkout/sessions", self.base_url);

        let params = [
            ("mode", "subscription"),
            ("line_items[0][price]", price_id),
            ("line_items[0][quantity]", "1"),
            ("client_reference_id", org_id),
            ("success_url", success_url),
            ("cancel_url", cancel_url),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::PaymentProviderError(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::PaymentProviderError(format!(
                "{} - {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::PaymentProviderError(format!("invalid response: {}", e)))
    }
}

/// Verify a `Stripe-Signature` header against the raw webhook body.
///
/// The header carries `t=<timestamp>,v1=<hex hmac>`; the signed payload is
/// `"{timestamp}.{body}"` keyed with the webhook signing secret.
pub fn verify_webhook_signature(
    signature_header: &str,
    body: &[u8],
    webhook_secret: &str,
) -> Result<(), String> {
    let mut timestamp = None;
    let mut v1 = None;
    for part in signature_header.split(',') {
        match part.split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => v1 = Some(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or("Missing timestamp in Stripe-Signature header")?;
    let v1 = v1.ok_or("Missing v1 signature in Stripe-Signature header")?;

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC")?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    let expected = hex_encode(&mac.finalize().into_bytes());

    if v1 != expected {
        return Err("Signature mismatch".to_string());
    }

    Ok(())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        hex_encode(&mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let secret = "whsec_test";
        let body = br#"{"type":"customer.subscription.updated"}"#;
        let sig = sign(secret, "1700000000", body);
        let header = format!("t=1700000000,v1={}", sig);
        assert!(verify_webhook_signature(&header, body, secret).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let secret = "whsec_test";
        let sig = sign(secret, "1700000000", b"original");
        let header = format!("t=1700000000,v1={}", sig);
        assert!(verify_webhook_signature(&header, b"tampered", secret).is_err());
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(verify_webhook_signature("v1=abc", b"x", "s").is_err());
        assert!(verify_webhook_signature("t=1700000000", b"x", "s").is_err());
        assert!(verify_webhook_signature("", b"x", "s").is_err());
    }
}
