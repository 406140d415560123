//! Razorpay-shaped HTTP gateway client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::json;
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;

use super::{GatewayOrder, GatewayPayment, GatewayRefund, PaymentGateway};
use crate::config::PaymentConfig;

type HmacSha256 = Hmac<Sha256>;

pub struct HttpGateway {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl HttpGateway {
    pub fn new(config: &PaymentConfig, key_id: String, key_secret: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id,
            key_secret,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder> {
        let url = format!("{}/orders", self.base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({
                // The gateway takes amounts in paise and auto-captures
                "amount": amount * 100,
                "currency": currency,
                "receipt": receipt,
                "payment_capture": 1,
            }))
            .send()
            .await
            .context("Failed to reach payment gateway")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("order creation failed with {}: {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse order response")
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let mut mac = match HmacSha256::new_from_slice(self.key_secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        let expected = expected.as_bytes();
        let provided = signature.as_bytes();
        expected.len() == provided.len() && expected.ct_eq(provided).into()
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
        let url = format!("{}/payments/{}", self.base_url, payment_id);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .context("Failed to reach payment gateway")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("payment lookup failed with {}: {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse payment response")
    }

    async fn refund(&self, payment_id: &str, amount: i64) -> Result<GatewayRefund> {
        let url = format!("{}/payments/{}/refund", self.base_url, payment_id);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({ "amount": amount * 100 }))
            .send()
            .await
            .context("Failed to reach payment gateway")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("refund failed with {}: {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse refund response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(secret: &str) -> HttpGateway {
        HttpGateway::new(
            &PaymentConfig::default(),
            "key_test".to_string(),
            secret.to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_signature_roundtrip() {
        let gw = gateway("secret_key");

        let mut mac = HmacSha256::new_from_slice(b"secret_key").unwrap();
        mac.update(b"order_abc|pay_xyz");
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(gw.verify_signature("order_abc", "pay_xyz", &signature));
    }

    #[test]
    fn test_signature_rejects_tampered_payment_id() {
        let gw = gateway("secret_key");

        let mut mac = HmacSha256::new_from_slice(b"secret_key").unwrap();
        mac.update(b"order_abc|pay_xyz");
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(!gw.verify_signature("order_abc", "pay_other", &signature));
    }

    #[test]
    fn test_signature_rejects_wrong_length() {
        let gw = gateway("secret_key");
        assert!(!gw.verify_signature("order_abc", "pay_xyz", "deadbeef"));
    }
}
