//! OTP delivery over a Twilio-style SMS REST API.

use anyhow::{Context, Result};
use std::time::Duration;

use crate::config::SmsConfig;

pub struct SmsSender {
    client: reqwest::Client,
    config: SmsConfig,
}

impl SmsSender {
    pub fn new(config: &SmsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build SMS HTTP client")?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Send an OTP text. When SMS is disabled the code is logged instead,
    /// which is how local development reads it.
    pub async fn send_otp(
        &self,
        mobile: &str,
        name: &str,
        code: &str,
        ttl_minutes: i64,
    ) -> Result<()> {
        if !self.config.enabled {
            tracing::info!(mobile = %mobile, code = %code, "SMS disabled, logging OTP");
            return Ok(());
        }

        let account_sid = self
            .config
            .account_sid
            .as_ref()
            .context("SMS account_sid is not configured")?;
        let auth_token = self
            .config
            .auth_token
            .as_ref()
            .context("SMS auth_token is not configured")?;
        let from_number = self
            .config
            .from_number
            .as_ref()
            .context("SMS from_number is not configured")?;

        let body = format!(
            "Hello {}, your OTP for Railbook is: {}. Valid for {} minutes.",
            name, code, ttl_minutes
        );
        let url = format!(
            "{}/Accounts/{}/Messages.json",
            self.config.base_url.trim_end_matches('/'),
            account_sid
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(account_sid, Some(auth_token))
            .form(&[
                ("To", mobile),
                ("From", from_number.as_str()),
                ("Body", body.as_str()),
            ])
            .send()
            .await
            .context("Failed to reach SMS provider")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("SMS send failed with {}: {}", status, body);
        }

        tracing::info!(mobile = %mobile, "OTP SMS sent");
        Ok(())
    }
}
