use super::util::with_retry;
use crate::core::rate::KeyRateProvider;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

/// Client for a key-rate service answering `GET {base_url}/key-rate`.
pub struct RateServiceProvider {
    base_url: String,
    client: reqwest::Client,
}

impl RateServiceProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct KeyRateResponse {
    rate: Decimal,
    date: Option<NaiveDate>,
}

#[async_trait]
impl KeyRateProvider for RateServiceProvider {
    async fn key_rate(&self) -> Result<Decimal> {
        let url = format!("{}/key-rate", self.base_url);
        debug!("Requesting key rate from {}", url);

        let response = with_retry(
            || async {
                self.client
                    .get(&url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
            },
            2,
            500,
        )
        .await
        .context("Key rate request failed")?;

        let response_text = response
            .text()
            .await
            .context("Failed to get key rate response text")?;

        let parsed: KeyRateResponse = serde_json::from_str(&response_text).with_context(|| {
            format!("Failed to parse key rate response: '{response_text}'")
        })?;

        if parsed.rate < Decimal::ZERO {
            return Err(anyhow!("Key rate service returned a negative rate: {}", parsed.rate));
        }
        debug!(rate = %parsed.rate, date = ?parsed.date, "Fetched key rate");
        Ok(parsed.rate)
    }
}
