//! Where the TON-per-star rate comes from.
//!
//! `mock` returns the configured rate, `http` asks a JSON endpoint, and `auto`
//! tries the endpoint first and falls back to the mock rate.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::core::config::{PriceMode, Settings};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum PriceSourceError {
    #[error("price request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("price endpoint returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("price endpoint returned an unusable value: {0}")]
    BadValue(String),

    #[error("price must be positive, got {0}")]
    NonPositive(Decimal),
}

/// Source of the current TON price of one star
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Current rate in TON per star, always positive
    async fn ton_per_star(&self) -> Result<Decimal, PriceSourceError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Fixed rate from settings
#[derive(Debug, Clone)]
pub struct MockPrice {
    rate: Decimal,
}

impl MockPrice {
    pub fn new(rate: Decimal) -> Self {
        Self { rate }
    }
}

#[async_trait]
impl PriceProvider for MockPrice {
    async fn ton_per_star(&self) -> Result<Decimal, PriceSourceError> {
        if self.rate <= Decimal::ZERO {
            return Err(PriceSourceError::NonPositive(self.rate));
        }
        Ok(self.rate)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price_ton_per_star: serde_json::Value,
}

/// Rate fetched from `GET <url>` returning `{"price_ton_per_star": <number>}`
#[derive(Debug, Clone)]
pub struct HttpPrice {
    client: reqwest::Client,
    url: Url,
    auth_header: Option<String>,
}

impl HttpPrice {
    pub fn new(url: Url, auth_header: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(client, url, auth_header)
    }

    pub fn with_client(client: reqwest::Client, url: Url, auth_header: Option<String>) -> Self {
        Self {
            client,
            url,
            auth_header,
        }
    }
}

#[async_trait]
impl PriceProvider for HttpPrice {
    async fn ton_per_star(&self) -> Result<Decimal, PriceSourceError> {
        let mut request = self.client.get(self.url.clone());
        if let Some(ref auth) = self.auth_header {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(PriceSourceError::Status(response.status()));
        }

        let body: PriceResponse = response.json().await?;
        let rate = decimal_from_json(&body.price_ton_per_star)?;
        if rate <= Decimal::ZERO {
            return Err(PriceSourceError::NonPositive(rate));
        }

        log::debug!("Fetched price {} TON/star from {}", rate, self.url);
        Ok(rate)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// HTTP when available, mock otherwise
#[derive(Debug, Clone)]
pub struct AutoPrice {
    http: Option<HttpPrice>,
    fallback: MockPrice,
}

impl AutoPrice {
    pub fn new(http: Option<HttpPrice>, fallback: MockPrice) -> Self {
        Self { http, fallback }
    }
}

#[async_trait]
impl PriceProvider for AutoPrice {
    async fn ton_per_star(&self) -> Result<Decimal, PriceSourceError> {
        if let Some(ref http) = self.http {
            match http.ton_per_star().await {
                Ok(rate) => return Ok(rate),
                Err(e) => log::warn!("⚠️ HTTP price source failed, using mock price: {}", e),
            }
        }
        self.fallback.ton_per_star().await
    }

    fn name(&self) -> &'static str {
        "auto"
    }
}

/// Picks the provider for the effective price mode.
pub fn build_price_provider(settings: &Settings) -> Arc<dyn PriceProvider> {
    let mock = MockPrice::new(settings.price_mock_ton_per_star);
    let http = settings
        .price_http_url
        .clone()
        .map(|url| HttpPrice::new(url, settings.price_http_auth_header.clone()));

    match (settings.effective_price_mode(), http) {
        (PriceMode::Mock, _) => Arc::new(mock),
        (PriceMode::Http, Some(http)) => Arc::new(http),
        // Settings reject http mode without a URL; degrade to mock if constructed by hand.
        (PriceMode::Http, None) => Arc::new(mock),
        (PriceMode::Auto, http) => Arc::new(AutoPrice::new(http, mock)),
    }
}

fn decimal_from_json(value: &serde_json::Value) -> Result<Decimal, PriceSourceError> {
    let raw = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        other => return Err(PriceSourceError::BadValue(other.to_string())),
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| PriceSourceError::BadValue(raw))
}
