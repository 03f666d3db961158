//! Best-effort USD conversion of an extracted price.
//!
//! Rates are fetched fresh for every conversion and never cached. Any
//! failure is logged and the caller simply gets no converted price.

use crate::config::ExchangeSettings;
use crate::domain::currency::Currency;
use crate::domain::price::{ConvertedPrice, ExtractedPrice};
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("rate source unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("rate source returned an unreadable body: {0}")]
    MalformedResponse(String),

    #[error("rate not available for USD -> {0}")]
    RateNotAvailable(Currency),
}

#[async_trait::async_trait]
pub trait RateSource: Send + Sync {
    /// Currency code -> units of that currency per 1 USD.
    async fn usd_rates(&self) -> Result<HashMap<String, f64>, ExchangeError>;
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct HttpRateSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRateSource {
    pub fn from_settings(settings: &ExchangeSettings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("failed to build exchange rate http client")?;
        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
        })
    }

    fn url(&self) -> String {
        format!("{}/v4/latest/USD", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl RateSource for HttpRateSource {
    async fn usd_rates(&self) -> Result<HashMap<String, f64>, ExchangeError> {
        let res = self
            .http
            .get(self.url())
            .send()
            .await
            .map_err(|e| ExchangeError::ServiceUnavailable(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(ExchangeError::ServiceUnavailable(format!("HTTP {status}")));
        }

        let parsed = res
            .json::<RatesResponse>()
            .await
            .map_err(|e| ExchangeError::MalformedResponse(e.to_string()))?;
        Ok(parsed.rates)
    }
}

#[derive(Clone)]
pub struct CurrencyConverter {
    source: Arc<dyn RateSource>,
}

impl CurrencyConverter {
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self { source }
    }

    pub fn should_convert(price: &ExtractedPrice, target: Currency) -> bool {
        price.currency == Currency::Usd && target != Currency::Usd
    }

    async fn usd_rate(&self, target: Currency) -> Result<f64, ExchangeError> {
        let rates = self.source.usd_rates().await?;
        rates
            .get(target.code())
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or(ExchangeError::RateNotAvailable(target))
    }

    /// Never fails the request: every error path logs and returns `None`.
    pub async fn convert(&self, price: &ExtractedPrice, target: Currency) -> Option<ConvertedPrice> {
        if !Self::should_convert(price, target) {
            return None;
        }

        let Some(amount) = price.numeric_amount() else {
            tracing::warn!(amount = %price.amount, "could not parse extracted amount; skipping conversion");
            return None;
        };

        match self.usd_rate(target).await {
            Ok(rate) => {
                let converted = amount * rate;
                tracing::info!(%target, rate, amount, converted, "converted price");
                Some(ConvertedPrice {
                    amount: format!("{converted:.2}"),
                    currency: target,
                })
            }
            Err(err) => {
                tracing::warn!(%target, error = %err, "exchange rate lookup failed; skipping conversion");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedRates {
        rates: Option<HashMap<String, f64>>,
        calls: AtomicU32,
    }

    impl FixedRates {
        fn ok(pairs: &[(&str, f64)]) -> Arc<Self> {
            Arc::new(Self {
                rates: Some(pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()),
                calls: AtomicU32::new(0),
            })
        }

        fn down() -> Arc<Self> {
            Arc::new(Self {
                rates: None,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl RateSource for FixedRates {
        async fn usd_rates(&self) -> Result<HashMap<String, f64>, ExchangeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.rates
                .clone()
                .ok_or_else(|| ExchangeError::ServiceUnavailable("connection refused".to_string()))
        }
    }

    #[test]
    fn decodes_rate_table_and_builds_url() {
        let body = r#"{
            "provider": "https://www.exchangerate-api.com",
            "base": "USD",
            "date": "2024-12-15",
            "rates": {"USD": 1, "INR": 84.82, "EUR": 0.952}
        }"#;
        let parsed: RatesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.rates.get("INR").copied(), Some(84.82));
        assert_eq!(parsed.rates.get("USD").copied(), Some(1.0));

        let source = HttpRateSource::from_settings(&ExchangeSettings {
            base_url: "https://rates.example/".to_string(),
            timeout: std::time::Duration::from_secs(5),
        })
        .unwrap();
        assert_eq!(source.url(), "https://rates.example/v4/latest/USD");
    }

    #[test]
    fn body_without_rates_is_rejected() {
        assert!(serde_json::from_str::<RatesResponse>(r#"{"result": "error"}"#).is_err());
    }

    fn usd(amount: &str) -> ExtractedPrice {
        ExtractedPrice {
            amount: amount.to_string(),
            currency: Currency::Usd,
        }
    }

    #[tokio::test]
    async fn converts_usd_to_inr() {
        let converter = CurrencyConverter::new(FixedRates::ok(&[("INR", 83.0), ("EUR", 0.92)]));
        let converted = converter.convert(&usd("500"), Currency::Inr).await.unwrap();
        assert_eq!(converted.amount, "41500.00");
        assert_eq!(converted.currency, Currency::Inr);

        let converted = converter.convert(&usd("1,000"), Currency::Eur).await.unwrap();
        assert_eq!(converted.amount, "920.00");
    }

    #[tokio::test]
    async fn rate_source_failure_is_swallowed() {
        let converter = CurrencyConverter::new(FixedRates::down());
        assert!(converter.convert(&usd("500"), Currency::Inr).await.is_none());
    }

    #[tokio::test]
    async fn unparseable_amount_skips_conversion() {
        let source = FixedRates::ok(&[("INR", 83.0)]);
        let converter = CurrencyConverter::new(source.clone());
        assert!(converter.convert(&usd("five hundred"), Currency::Inr).await.is_none());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_rate_entry_is_swallowed() {
        let converter = CurrencyConverter::new(FixedRates::ok(&[("EUR", 0.92)]));
        assert!(converter.convert(&usd("500"), Currency::Jpy).await.is_none());
    }

    #[tokio::test]
    async fn skips_when_not_usd_or_same_currency() {
        let source = FixedRates::ok(&[("INR", 83.0)]);
        let converter = CurrencyConverter::new(source.clone());

        let eur = ExtractedPrice {
            amount: "250".to_string(),
            currency: Currency::Eur,
        };
        assert!(converter.convert(&eur, Currency::Inr).await.is_none());
        assert!(converter.convert(&usd("500"), Currency::Usd).await.is_none());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetches_fresh_rate_every_time() {
        let source = FixedRates::ok(&[("INR", 83.0)]);
        let converter = CurrencyConverter::new(source.clone());
        converter.convert(&usd("1"), Currency::Inr).await;
        converter.convert(&usd("1"), Currency::Inr).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
