use crate::domain::currency::{parse_currency_list, Currency};
use crate::llm::retry::RetryPolicy;
use crate::llm::{GenerationSettings, Provider};
use anyhow::{ensure, Context};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
const DEFAULT_BACKOFF_MIN_SECS: u64 = 1;
const DEFAULT_BACKOFF_MAX_SECS: u64 = 10;
const DEFAULT_EXCHANGE_RATE_BASE_URL: &str = "https://api.exchangerate-api.com";
const DEFAULT_EXCHANGE_RATE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_DEADLINE_SECS: u64 = 90;
const DEFAULT_PORT: u16 = 3000;

/// Process-wide configuration, read once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: LlmSettings,
    pub retry: RetryPolicy,
    pub exchange: ExchangeSettings,
    pub supported_currencies: Vec<Currency>,
    pub request_deadline: Duration,
    pub sentry_dsn: Option<String>,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: Provider,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: Option<String>,
    pub generation: GenerationSettings,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ExchangeSettings {
    pub base_url: String,
    pub timeout: Duration,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let provider = parse_or(var("LLM_PROVIDER"), "LLM_PROVIDER", Provider::Gemini)?;
        let model = var("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string());
        let temperature = parse_or(var("LLM_TEMPERATURE"), "LLM_TEMPERATURE", DEFAULT_TEMPERATURE)?;
        ensure!(
            (0.0..=2.0).contains(&temperature),
            "LLM_TEMPERATURE must be between 0 and 2 (got {temperature})"
        );
        let max_tokens = parse_or(var("LLM_MAX_TOKENS"), "LLM_MAX_TOKENS", DEFAULT_MAX_TOKENS)?;
        let llm_timeout = parse_or(var("LLM_TIMEOUT_SECS"), "LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS)?;

        let max_attempts = parse_or(var("LLM_MAX_ATTEMPTS"), "LLM_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        let multiplier = parse_or(
            var("LLM_BACKOFF_MULTIPLIER"),
            "LLM_BACKOFF_MULTIPLIER",
            DEFAULT_BACKOFF_MULTIPLIER,
        )?;
        let min_wait = parse_or(var("LLM_BACKOFF_MIN_SECS"), "LLM_BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS)?;
        let max_wait = parse_or(var("LLM_BACKOFF_MAX_SECS"), "LLM_BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS)?;
        let retry = RetryPolicy {
            max_attempts,
            multiplier,
            min_wait: Duration::from_secs(min_wait),
            max_wait: Duration::from_secs(max_wait),
        };
        retry.validate()?;

        let supported_currencies = match var("SUPPORTED_CURRENCIES") {
            Some(raw) => parse_currency_list(&raw).context("invalid SUPPORTED_CURRENCIES")?,
            None => Currency::ALL.to_vec(),
        };
        ensure!(
            supported_currencies.contains(&Currency::Usd),
            "SUPPORTED_CURRENCIES must include USD"
        );

        let exchange_timeout = parse_or(
            var("EXCHANGE_RATE_TIMEOUT_SECS"),
            "EXCHANGE_RATE_TIMEOUT_SECS",
            DEFAULT_EXCHANGE_RATE_TIMEOUT_SECS,
        )?;
        let deadline = parse_or(
            var("REQUEST_DEADLINE_SECS"),
            "REQUEST_DEADLINE_SECS",
            DEFAULT_REQUEST_DEADLINE_SECS,
        )?;
        ensure!(deadline > 0, "REQUEST_DEADLINE_SECS must be positive");

        Ok(Self {
            llm: LlmSettings {
                provider,
                gemini_api_key: var("GEMINI_API_KEY"),
                gemini_base_url: var("GEMINI_BASE_URL"),
                anthropic_api_key: var("ANTHROPIC_API_KEY"),
                anthropic_base_url: var("ANTHROPIC_BASE_URL"),
                generation: GenerationSettings {
                    model,
                    temperature,
                    max_tokens,
                },
                timeout: Duration::from_secs(llm_timeout),
            },
            retry,
            exchange: ExchangeSettings {
                base_url: var("EXCHANGE_RATE_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_EXCHANGE_RATE_BASE_URL.to_string()),
                timeout: Duration::from_secs(exchange_timeout),
            },
            supported_currencies,
            request_deadline: Duration::from_secs(deadline),
            sentry_dsn: var("SENTRY_DSN"),
            port: parse_or(var("PORT"), "PORT", DEFAULT_PORT)?,
        })
    }

    pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
        self.llm
            .gemini_api_key
            .as_deref()
            .context("GEMINI_API_KEY is required")
    }

    pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
        self.llm
            .anthropic_api_key
            .as_deref()
            .context("ANTHROPIC_API_KEY is required")
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(s) => s
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key}={s:?}: {e}")),
    }
}
