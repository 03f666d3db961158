use crate::config::Settings;
use crate::domain::currency::Currency;
use crate::domain::price::PriceResponse;
use crate::domain::trip::{TripQuery, TripQueryPayload, ValidationError};
use crate::llm::error::UpstreamError;
use crate::llm::retry::ResilientCaller;
use crate::llm::{prompt, LlmClient};
use crate::pricing::extract::{PriceParser, RegexPriceParser};
use crate::pricing::fx::{CurrencyConverter, HttpRateSource, RateSource};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("invalid trip query: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("price lookup did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

/// Runs one stateless quote: validate, render the prompt, call the model,
/// extract a price, optionally convert it. Shared read-only across requests.
#[derive(Clone)]
pub struct QuoteService {
    caller: ResilientCaller,
    parser: Arc<dyn PriceParser>,
    converter: CurrencyConverter,
    supported_currencies: Vec<Currency>,
    deadline: Duration,
}

impl QuoteService {
    pub fn new(
        caller: ResilientCaller,
        parser: Arc<dyn PriceParser>,
        converter: CurrencyConverter,
        supported_currencies: Vec<Currency>,
        deadline: Duration,
    ) -> Self {
        Self {
            caller,
            parser,
            converter,
            supported_currencies,
            deadline,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let llm = crate::llm::client_from_settings(settings)?;
        let rates: Arc<dyn RateSource> = Arc::new(HttpRateSource::from_settings(&settings.exchange)?);
        Self::with_clients(settings, llm, rates)
    }

    /// Same wiring as `from_settings`, with the outbound clients supplied.
    pub fn with_clients(
        settings: &Settings,
        llm: Arc<dyn LlmClient>,
        rates: Arc<dyn RateSource>,
    ) -> anyhow::Result<Self> {
        let parser = RegexPriceParser::new(&settings.supported_currencies)?;
        Ok(Self::new(
            ResilientCaller::new(llm, settings.retry.clone()),
            Arc::new(parser),
            CurrencyConverter::new(rates),
            settings.supported_currencies.clone(),
            settings.request_deadline,
        ))
    }

    pub async fn quote_payload(&self, payload: TripQueryPayload) -> Result<PriceResponse, QuoteError> {
        let query = TripQuery::from_payload(payload, &self.supported_currencies)?;
        self.quote(&query).await
    }

    pub async fn quote(&self, query: &TripQuery) -> Result<PriceResponse, QuoteError> {
        match tokio::time::timeout(self.deadline, self.run(query)).await {
            Ok(res) => res,
            Err(_) => {
                tracing::error!(deadline = ?self.deadline, "quote deadline exceeded");
                Err(QuoteError::DeadlineExceeded(self.deadline))
            }
        }
    }

    async fn run(&self, query: &TripQuery) -> Result<PriceResponse, QuoteError> {
        let prompt = prompt::render_query(query);
        tracing::debug!(
            from = %query.departure_city,
            to = %query.destination_city,
            departure_date = %query.departure_date,
            trip_type = query.trip_type().label(),
            "prompt built"
        );

        let reply = self.caller.generate(&prompt).await?;

        let Some(price) = self.parser.extract(&reply) else {
            tracing::info!("no price in model reply; returning it as a follow-up");
            return Ok(PriceResponse::unavailable(reply));
        };

        let converted = self.converter.convert(&price, query.preferred_currency).await;
        tracing::info!(
            price = %price.price_text(),
            converted = converted.as_ref().map(|c| c.amount.as_str()),
            "quote ready"
        );
        Ok(PriceResponse::quoted(&price, reply, converted))
    }
}
