use crate::domain::currency::Currency;
use serde::{Deserialize, Serialize};

pub const UNAVAILABLE_PRICE: &str = "Unavailable";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPrice {
    /// The amount exactly as the model wrote it, e.g. `1,250.50`.
    pub amount: String,
    pub currency: Currency,
}

impl ExtractedPrice {
    pub fn price_text(&self) -> String {
        format!("{} {}", self.amount, self.currency)
    }

    pub fn numeric_amount(&self) -> Option<f64> {
        self.amount
            .replace(',', "")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedPrice {
    pub amount: String,
    pub currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResponse {
    pub price: String,
    pub currency: String,
    pub information: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_currency: Option<String>,
}

impl PriceResponse {
    pub fn quoted(
        price: &ExtractedPrice,
        information: String,
        converted: Option<ConvertedPrice>,
    ) -> Self {
        let (converted_price, converted_currency) = match converted {
            Some(c) => (Some(c.amount), Some(c.currency.code().to_string())),
            None => (None, None),
        };
        Self {
            price: price.price_text(),
            currency: price.currency.code().to_string(),
            information,
            converted_price,
            converted_currency,
        }
    }

    /// The model did not quote a price; `information` carries its reply
    /// (usually a follow-up question) verbatim.
    pub fn unavailable(information: String) -> Self {
        Self {
            price: UNAVAILABLE_PRICE.to_string(),
            currency: Currency::Usd.code().to_string(),
            information,
            converted_price: None,
            converted_currency: None,
        }
    }
}
