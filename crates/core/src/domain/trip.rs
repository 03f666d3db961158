use crate::domain::currency::Currency;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inbound request body. Every field is optional on the wire so that missing
/// or out-of-range values surface as a `ValidationError` with a readable
/// message instead of a generic deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripQueryPayload {
    #[serde(default)]
    pub departure_city: Option<String>,
    #[serde(default)]
    pub destination_city: Option<String>,
    #[serde(default)]
    pub departure_date: Option<String>,
    #[serde(default)]
    pub return_date: Option<String>,
    #[serde(default)]
    pub travelers: Option<i64>,
    #[serde(default)]
    pub cabin_class: Option<String>,
    #[serde(default)]
    pub checked_bags: Option<i64>,
    #[serde(default)]
    pub meal_plan: Option<bool>,
    #[serde(default)]
    pub preferred_currency: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CabinClass {
    #[default]
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl CabinClass {
    pub fn label(self) -> &'static str {
        match self {
            CabinClass::Economy => "economy",
            CabinClass::PremiumEconomy => "premium economy",
            CabinClass::Business => "business",
            CabinClass::First => "first",
        }
    }
}

impl FromStr for CabinClass {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "economy" => Ok(CabinClass::Economy),
            "premium-economy" => Ok(CabinClass::PremiumEconomy),
            "business" => Ok(CabinClass::Business),
            "first" => Ok(CabinClass::First),
            _ => Err(ValidationError::UnsupportedCabinClass(s.trim().to_string())),
        }
    }
}

impl fmt::Display for CabinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripType {
    OneWay,
    RoundTrip,
}

impl TripType {
    pub fn label(self) -> &'static str {
        match self {
            TripType::OneWay => "one-way",
            TripType::RoundTrip => "round trip",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{field} must be a date in YYYY-MM-DD format (got {value:?})")]
    MalformedDate { field: &'static str, value: String },
    #[error("return date {return_date} is before departure date {departure_date}")]
    ReturnBeforeDeparture {
        departure_date: NaiveDate,
        return_date: NaiveDate,
    },
    #[error("travelers must be a positive integer (got {0})")]
    NonPositiveTravelers(i64),
    #[error("unsupported cabin class: {0:?} (expected economy, premium-economy, business or first)")]
    UnsupportedCabinClass(String),
    #[error("checked bags must not be negative (got {0})")]
    NegativeBags(i64),
    #[error("unsupported currency code: {0:?}")]
    UnsupportedCurrency(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripQuery {
    pub departure_city: String,
    pub destination_city: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub travelers: u32,
    pub cabin_class: CabinClass,
    pub checked_bags: u32,
    pub meal_plan: bool,
    pub preferred_currency: Currency,
}

impl TripQuery {
    pub fn trip_type(&self) -> TripType {
        if self.return_date.is_some() {
            TripType::RoundTrip
        } else {
            TripType::OneWay
        }
    }

    /// Validates a raw payload, applying defaults for absent optional fields.
    /// `supported` is the configured list of currencies a caller may request.
    pub fn from_payload(
        payload: TripQueryPayload,
        supported: &[Currency],
    ) -> Result<Self, ValidationError> {
        let departure_city = required_text(payload.departure_city, "departureCity")?;
        let destination_city = required_text(payload.destination_city, "destinationCity")?;

        let departure_date = payload
            .departure_date
            .ok_or(ValidationError::MissingField("departureDate"))
            .and_then(|s| parse_date(&s, "departureDate"))?;

        let return_date = match payload.return_date.filter(|s| !s.trim().is_empty()) {
            Some(s) => Some(parse_date(&s, "returnDate")?),
            None => None,
        };
        if let Some(return_date) = return_date {
            // Same-day returns (day trips) are allowed.
            if return_date < departure_date {
                return Err(ValidationError::ReturnBeforeDeparture {
                    departure_date,
                    return_date,
                });
            }
        }

        let travelers = match payload.travelers {
            None => 1,
            Some(n) if n >= 1 => {
                u32::try_from(n).map_err(|_| ValidationError::NonPositiveTravelers(n))?
            }
            Some(n) => return Err(ValidationError::NonPositiveTravelers(n)),
        };

        let cabin_class = match payload.cabin_class.as_deref().map(str::trim) {
            None | Some("") => CabinClass::default(),
            Some(s) => s.parse()?,
        };

        let checked_bags = match payload.checked_bags {
            None => 0,
            Some(n) if n >= 0 => u32::try_from(n).map_err(|_| ValidationError::NegativeBags(n))?,
            Some(n) => return Err(ValidationError::NegativeBags(n)),
        };

        let preferred_currency = match payload.preferred_currency.as_deref().map(str::trim) {
            None | Some("") => Currency::Usd,
            Some(s) => s
                .parse::<Currency>()
                .ok()
                .filter(|c| supported.contains(c))
                .ok_or_else(|| ValidationError::UnsupportedCurrency(s.to_string()))?,
        };

        Ok(Self {
            departure_city,
            destination_city,
            departure_date,
            return_date,
            travelers,
            cabin_class,
            checked_bags,
            meal_plan: payload.meal_plan.unwrap_or(false),
            preferred_currency,
        })
    }
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::MissingField(field))
}

fn parse_date(value: &str, field: &'static str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        ValidationError::MalformedDate {
            field,
            value: value.to_string(),
        }
    })
}
