use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
    Inr,
}

impl Currency {
    pub const ALL: [Currency; 5] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Jpy,
        Currency::Inr,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Inr => "INR",
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Currency::Usd => '$',
            Currency::Eur => '€',
            Currency::Gbp => '£',
            Currency::Jpy => '¥',
            Currency::Inr => '₹',
        }
    }

    /// `None` means the symbol is not one we can attribute to a single code.
    pub fn from_symbol(symbol: char) -> Option<Currency> {
        Currency::ALL.into_iter().find(|c| c.symbol() == symbol)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported currency code: {0}")]
pub struct UnknownCurrency(pub String);

impl FromStr for Currency {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| UnknownCurrency(s.trim().to_string()))
    }
}

/// Parses a comma-separated code list such as `USD,EUR,INR`.
pub fn parse_currency_list(raw: &str) -> Result<Vec<Currency>, UnknownCurrency> {
    let mut out = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let currency = part.parse::<Currency>()?;
        if !out.contains(&currency) {
            out.push(currency);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!("inr".parse::<Currency>().unwrap(), Currency::Inr);
        assert_eq!(" Eur ".parse::<Currency>().unwrap(), Currency::Eur);
        assert!("XYZ".parse::<Currency>().is_err());
    }

    #[test]
    fn maps_known_symbols_only() {
        assert_eq!(Currency::from_symbol('£'), Some(Currency::Gbp));
        assert_eq!(Currency::from_symbol('₹'), Some(Currency::Inr));
        assert_eq!(Currency::from_symbol('₩'), None);
    }

    #[test]
    fn currency_list_dedups_and_rejects_unknown() {
        let list = parse_currency_list("USD, eur,USD").unwrap();
        assert_eq!(list, vec![Currency::Usd, Currency::Eur]);
        assert!(parse_currency_list("USD,ABC").is_err());
    }
}
