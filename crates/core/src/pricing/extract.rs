use crate::domain::currency::Currency;
use crate::domain::price::ExtractedPrice;
use regex::{Captures, Regex};

/// Turns free model text into a structured price, or `None` when the text
/// does not quote one (typically a follow-up question).
pub trait PriceParser: Send + Sync {
    fn extract(&self, reply: &str) -> Option<ExtractedPrice>;
}

// Either a comma-grouped number or a plain run of digits, with optional decimals.
const AMOUNT: &str = r"(?P<amount>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)";
const SYMBOL: &str = r"(?P<symbol>\p{Sc})";

#[derive(Debug, Clone)]
struct PricePattern {
    name: &'static str,
    regex: Regex,
}

/// Ordered regex patterns; an earlier pattern wins even if a later one
/// matches further left in the text.
#[derive(Debug, Clone)]
pub struct RegexPriceParser {
    currencies: Vec<Currency>,
    patterns: Vec<PricePattern>,
}

impl RegexPriceParser {
    pub fn new(currencies: &[Currency]) -> anyhow::Result<Self> {
        anyhow::ensure!(!currencies.is_empty(), "at least one currency code is required");

        let codes = currencies
            .iter()
            .map(|c| regex::escape(c.code()))
            .collect::<Vec<_>>()
            .join("|");
        let code = format!(r"(?P<code>{codes})\b");

        let sources = [
            ("approximately", format!(r"(?i)\bapproximately\s+{SYMBOL}{AMOUNT}(?:\s*{code})?")),
            ("symbol_with_code", format!(r"(?i){SYMBOL}{AMOUNT}(?:\s*{code})?")),
            ("symbol_only", format!(r"(?i){SYMBOL}\s*{AMOUNT}")),
            ("bare_code", format!(r"(?i)\b{AMOUNT}\s*{code}")),
        ];

        let mut patterns = Vec::with_capacity(sources.len());
        for (name, source) in sources {
            patterns.push(PricePattern {
                name,
                regex: Regex::new(&source)?,
            });
        }

        Ok(Self {
            currencies: currencies.to_vec(),
            patterns,
        })
    }

    fn resolve(&self, pattern: &PricePattern, caps: &Captures<'_>) -> Option<ExtractedPrice> {
        let amount = caps.name("amount")?.as_str().to_string();

        if let Some(code) = caps.name("code") {
            let currency = code.as_str().parse::<Currency>().ok()?;
            return Some(ExtractedPrice { amount, currency });
        }

        let symbol = caps.name("symbol")?.as_str().chars().next()?;
        match Currency::from_symbol(symbol).filter(|c| self.currencies.contains(c)) {
            Some(currency) => Some(ExtractedPrice { amount, currency }),
            None => {
                tracing::debug!(
                    pattern = pattern.name,
                    %symbol,
                    amount = %amount,
                    "unrecognised currency symbol without code; skipping candidate"
                );
                None
            }
        }
    }
}

impl PriceParser for RegexPriceParser {
    fn extract(&self, reply: &str) -> Option<ExtractedPrice> {
        for pattern in &self.patterns {
            for caps in pattern.regex.captures_iter(reply) {
                if let Some(price) = self.resolve(pattern, &caps) {
                    tracing::debug!(
                        pattern = pattern.name,
                        amount = %price.amount,
                        currency = %price.currency,
                        "extracted price"
                    );
                    return Some(price);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> RegexPriceParser {
        RegexPriceParser::new(&Currency::ALL).unwrap()
    }

    fn extract(text: &str) -> Option<(String, Currency)> {
        parser()
            .extract(text)
            .map(|p| (p.price_text(), p.currency))
    }

    #[test]
    fn approximately_with_symbol_and_code() {
        assert_eq!(
            extract("The estimated price is approximately $500 USD."),
            Some(("500 USD".to_string(), Currency::Usd))
        );
    }

    #[test]
    fn symbol_without_code_infers_currency() {
        assert_eq!(extract("$500"), Some(("500 USD".to_string(), Currency::Usd)));
        assert_eq!(extract("€250"), Some(("250 EUR".to_string(), Currency::Eur)));
        assert_eq!(extract("about £ 99.50 each"), Some(("99.50 GBP".to_string(), Currency::Gbp)));
        assert_eq!(extract("¥68000"), Some(("68000 JPY".to_string(), Currency::Jpy)));
    }

    #[test]
    fn bare_amount_with_code() {
        assert_eq!(
            extract("the cost is 300 EUR"),
            Some(("300 EUR".to_string(), Currency::Eur))
        );
        assert_eq!(
            extract("roughly 41,500 inr in total"),
            Some(("41,500 INR".to_string(), Currency::Inr))
        );
    }

    #[test]
    fn explicit_code_beats_symbol() {
        assert_eq!(extract("$700 EUR"), Some(("700 EUR".to_string(), Currency::Eur)));
    }

    #[test]
    fn no_price_in_clarifying_question() {
        assert_eq!(extract("Which city will you be departing from?"), None);
        assert_eq!(extract("How many travelers, and on 2024-12-15?"), None);
    }

    #[test]
    fn priority_order_beats_position() {
        let text = "Seat selection adds £20. Okay, for a one-way trip from New York to London \
                    on 2024-12-15, the estimated price is approximately $500 USD.";
        assert_eq!(extract(text), Some(("500 USD".to_string(), Currency::Usd)));
    }

    #[test]
    fn unknown_symbol_is_not_guessed_as_usd() {
        assert_eq!(extract("₩650000"), None);
        // Falls through to a later candidate that does resolve.
        assert_eq!(
            extract("₩650000 or about 480 USD"),
            Some(("480 USD".to_string(), Currency::Usd))
        );
    }

    #[test]
    fn code_list_is_configurable() {
        let parser = RegexPriceParser::new(&[Currency::Usd, Currency::Eur]).unwrap();
        assert!(parser.extract("about 5000 INR").is_none());
        assert!(parser.extract("₹5000").is_none());
        assert_eq!(
            parser.extract("about 300 eur").map(|p| p.currency),
            Some(Currency::Eur)
        );
    }

    #[test]
    fn keeps_decimals_and_grouping_as_written() {
        let p = parser().extract("approximately $1,234.56 USD").unwrap();
        assert_eq!(p.amount, "1,234.56");
        assert_eq!(p.numeric_amount(), Some(1234.56));
    }
}
