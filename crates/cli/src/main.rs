use clap::{Parser, Subcommand};
use farecast_core::domain::trip::TripQueryPayload;
use farecast_core::quote::{QuoteError, QuoteService};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "farecast_cli")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Estimate a flight price once and print the result.
    Quote(QuoteArgs),
}

#[derive(Debug, clap::Args)]
struct QuoteArgs {
    /// Departure city.
    #[arg(long = "from")]
    departure_city: String,

    /// Destination city.
    #[arg(long = "to")]
    destination_city: String,

    /// Departure date (YYYY-MM-DD).
    #[arg(long = "depart")]
    departure_date: String,

    /// Return date (YYYY-MM-DD). Omit for a one-way trip.
    #[arg(long = "return")]
    return_date: Option<String>,

    #[arg(long, default_value_t = 1)]
    travelers: i64,

    /// economy, premium-economy, business or first.
    #[arg(long, default_value = "economy")]
    cabin: String,

    #[arg(long, default_value_t = 0)]
    bags: i64,

    /// Include a meal plan.
    #[arg(long)]
    meal: bool,

    /// Preferred currency code, e.g. INR.
    #[arg(long, default_value = "USD")]
    currency: String,

    /// Print the response as JSON instead of text.
    #[arg(long)]
    json: bool,
}

impl QuoteArgs {
    fn payload(&self) -> TripQueryPayload {
        TripQueryPayload {
            departure_city: Some(self.departure_city.clone()),
            destination_city: Some(self.destination_city.clone()),
            departure_date: Some(self.departure_date.clone()),
            return_date: self.return_date.clone(),
            travelers: Some(self.travelers),
            cabin_class: Some(self.cabin.clone()),
            checked_bags: Some(self.bags),
            meal_plan: Some(self.meal),
            preferred_currency: Some(self.currency.clone()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = farecast_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let Command::Quote(quote_args) = args.command;

    let quotes = QuoteService::from_settings(&settings)?;

    match quotes.quote_payload(quote_args.payload()).await {
        Ok(res) => {
            if quote_args.json {
                println!("{}", serde_json::to_string_pretty(&res)?);
            } else {
                println!("Price: {} ({})", res.price, res.currency);
                if let (Some(price), Some(currency)) = (&res.converted_price, &res.converted_currency) {
                    println!("Converted: {price} {currency}");
                }
                println!();
                println!("{}", res.information);
            }
            Ok(())
        }
        Err(QuoteError::Validation(e)) => {
            anyhow::bail!("invalid trip: {e}")
        }
        Err(err) => {
            let err = anyhow::Error::new(err);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "quote failed");
            Err(err)
        }
    }
}

fn init_sentry(settings: &farecast_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_round_trip_arguments() {
        let args = Args::try_parse_from([
            "farecast_cli",
            "quote",
            "--from",
            "New York",
            "--to",
            "London",
            "--depart",
            "2024-12-15",
            "--return",
            "2024-12-22",
            "--travelers",
            "2",
            "--cabin",
            "business",
            "--meal",
            "--currency",
            "INR",
        ])
        .unwrap();
        let Command::Quote(q) = args.command;
        let payload = q.payload();
        assert_eq!(payload.return_date.as_deref(), Some("2024-12-22"));
        assert_eq!(payload.travelers, Some(2));
        assert_eq!(payload.checked_bags, Some(0));
        assert_eq!(payload.meal_plan, Some(true));
        assert_eq!(payload.preferred_currency.as_deref(), Some("INR"));
    }

    #[test]
    fn defaults_match_api_defaults() {
        let args = Args::try_parse_from([
            "farecast_cli",
            "quote",
            "--from",
            "Paris",
            "--to",
            "Rome",
            "--depart",
            "2025-01-05",
        ])
        .unwrap();
        let Command::Quote(q) = args.command;
        assert!(q.return_date.is_none());
        assert_eq!(q.cabin, "economy");
        assert_eq!(q.currency, "USD");
        assert!(!q.json);
    }
}
