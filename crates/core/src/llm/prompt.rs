use crate::domain::currency::Currency;
use crate::domain::trip::{CabinClass, TripQuery, TripType, DATE_FORMAT};
use chrono::NaiveDate;
use std::fmt::Write;

pub const NOT_PROVIDED: &str = "Not provided yet";
const ONE_WAY_RETURN: &str = "none (one-way trip)";

const PREAMBLE: &str = "\
You are an experienced travel agent who estimates flight prices.
Work through the trip details below. If any required detail is marked \"Not provided yet\", \
do not guess it: ask the traveler a short, friendly follow-up question for the single most \
important missing detail instead of quoting a price.";

const EXAMPLES: &str = "\
Examples of the expected conversation style:

Example 1 (missing information)
Traveler: I want to fly to Paris.
Agent: Happy to help! Which city will you be departing from?
Traveler: Boston.
Agent: Great. What date would you like to leave, and is this a one-way or round trip?

Example 2 (one-way, all details known)
Traveler: One-way from Chicago to Tokyo on 2024-03-10, 1 traveler, economy, 1 checked bag, no meal plan, prices in USD.
Agent: Okay, for a one-way trip from Chicago to Tokyo on 2024-03-10 for 1 traveler in economy with 1 checked bag and no meal plan, the estimated price is approximately $850 USD.

Example 3 (round trip, all details known)
Traveler: Round trip from London to New York, leaving 2024-06-01 and returning 2024-06-15, 2 travelers, business, 2 checked bags, with meals, prices in GBP.
Agent: Okay, for a round trip from London to New York on 2024-06-01 returning 2024-06-15 for 2 travelers in business with 2 checked bags and a meal plan, the estimated price is approximately £6400 GBP.";

const RULES: &str = "\
Rules:
- For a one-way trip, never mention or ask about a return date.
- Give a price only once every required detail above is known; otherwise ask a follow-up question.
- When you give a price, state it exactly once using the pattern: \
\"Okay, for a [one-way/round trip] from X to Y on D ..., the estimated price is approximately <symbol><amount> <CODE>.\"
- Quote the price in the preferred currency when it is known, otherwise in USD.";

/// The slots the model is asked to work through. Any of them may still be
/// unknown; `From<&TripQuery>` fills all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptFields {
    pub trip_type: Option<TripType>,
    pub departure_city: Option<String>,
    pub destination_city: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub travelers: Option<u32>,
    pub cabin_class: Option<CabinClass>,
    pub checked_bags: Option<u32>,
    pub meal_plan: Option<bool>,
    pub preferred_currency: Option<Currency>,
}

impl From<&TripQuery> for PromptFields {
    fn from(q: &TripQuery) -> Self {
        Self {
            trip_type: Some(q.trip_type()),
            departure_city: Some(q.departure_city.clone()),
            destination_city: Some(q.destination_city.clone()),
            departure_date: Some(q.departure_date),
            return_date: q.return_date,
            travelers: Some(q.travelers),
            cabin_class: Some(q.cabin_class),
            checked_bags: Some(q.checked_bags),
            meal_plan: Some(q.meal_plan),
            preferred_currency: Some(q.preferred_currency),
        }
    }
}

fn known<T>(value: Option<T>, render: impl FnOnce(T) -> String) -> String {
    value.map(render).unwrap_or_else(|| NOT_PROVIDED.to_string())
}

fn date(d: NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

impl PromptFields {
    // Trip type is folded into this line so a return date never touches
    // any other line.
    fn return_date_line(&self) -> String {
        match (self.return_date, self.trip_type) {
            (Some(d), _) => date(d),
            (None, Some(TripType::OneWay)) => ONE_WAY_RETURN.to_string(),
            (None, _) => NOT_PROVIDED.to_string(),
        }
    }

    fn lines(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Departure city", known(self.departure_city.clone(), |s| s)),
            ("Destination city", known(self.destination_city.clone(), |s| s)),
            ("Departure date", known(self.departure_date, date)),
            ("Return date", self.return_date_line()),
            ("Number of travelers", known(self.travelers, |n| n.to_string())),
            ("Cabin class", known(self.cabin_class, |c| c.label().to_string())),
            ("Checked bags", known(self.checked_bags, |n| n.to_string())),
            (
                "Meal plan",
                known(self.meal_plan, |m| (if m { "Yes" } else { "No" }).to_string()),
            ),
            (
                "Preferred currency",
                known(self.preferred_currency, |c| c.code().to_string()),
            ),
        ]
    }
}

/// Renders the instruction prompt. Pure: identical fields always give
/// byte-identical output.
pub fn render(fields: &PromptFields) -> String {
    let mut out = String::with_capacity(2048);
    out.push_str(PREAMBLE);
    out.push_str("\n\nTrip details:\n");
    for (i, (label, value)) in fields.lines().into_iter().enumerate() {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{}. {label}: {value}", i + 1);
    }
    out.push('\n');
    out.push_str(EXAMPLES);
    out.push_str("\n\n");
    out.push_str(RULES);
    out.push('\n');
    out
}

pub fn render_query(query: &TripQuery) -> String {
    render(&PromptFields::from(query))
}
