use once_cell::sync::Lazy;
use regex::Regex;

static YEARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:years?|yrs?|y)").unwrap());
static MONTHS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:months?|mons?|m)").unwrap());
static BARE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?$").unwrap());

/// Converts a free-text experience string into years, rounded to one decimal.
///
/// A year quantity and a month quantity are summed when both are present
/// ("2 years 6 months" is 2.5). A bare number is read as years. Anything
/// else is 0.
pub fn parse_experience_years(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let years = first_quantity(&YEARS_RE, trimmed);
    let months = first_quantity(&MONTHS_RE, trimmed);

    let total = match (years, months) {
        (None, None) if BARE_NUMBER_RE.is_match(trimmed) => trimmed.parse::<f64>().unwrap_or(0.0),
        (None, None) => 0.0,
        (years, months) => years.unwrap_or(0.0) + months.unwrap_or(0.0) / 12.0,
    };

    round_to_tenth(total.max(0.0))
}

fn first_quantity(regex: &Regex, text: &str) -> Option<f64> {
    regex
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
