use once_cell::sync::Lazy;
use regex::Regex;

static STRIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[₹$€£¥,]|\b(?:inr|usd|rs\.?)").unwrap());
static LAKH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*(?:lpa|lakhs?|lacs?|l)").unwrap());
static THOUSAND_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*k").unwrap());
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

const LAKH: f64 = 100_000.0;
const THOUSAND: f64 = 1_000.0;

/// Ordering key for a free-text compensation string. Not a currency value.
///
/// Only the first pattern in lakh, thousand, bare-number order applies.
pub fn compensation_magnitude(text: &str) -> f64 {
    let lowered = text.to_lowercase();
    let cleaned = STRIP_RE.replace_all(&lowered, "");

    if let Some(value) = scaled_capture(&LAKH_RE, &cleaned, LAKH) {
        return value;
    }

    if let Some(value) = scaled_capture(&THOUSAND_RE, &cleaned, THOUSAND) {
        return value;
    }

    NUMBER_RE
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn scaled_capture(regex: &Regex, text: &str, factor: f64) -> Option<f64> {
    regex
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|value| value * factor)
}
