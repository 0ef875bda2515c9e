use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use super::experience::parse_experience_years;
use super::models::{Candidate, ResumeExtraction};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Keeps only the digits of a phone number, whatever punctuation the
/// resume used.
pub fn normalize_mobile(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// Lowercases the first address found; text that holds no recognizable
/// address is kept trimmed so the reviewer can still see it.
pub fn normalize_email(text: &str) -> String {
    EMAIL_RE
        .find(text)
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_else(|| text.trim().to_string())
}

pub fn clean_text(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

pub fn clean_skills(skills: Vec<String>) -> Vec<String> {
    skills
        .into_iter()
        .map(|skill| clean_text(&skill))
        .filter(|skill| !skill.is_empty())
        .collect()
}

/// Turns a validated AI response into a candidate record for `file_name`.
/// Every call mints a fresh id.
pub fn build_candidate(extraction: ResumeExtraction, file_name: &str) -> Candidate {
    Candidate {
        id: Uuid::new_v4().to_string(),
        full_name: clean_text(&extraction.full_name),
        email: normalize_email(&extraction.email),
        mobile: normalize_mobile(&extraction.mobile),
        date_of_birth: clean_text(&extraction.dob),
        current_company: clean_text(&extraction.current_company),
        designation: clean_text(&extraction.designation),
        total_experience: parse_experience_years(&extraction.total_experience),
        relevant_experience: parse_experience_years(&extraction.relevant_experience),
        skills: clean_skills(extraction.skills),
        current_ctc: clean_text(&extraction.current_ctc),
        expected_ctc: clean_text(&extraction.expected_ctc),
        notice_period: clean_text(&extraction.notice_period),
        highest_qualification: clean_text(&extraction.highest_qualification),
        education_field: clean_text(&extraction.education_field),
        current_location: clean_text(&extraction.current_location),
        file_name: file_name.to_string(),
        match_analysis: None,
        is_shortlisted: false,
    }
}
