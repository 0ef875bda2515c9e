use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::compensation::compensation_magnitude;
use super::models::Candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    FullName,
    TotalExperience,
    RelevantExperience,
    #[serde(rename = "currentCTC")]
    CurrentCtc,
    #[serde(rename = "expectedCTC")]
    ExpectedCtc,
    MatchScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: SortField,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Filter and sort settings for the candidate table. The default query
/// returns the collection unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CandidateQuery {
    pub search: String,
    pub min_experience: Option<f64>,
    pub max_experience: Option<f64>,
    pub shortlisted_only: bool,
    pub sort: Option<SortOrder>,
}

impl CandidateQuery {
    pub fn apply(&self, candidates: &[Candidate]) -> Vec<Candidate> {
        let needle = self.search.trim().to_lowercase();
        let mut matched: Vec<Candidate> = candidates
            .iter()
            .filter(|c| !self.shortlisted_only || c.is_shortlisted)
            .filter(|c| self.min_experience.map_or(true, |min| c.total_experience >= min))
            .filter(|c| self.max_experience.map_or(true, |max| c.total_experience <= max))
            .filter(|c| needle.is_empty() || matches_search(c, &needle))
            .cloned()
            .collect();

        if let Some(order) = self.sort {
            matched.sort_by(|a, b| {
                let ordering = compare(a, b, order.field);
                match order.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        matched
    }
}

fn matches_search(candidate: &Candidate, needle: &str) -> bool {
    [
        &candidate.full_name,
        &candidate.email,
        &candidate.designation,
        &candidate.current_company,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
        || candidate
            .skills
            .iter()
            .any(|skill| skill.to_lowercase().contains(needle))
}

fn compare(a: &Candidate, b: &Candidate, field: SortField) -> Ordering {
    match field {
        SortField::FullName => a
            .full_name
            .to_lowercase()
            .cmp(&b.full_name.to_lowercase()),
        SortField::TotalExperience => a.total_experience.total_cmp(&b.total_experience),
        SortField::RelevantExperience => a.relevant_experience.total_cmp(&b.relevant_experience),
        SortField::CurrentCtc => {
            compensation_magnitude(&a.current_ctc).total_cmp(&compensation_magnitude(&b.current_ctc))
        }
        SortField::ExpectedCtc => compensation_magnitude(&a.expected_ctc)
            .total_cmp(&compensation_magnitude(&b.expected_ctc)),
        // Unscored candidates rank below any score.
        SortField::MatchScore => a.match_score().cmp(&b.match_score()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field_extractor::build_candidate;
    use crate::core::models::MatchAnalysis;
    use crate::core::test_support::extraction_json;

    fn candidate(name: &str, years: f64, ctc: &str) -> Candidate {
        let mut candidate = build_candidate(
            serde_json::from_str(&extraction_json(name)).unwrap(),
            &format!("{name}.pdf"),
        );
        candidate.total_experience = years;
        candidate.current_ctc = ctc.to_string();
        candidate
    }

    fn names(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.full_name.as_str()).collect()
    }

    fn sample() -> Vec<Candidate> {
        let mut bob = candidate("bob", 2.0, "50k");
        bob.skills = vec!["Rust".to_string()];
        bob.is_shortlisted = true;
        bob.match_analysis = Some(MatchAnalysis {
            match_score: 70,
            match_reason: "Rust".to_string(),
        });
        vec![
            candidate("Ann", 6.5, "12 LPA"),
            bob,
            candidate("Cid", 4.0, "$80,000"),
        ]
    }

    #[test]
    fn default_query_keeps_everything_in_order() {
        let all = sample();
        assert_eq!(names(&CandidateQuery::default().apply(&all)), vec!["Ann", "bob", "Cid"]);
    }

    #[test]
    fn search_covers_names_and_skills_case_insensitively() {
        let all = sample();
        let query = CandidateQuery {
            search: "  RUST ".to_string(),
            ..CandidateQuery::default()
        };
        assert_eq!(names(&query.apply(&all)), vec!["bob"]);

        let query = CandidateQuery {
            search: "acme".to_string(),
            ..CandidateQuery::default()
        };
        assert_eq!(query.apply(&all).len(), 3);
    }

    #[test]
    fn experience_range_and_shortlist_filters_combine() {
        let all = sample();
        let query = CandidateQuery {
            min_experience: Some(3.0),
            max_experience: Some(6.5),
            ..CandidateQuery::default()
        };
        assert_eq!(names(&query.apply(&all)), vec!["Ann", "Cid"]);

        let query = CandidateQuery {
            shortlisted_only: true,
            ..CandidateQuery::default()
        };
        assert_eq!(names(&query.apply(&all)), vec!["bob"]);
    }

    #[test]
    fn compensation_sorts_by_parsed_magnitude() {
        let all = sample();
        let query = CandidateQuery {
            sort: Some(SortOrder {
                field: SortField::CurrentCtc,
                direction: SortDirection::Desc,
            }),
            ..CandidateQuery::default()
        };
        assert_eq!(names(&query.apply(&all)), vec!["Ann", "Cid", "bob"]);
    }

    #[test]
    fn name_sort_ignores_case_and_score_sort_puts_unscored_last_when_descending() {
        let all = sample();
        let by_name = CandidateQuery {
            sort: Some(SortOrder {
                field: SortField::FullName,
                direction: SortDirection::Asc,
            }),
            ..CandidateQuery::default()
        };
        assert_eq!(names(&by_name.apply(&all)), vec!["Ann", "bob", "Cid"]);

        let by_score = CandidateQuery {
            sort: Some(SortOrder {
                field: SortField::MatchScore,
                direction: SortDirection::Desc,
            }),
            ..CandidateQuery::default()
        };
        assert_eq!(names(&by_score.apply(&all)), vec!["bob", "Ann", "Cid"]);
    }

    #[test]
    fn query_deserializes_from_camel_case_json() {
        let query: CandidateQuery = serde_json::from_str(
            r#"{"search":"py","sort":{"field":"expectedCTC","direction":"desc"}}"#,
        )
        .unwrap();
        assert_eq!(
            query.sort,
            Some(SortOrder {
                field: SortField::ExpectedCtc,
                direction: SortDirection::Desc,
            })
        );
        assert!(!query.shortlisted_only);
    }
}
