use std::sync::Arc;

use futures::future::join_all;
use serde_json::{json, Value};

use super::errors::AiError;
use super::gemini::{strip_json_fences, GenerationRequest, GenerativeModel};
use super::models::{Candidate, MatchAnalysis, MatchVerdict};
use super::prompts::{match_prompt, match_schema};

pub const FAILED_MATCH_REASON: &str = "Failed to analyze match.";

#[derive(Debug, thiserror::Error)]
enum MatchError {
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error("invalid match response: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Scores every candidate against one job description.
pub struct MatchScorer {
    model: Arc<dyn GenerativeModel>,
}

impl MatchScorer {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// One concurrent AI call per candidate. A failed call degrades that
    /// candidate to a zero score; the batch itself never fails. Output
    /// order matches input order.
    pub async fn score_all(
        &self,
        candidates: Vec<Candidate>,
        job_description: &str,
    ) -> Vec<Candidate> {
        let verdicts = join_all(
            candidates
                .iter()
                .map(|candidate| self.score_one(candidate, job_description)),
        )
        .await;

        let mut failed = 0usize;
        let scored: Vec<Candidate> = candidates
            .into_iter()
            .zip(verdicts)
            .map(|(mut candidate, verdict)| {
                let analysis = match verdict {
                    Ok(analysis) => analysis,
                    Err(err) => {
                        failed += 1;
                        tracing::warn!(
                            candidate_id = %candidate.id,
                            file_name = %candidate.file_name,
                            error = %err,
                            "match analysis failed"
                        );
                        MatchAnalysis {
                            match_score: 0,
                            match_reason: FAILED_MATCH_REASON.to_string(),
                        }
                    }
                };
                candidate.match_analysis = Some(analysis);
                candidate
            })
            .collect();

        tracing::info!(candidates = scored.len(), failed, "match analysis finished");
        scored
    }

    async fn score_one(
        &self,
        candidate: &Candidate,
        job_description: &str,
    ) -> Result<MatchAnalysis, MatchError> {
        let request = GenerationRequest {
            prompt: match_prompt(&candidate_summary(candidate), job_description),
            document: None,
            response_schema: match_schema(),
        };

        let raw = self.model.generate_json(&request).await?;
        let verdict: MatchVerdict = serde_json::from_str(strip_json_fences(&raw))?;

        Ok(MatchAnalysis {
            match_score: verdict.match_score.clamp(0, 100) as u8,
            match_reason: verdict.match_reason.trim().to_string(),
        })
    }
}

/// The compact view sent for matching, keeping the request small.
pub fn candidate_summary(candidate: &Candidate) -> Value {
    let education = [
        candidate.highest_qualification.as_str(),
        candidate.education_field.as_str(),
    ]
    .iter()
    .filter(|part| !part.trim().is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(", ");

    json!({
        "skills": candidate.skills,
        "totalExperience": candidate.total_experience,
        "designation": candidate.designation,
        "currentCompany": candidate.current_company,
        "education": education,
        "location": candidate.current_location,
    })
}
