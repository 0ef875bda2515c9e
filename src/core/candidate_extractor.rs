use std::sync::Arc;
use std::time::Duration;

use super::document_renderer::DocumentRenderer;
use super::errors::{AiError, ExtractionError};
use super::field_extractor::build_candidate;
use super::gemini::{strip_json_fences, GenerationRequest, GenerativeModel};
use super::models::{Candidate, DocumentPayload, ResumeExtraction, UploadedFile};
use super::page_selection::PageSelection;
use super::progress::ProgressReporter;
use super::prompts::{extraction_schema, EXTRACTION_INSTRUCTIONS};

const PROGRESS_PARSED: u8 = 95;
const PROGRESS_DONE: u8 = 100;

/// Turns one uploaded file into a [`Candidate`]: render, ask the model,
/// validate, normalize.
pub struct CandidateExtractor {
    renderer: DocumentRenderer,
    model: Arc<dyn GenerativeModel>,
    max_retries: usize,
    retry_delay: Duration,
}

impl CandidateExtractor {
    pub fn new(
        renderer: DocumentRenderer,
        model: Arc<dyn GenerativeModel>,
        max_retries: usize,
        retry_delay: Duration,
    ) -> Self {
        Self {
            renderer,
            model,
            max_retries: max_retries.max(1),
            retry_delay,
        }
    }

    pub fn renderer(&self) -> &DocumentRenderer {
        &self.renderer
    }

    pub async fn extract(
        &self,
        file: &UploadedFile,
        selection: Option<&PageSelection>,
        progress: &dyn ProgressReporter,
    ) -> Result<Candidate, ExtractionError> {
        progress.report(0);
        let payload = self.renderer.render(file, selection, progress).await?;

        let raw = self.generate_with_retry(&file.name, &payload).await?;
        let extraction = parse_extraction(&raw).map_err(|reason| {
            tracing::warn!(
                file_name = %file.name,
                raw_response = %raw,
                %reason,
                "AI response failed schema validation"
            );
            ExtractionError::InvalidAiResponse { reason }
        })?;
        progress.report(PROGRESS_PARSED);

        let candidate = build_candidate(extraction, &file.name);
        tracing::info!(
            file_name = %file.name,
            candidate_id = %candidate.id,
            "candidate extracted"
        );
        progress.report(PROGRESS_DONE);
        Ok(candidate)
    }

    async fn generate_with_retry(
        &self,
        file_name: &str,
        payload: &DocumentPayload,
    ) -> Result<String, AiError> {
        let request = GenerationRequest {
            prompt: EXTRACTION_INSTRUCTIONS.to_string(),
            document: Some(payload),
            response_schema: extraction_schema(),
        };

        let mut attempt = 0;
        loop {
            match self.model.generate_json(&request).await {
                Ok(raw) => return Ok(raw),
                Err(err) => {
                    let is_last_attempt = attempt + 1 >= self.max_retries;
                    if !err.is_retryable() || is_last_attempt {
                        return Err(err);
                    }

                    let backoff_seconds =
                        self.retry_delay.as_secs_f64() * 2_f64.powf(attempt as f64);
                    tracing::warn!(
                        file_name,
                        attempt = attempt + 1,
                        backoff_seconds,
                        error = %err,
                        "AI call failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs_f64(backoff_seconds)).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn parse_extraction(raw: &str) -> Result<ResumeExtraction, String> {
    serde_json::from_str(strip_json_fences(raw)).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::core::progress::NoopProgress;
    use crate::core::test_support::{extraction_json, image_file, FakeModel, FakeRasterizer};

    fn extractor(model: FakeModel) -> CandidateExtractor {
        let renderer = DocumentRenderer::new(Arc::new(FakeRasterizer::with_heights(&[10])), 1.0);
        CandidateExtractor::new(renderer, Arc::new(model), 3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn image_resume_becomes_a_normalized_candidate() {
        let response = serde_json::json!({
            "fullName": "Jane Doe",
            "email": "jane@x.com",
            "mobile": "98-76 543210",
            "totalExperience": "5 years",
            "skills": ["Python"],
            "highestQualification": "B.Sc",
            "currentLocation": "Pune"
        })
        .to_string();
        let extractor = extractor(FakeModel::always(response));

        let candidate = extractor
            .extract(&image_file("jane.png"), None, &NoopProgress)
            .await
            .unwrap();

        assert_eq!(candidate.full_name, "Jane Doe");
        assert_eq!(candidate.mobile, "9876543210");
        assert_eq!(candidate.total_experience, 5.0);
        assert_eq!(candidate.relevant_experience, 0.0);
        assert!(!candidate.id.is_empty());
        assert_eq!(candidate.file_name, "jane.png");
        assert!(!candidate.is_shortlisted);
    }

    #[tokio::test]
    async fn image_payload_reaches_the_model_with_the_schema() {
        let model = FakeModel::new(|request, _| {
            assert!(matches!(
                request.document,
                Some(DocumentPayload::Image { mime_type, .. }) if mime_type == "image/png"
            ));
            assert_eq!(request.response_schema["required"].as_array().unwrap().len(), 7);
            assert!(request.prompt.contains("digits only"));
            Ok(extraction_json("Jane Doe"))
        });

        extractor(model)
            .extract(&image_file("jane.png"), None, &NoopProgress)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn progress_runs_from_zero_to_one_hundred_in_order() {
        let extractor = extractor(FakeModel::always(extraction_json("Jane Doe")));
        let seen = Mutex::new(Vec::new());
        let reporter = |percent: u8| seen.lock().unwrap().push(percent);

        extractor
            .extract(&image_file("jane.png"), None, &reporter)
            .await
            .unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen, vec![0, 5, 80, 95, 100]);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let model = FakeModel::new(|_, call| {
            if call < 2 {
                Err(AiError::Api {
                    status: 503,
                    body: "overloaded".to_string(),
                })
            } else {
                Ok(extraction_json("Jane Doe"))
            }
        });
        let extractor = extractor(model);

        let candidate = extractor
            .extract(&image_file("jane.png"), None, &NoopProgress)
            .await
            .unwrap();

        assert_eq!(candidate.full_name, "Jane Doe");
    }

    #[tokio::test]
    async fn client_errors_fail_without_retrying() {
        let model = Arc::new(FakeModel::new(|_, _| {
            Err(AiError::Api {
                status: 400,
                body: "bad request".to_string(),
            })
        }));
        let renderer = DocumentRenderer::new(Arc::new(FakeRasterizer::with_heights(&[10])), 1.0);
        let extractor =
            CandidateExtractor::new(renderer, model.clone(), 3, Duration::from_millis(1));

        let err = extractor
            .extract(&image_file("jane.png"), None, &NoopProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractionError::Ai(AiError::Api { status: 400, .. })));
        assert_eq!(model.call_count(), 1);
        assert!(err.to_string().starts_with("AI service error"));
    }

    #[tokio::test]
    async fn retries_stop_after_the_configured_attempts() {
        let model = Arc::new(FakeModel::new(|_, _| {
            Err(AiError::Api {
                status: 429,
                body: String::new(),
            })
        }));
        let renderer = DocumentRenderer::new(Arc::new(FakeRasterizer::with_heights(&[10])), 1.0);
        let extractor =
            CandidateExtractor::new(renderer, model.clone(), 3, Duration::from_millis(1));

        let result = extractor
            .extract(&image_file("jane.png"), None, &NoopProgress)
            .await;

        assert!(result.is_err());
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn schema_mismatch_is_an_invalid_response() {
        let extractor = extractor(FakeModel::always(
            r#"{"fullName":"Jane Doe","skills":"Python"}"#.to_string(),
        ));

        let err = extractor
            .extract(&image_file("jane.png"), None, &NoopProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractionError::InvalidAiResponse { .. }));
    }

    #[tokio::test]
    async fn unparseable_responses_are_invalid_and_not_retried() {
        for response in ["Here is the candidate you asked for.", r#"{"fullName": "Jane"#] {
            let model = Arc::new(FakeModel::always(response.to_string()));
            let renderer =
                DocumentRenderer::new(Arc::new(FakeRasterizer::with_heights(&[10])), 1.0);
            let extractor =
                CandidateExtractor::new(renderer, model.clone(), 3, Duration::from_millis(1));

            let err = extractor
                .extract(&image_file("jane.png"), None, &NoopProgress)
                .await
                .unwrap_err();

            assert!(matches!(err, ExtractionError::InvalidAiResponse { .. }));
            assert_eq!(model.call_count(), 1);
        }
    }

    #[tokio::test]
    async fn fenced_extraction_responses_are_accepted() {
        let fenced = format!("```json\n{}\n```", extraction_json("Jane Doe"));
        let candidate = extractor(FakeModel::always(fenced))
            .extract(&image_file("jane.png"), None, &NoopProgress)
            .await
            .unwrap();

        assert_eq!(candidate.full_name, "Jane Doe");
    }

    #[tokio::test]
    async fn unsupported_files_never_reach_the_model() {
        let model = Arc::new(FakeModel::always(extraction_json("Jane Doe")));
        let renderer = DocumentRenderer::new(Arc::new(FakeRasterizer::with_heights(&[10])), 1.0);
        let extractor = CandidateExtractor::new(renderer, model.clone(), 3, Duration::ZERO);
        let file = UploadedFile::new("notes.txt", "text/plain", b"hello".to_vec());

        let err = extractor
            .extract(&file, None, &NoopProgress)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Unsupported file type: text/plain");
        assert_eq!(model.call_count(), 0);
    }
}
