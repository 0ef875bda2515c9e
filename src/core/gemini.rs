use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::errors::AiError;
use super::models::DocumentPayload;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// One structured-generation call: instruction text, optional document
/// content and the JSON schema the response must follow.
pub struct GenerationRequest<'a> {
    pub prompt: String,
    pub document: Option<&'a DocumentPayload>,
    pub response_schema: Value,
}

/// The external structured-generation capability. Implementations return
/// the raw JSON text; callers own validation.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate_json(&self, request: &GenerationRequest<'_>) -> Result<String, AiError>;
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        model: String,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent("ResumeIntake/1.0")
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_json(&self, request: &GenerationRequest<'_>) -> Result<String, AiError> {
        let url = format!("{GEMINI_ENDPOINT}/{}:generateContent", self.model);
        let payload = build_request_body(request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(model = %self.model, bytes = body.len(), "Gemini call succeeded");
        first_text_part(&body)
    }
}

fn build_request_body(request: &GenerationRequest<'_>) -> Value {
    let mut parts = Vec::new();
    match request.document {
        Some(DocumentPayload::Image {
            mime_type,
            data_base64,
        }) => parts.push(json!({
            "inline_data": { "mime_type": mime_type, "data": data_base64 }
        })),
        Some(DocumentPayload::Text { text }) => parts.push(json!({ "text": text })),
        None => {}
    }
    parts.push(json!({ "text": request.prompt }));

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": request.response_schema,
        }
    })
}

fn first_text_part(body: &str) -> Result<String, AiError> {
    let parsed = serde_json::from_str::<GenerateContentResponse>(body)
        .map_err(|_| AiError::EmptyResponse)?;

    parsed
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .find_map(|part| part.text.filter(|text| !text.trim().is_empty()))
        .ok_or(AiError::EmptyResponse)
}

/// Strips a ```json ... ``` wrapper some model versions add despite the
/// JSON response type.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(stripped) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };

    let stripped = stripped.trim_start();
    stripped
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or(stripped)
}
